use bytes::Bytes;
use reqwest::{Client, StatusCode, header, redirect};
use url::Url;

use crate::config::ImportConfig;
use crate::error::{Error, Result};

/// 期限切れトークンと判定された場合の理由
pub const EXPIRED_TOKEN_REASON: &str = "expired token";

/// 添付ファイル取得の結果
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// HTTP 200で本文を取得できた
    Success(Bytes),
    /// ログインページへリダイレクトされた（ダウンロードURLの認可切れ）
    ExpiredToken(String),
    /// その他の失敗（リダイレクト先、ステータス、通信エラー）
    OtherFailure(String),
}

impl FetchOutcome {
    pub fn is_invalid(&self) -> bool {
        !matches!(self, FetchOutcome::Success(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::ExpiredToken(reason) | FetchOutcome::OtherFailure(reason) => {
                Some(reason.as_str())
            }
        }
    }

    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            FetchOutcome::Success(body) => Some(body),
            _ => None,
        }
    }
}

/// 外部ホスティングから添付ファイルを取得するHTTPクライアント
///
/// リダイレクトは追跡せず、`Location` ヘッダーで失敗を分類する。再試行はしない。
#[derive(Debug, Clone)]
pub struct AttachmentFetcher {
    client: Client,
    login_pattern: String,
}

impl AttachmentFetcher {
    pub fn new(login_pattern: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            login_pattern: login_pattern.into(),
        })
    }

    pub fn from_config(config: &ImportConfig) -> Result<Self> {
        Self::new(config.login_redirect_pattern.clone())
    }

    pub fn login_pattern(&self) -> &str {
        &self.login_pattern
    }

    /// URLにGETリクエストを送り、結果を分類する
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        let url = Url::parse(url)
            .map_err(|e| Error::InvalidInput(format!("Invalid attachment URL '{}': {}", url, e)))?;

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Attachment request failed");
                return Ok(FetchOutcome::OtherFailure(e.to_string()));
            }
        };

        let status = response.status();
        if status == StatusCode::OK {
            return match response.bytes().await {
                Ok(body) => {
                    tracing::debug!(url = %url, bytes = body.len(), "Fetched attachment");
                    Ok(FetchOutcome::Success(body))
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Failed to read attachment body");
                    Ok(FetchOutcome::OtherFailure(e.to_string()))
                }
            };
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let outcome = match location {
            Some(location) if location.contains(&self.login_pattern) => {
                tracing::warn!(url = %url, "Expired attachment token");
                FetchOutcome::ExpiredToken(EXPIRED_TOKEN_REASON.to_string())
            }
            Some(location) => {
                tracing::warn!(url = %url, location = %location, "Unrecognised redirect");
                FetchOutcome::OtherFailure(location)
            }
            None => {
                tracing::warn!(url = %url, status = status.as_u16(), "Unexpected attachment status");
                FetchOutcome::OtherFailure(format!("HTTP {}", status.as_u16()))
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOGIN_PATTERN: &str = "accounts/ServiceLogin";

    #[tokio::test]
    async fn test_fetch_success_preserves_query() {
        // Given: クエリ付きURLに10バイトを返すモックサーバー
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/a.png"))
            .and(query_param("token", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"0123456789".to_vec()))
            .mount(&mock_server)
            .await;

        let fetcher = AttachmentFetcher::new(LOGIN_PATTERN).unwrap();

        // When: 取得
        let outcome = fetcher
            .fetch(&format!("{}/files/a.png?token=abc", mock_server.uri()))
            .await
            .unwrap();

        // Then: 本文がそのまま返る
        assert!(!outcome.is_invalid());
        assert!(outcome.reason().is_none());
        assert_eq!(outcome.payload().unwrap().len(), 10);
        assert_eq!(outcome, FetchOutcome::Success(Bytes::from_static(b"0123456789")));
    }

    #[tokio::test]
    async fn test_fetch_login_redirect_is_expired_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/b.png"))
            .respond_with(ResponseTemplate::new(302).insert_header(
                "Location",
                "https://www.google.com/accounts/ServiceLogin?continue=foo",
            ))
            .mount(&mock_server)
            .await;

        let fetcher = AttachmentFetcher::new(LOGIN_PATTERN).unwrap();
        let outcome = fetcher
            .fetch(&format!("{}/files/b.png", mock_server.uri()))
            .await
            .unwrap();

        assert!(outcome.is_invalid());
        assert_eq!(outcome.reason(), Some("expired token"));
        assert!(matches!(outcome, FetchOutcome::ExpiredToken(_)));
    }

    #[tokio::test]
    async fn test_fetch_other_redirect_reports_location() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "https://mirror.example.com/c.png"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = AttachmentFetcher::new(LOGIN_PATTERN).unwrap();
        let outcome = fetcher
            .fetch(&format!("{}/files/c.png", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            FetchOutcome::OtherFailure("https://mirror.example.com/c.png".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_non_redirect_status_is_classified_by_location() {
        // Given: 500でもLocationヘッダーを返すサーバー
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/login.png"))
            .respond_with(ResponseTemplate::new(500).insert_header(
                "Location",
                "https://www.google.com/accounts/ServiceLogin?continue=foo",
            ))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/mirror.png"))
            .respond_with(
                ResponseTemplate::new(500).insert_header("Location", "https://mirror.example.com/d.png"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = AttachmentFetcher::new(LOGIN_PATTERN).unwrap();

        // When
        let login = fetcher
            .fetch(&format!("{}/files/login.png", mock_server.uri()))
            .await
            .unwrap();
        let mirror = fetcher
            .fetch(&format!("{}/files/mirror.png", mock_server.uri()))
            .await
            .unwrap();

        // Then: ステータスではなくLocationの内容で分類される
        assert_eq!(login, FetchOutcome::ExpiredToken("expired token".to_string()));
        assert_eq!(
            mirror,
            FetchOutcome::OtherFailure("https://mirror.example.com/d.png".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_error_status_without_location() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&mock_server)
            .await;

        let fetcher = AttachmentFetcher::new(LOGIN_PATTERN).unwrap();
        let outcome = fetcher
            .fetch(&format!("{}/missing", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(outcome.reason(), Some("HTTP 404"));
        assert!(outcome.payload().is_none());
    }

    #[tokio::test]
    async fn test_fetch_connection_failure_is_classified() {
        // 停止したサーバーへの接続は失敗として分類される
        let mock_server = MockServer::start().await;
        let uri = mock_server.uri();
        drop(mock_server);

        let fetcher = AttachmentFetcher::new(LOGIN_PATTERN).unwrap();
        let outcome = fetcher.fetch(&format!("{}/files/a.png", uri)).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::OtherFailure(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let fetcher = AttachmentFetcher::new(LOGIN_PATTERN).unwrap();

        let result = fetcher.fetch("not a url").await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
