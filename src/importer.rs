use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::fetcher::{AttachmentFetcher, EXPIRED_TOKEN_REASON, FetchOutcome};
use crate::models::{Attachment, Issue, User};
use crate::store::DestinationStore;

/// 添付ファイルをスキップした理由
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    ExpiredToken,
    FetchFailed(String),
    /// 移行先ストアは空ファイルを受け付けないため事前に除外する
    EmptyAttachment,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ExpiredToken => f.write_str(EXPIRED_TOKEN_REASON),
            SkipReason::FetchFailed(reason) => f.write_str(reason),
            SkipReason::EmptyAttachment => f.write_str("empty attachment"),
        }
    }
}

/// 添付ファイル1件のインポート結果
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentImport {
    Imported(Attachment),
    Skipped(SkipReason),
}

impl AttachmentImport {
    pub fn is_skipped(&self) -> bool {
        matches!(self, AttachmentImport::Skipped(_))
    }
}

/// 外部ホスティングの添付ファイルを取得し、Issueの添付ファイルとして保存する
#[derive(Clone)]
pub struct AttachmentImporter {
    store: Arc<dyn DestinationStore>,
    fetcher: AttachmentFetcher,
    author: User,
}

impl AttachmentImporter {
    pub fn new(store: Arc<dyn DestinationStore>, fetcher: AttachmentFetcher) -> Self {
        Self {
            store,
            fetcher,
            author: User::anonymous(),
        }
    }

    /// 作成者を変更（デフォルトは匿名ユーザー）
    pub fn with_author(mut self, author: User) -> Self {
        self.author = author;
        self
    }

    /// 添付ファイルを取得して保存
    ///
    /// 取得失敗と空ファイルは `Skipped` として返し、ストアには書き込まない。
    /// ストアの検証エラーは `Err` で返る（この添付ファイルのみ失敗）。
    pub async fn import_attachment(
        &self,
        url: &str,
        filename: &str,
        issue: &Issue,
        created_on: Option<DateTime<Utc>>,
    ) -> Result<AttachmentImport> {
        let payload = match self.fetcher.fetch(url).await? {
            FetchOutcome::Success(payload) => payload,
            FetchOutcome::ExpiredToken(_) => {
                return Ok(self.skip(filename, SkipReason::ExpiredToken));
            }
            FetchOutcome::OtherFailure(reason) => {
                return Ok(self.skip(filename, SkipReason::FetchFailed(reason)));
            }
        };

        if payload.is_empty() {
            return Ok(self.skip(filename, SkipReason::EmptyAttachment));
        }

        let attachment = Attachment::for_issue(issue, filename, payload)
            .author(self.author.clone())
            .created_on(created_on);
        let saved = self.store.save_attachment(&attachment).await?;

        tracing::info!(
            issue_id = ?issue.id,
            filename,
            bytes = saved.filesize,
            "Imported attachment"
        );
        Ok(AttachmentImport::Imported(saved))
    }

    fn skip(&self, filename: &str, reason: SkipReason) -> AttachmentImport {
        tracing::warn!(filename, reason = %reason, "Ignoring attachment");
        AttachmentImport::Skipped(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory_store::InMemoryStore;
    use crate::models::{ContainerType, CustomField};
    use chrono::TimeZone;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (Arc<InMemoryStore>, Issue, AttachmentImporter) {
        let store = Arc::new(InMemoryStore::new());
        store.insert_custom_field(CustomField::new(3, "Legacy ID")).await;
        let issue = store
            .save_issue(&Issue::new().subject("Host").custom_value(3, "LID-42"))
            .await
            .unwrap();
        let fetcher = AttachmentFetcher::new("accounts/ServiceLogin").unwrap();
        let importer = AttachmentImporter::new(store.clone(), fetcher);
        (store, issue, importer)
    }

    async fn mount(mock_server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_import_attachment_success() {
        // Given: 10バイトを返すサーバー
        let (store, issue, importer) = setup().await;
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "/a.png",
            ResponseTemplate::new(200).set_body_bytes(b"0123456789".to_vec()),
        )
        .await;
        let created_on = Utc.with_ymd_and_hms(2010, 5, 1, 12, 0, 0).unwrap();

        // When: インポート
        let result = importer
            .import_attachment(
                &format!("{}/a.png", mock_server.uri()),
                "a.png",
                &issue,
                Some(created_on),
            )
            .await
            .unwrap();

        // Then: 匿名ユーザー作成、content_typeは空で保存される
        let attachment = match result {
            AttachmentImport::Imported(attachment) => attachment,
            other => panic!("Expected Imported, got {:?}", other),
        };
        assert_eq!(attachment.filename, "a.png");
        assert_eq!(attachment.filesize, 10);
        assert_eq!(attachment.content_type, "");
        assert!(attachment.author.is_anonymous());
        assert_eq!(attachment.created_on, Some(created_on));

        let stored = store
            .find_attachments(ContainerType::Issue, issue.id.unwrap())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_import_empty_attachment_is_skipped() {
        let (store, issue, importer) = setup().await;
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/empty.txt", ResponseTemplate::new(200)).await;

        let result = importer
            .import_attachment(
                &format!("{}/empty.txt", mock_server.uri()),
                "empty.txt",
                &issue,
                None,
            )
            .await
            .unwrap();

        assert_eq!(result, AttachmentImport::Skipped(SkipReason::EmptyAttachment));
        assert_eq!(SkipReason::EmptyAttachment.to_string(), "empty attachment");
        assert!(store.snapshot().await.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_import_expired_token_is_skipped() {
        let (store, issue, importer) = setup().await;
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "/old.png",
            ResponseTemplate::new(302).insert_header(
                "Location",
                "https://www.google.com/accounts/ServiceLogin?service=code",
            ),
        )
        .await;

        let result = importer
            .import_attachment(
                &format!("{}/old.png", mock_server.uri()),
                "old.png",
                &issue,
                None,
            )
            .await
            .unwrap();

        assert_eq!(result, AttachmentImport::Skipped(SkipReason::ExpiredToken));
        assert_eq!(SkipReason::ExpiredToken.to_string(), "expired token");
        assert!(store.snapshot().await.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_import_for_unsaved_issue_is_validation_error() {
        let (store, _, importer) = setup().await;
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "/a.png",
            ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()),
        )
        .await;

        let result = importer
            .import_attachment(
                &format!("{}/a.png", mock_server.uri()),
                "a.png",
                &Issue::new(),
                None,
            )
            .await;

        assert!(matches!(result, Err(Error::ValidationFailed(_))));
        assert!(store.snapshot().await.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_import_with_custom_author() {
        let (_, issue, importer) = setup().await;
        let importer = importer.with_author(User::new(9, "migrator", "Migration Bot"));
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "/log.txt",
            ResponseTemplate::new(200).set_body_string("log line"),
        )
        .await;

        let result = importer
            .import_attachment(
                &format!("{}/log.txt", mock_server.uri()),
                "log.txt",
                &issue,
                None,
            )
            .await
            .unwrap();

        match result {
            AttachmentImport::Imported(attachment) => {
                assert_eq!(attachment.author.login, "migrator");
                assert!(attachment.created_on.is_some());
            }
            other => panic!("Expected Imported, got {:?}", other),
        }
    }
}
