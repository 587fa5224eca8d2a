use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_LEGACY_ID_FIELD: &str = "Legacy ID";
pub const DEFAULT_LOGIN_REDIRECT_PATTERN: &str = "accounts/ServiceLogin";

/// インポート処理の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Legacy IDを保持するカスタムフィールド名
    pub legacy_id_field: String,
    /// 期限切れトークンと判定するリダイレクト先のパターン
    pub login_redirect_pattern: String,
    /// 一致するIssueがない場合に新規作成するかどうか
    pub create_missing_issues: bool,
    /// 再インポート前に変更履歴も削除するかどうか
    pub reset_journals: bool,
}

impl ImportConfig {
    /// デフォルト設定で新しいImportConfigを作成
    pub fn new() -> Self {
        Self {
            legacy_id_field: DEFAULT_LEGACY_ID_FIELD.to_string(),
            login_redirect_pattern: DEFAULT_LOGIN_REDIRECT_PATTERN.to_string(),
            create_missing_issues: false,
            reset_journals: true,
        }
    }

    /// 環境変数（および `.env`）から設定を読み込み、未設定の項目はデフォルト値
    ///
    /// - `LEGACY_ID_FIELD`
    /// - `ATTACHMENT_LOGIN_PATTERN`
    /// - `IMPORT_CREATE_MISSING`
    /// - `IMPORT_RESET_JOURNALS`
    pub fn from_env() -> Result<Self> {
        use std::env;

        dotenv::dotenv().ok();

        let mut config = Self::new();

        if let Ok(field) = env::var("LEGACY_ID_FIELD") {
            if field.trim().is_empty() {
                return Err(Error::InvalidConfiguration(
                    "LEGACY_ID_FIELD must not be empty".to_string(),
                ));
            }
            config.legacy_id_field = field;
        }

        if let Ok(pattern) = env::var("ATTACHMENT_LOGIN_PATTERN") {
            if pattern.is_empty() {
                return Err(Error::InvalidConfiguration(
                    "ATTACHMENT_LOGIN_PATTERN must not be empty".to_string(),
                ));
            }
            config.login_redirect_pattern = pattern;
        }

        if let Ok(value) = env::var("IMPORT_CREATE_MISSING") {
            config.create_missing_issues = parse_bool("IMPORT_CREATE_MISSING", &value)?;
        }

        if let Ok(value) = env::var("IMPORT_RESET_JOURNALS") {
            config.reset_journals = parse_bool("IMPORT_RESET_JOURNALS", &value)?;
        }

        Ok(config)
    }

    pub fn legacy_id_field(mut self, name: impl Into<String>) -> Self {
        self.legacy_id_field = name.into();
        self
    }

    pub fn login_redirect_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.login_redirect_pattern = pattern.into();
        self
    }

    pub fn create_missing_issues(mut self, enabled: bool) -> Self {
        self.create_missing_issues = enabled;
        self
    }

    pub fn reset_journals(mut self, enabled: bool) -> Self {
        self.reset_journals = enabled;
        self
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Error::InvalidConfiguration(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}
