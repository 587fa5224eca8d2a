use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Issue, User};

/// 添付ファイルや履歴を所有するエンティティの種別（移行ではIssueのみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerType {
    Issue,
}

impl ContainerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::Issue => "Issue",
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 添付ファイル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub container_type: ContainerType,
    /// 所有Issueが未保存の場合はNone（ストアの検証で拒否される）
    pub container_id: Option<u64>,
    pub filename: String,
    /// コンテンツ種別の推測は行わないため常に空文字
    pub content_type: String,
    pub filesize: u64,
    pub author: User,
    /// Noneの場合は保存時にストアの既定値（現在時刻）が使われる
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(with = "base64_content")]
    pub content: Bytes,
}

impl Attachment {
    /// Issueに紐づく未保存の添付ファイルを作成
    pub fn for_issue(issue: &Issue, filename: impl Into<String>, content: Bytes) -> Self {
        Self {
            id: None,
            container_type: ContainerType::Issue,
            container_id: issue.id,
            filename: filename.into(),
            content_type: String::new(),
            filesize: content.len() as u64,
            author: User::anonymous(),
            created_on: None,
            content,
        }
    }

    pub fn author(mut self, author: User) -> Self {
        self.author = author;
        self
    }

    pub fn created_on(mut self, created_on: Option<DateTime<Utc>>) -> Self {
        self.created_on = created_on;
        self
    }

    /// 指定コンテナに属するかどうか
    pub fn belongs_to(&self, container_type: ContainerType, container_id: u64) -> bool {
        self.container_type == container_type && self.container_id == Some(container_id)
    }
}

// スナップショットJSON内ではbase64文字列として保持する
mod base64_content {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(content: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(content))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
