use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContainerType;

/// 変更履歴
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: u64,
    pub journalized_type: ContainerType,
    pub journalized_id: u64,
    pub user_id: u64,
    #[serde(default)]
    pub notes: String,
    pub created_on: DateTime<Utc>,
}

/// 変更履歴の明細（常に親Journalと一緒に削除される）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalDetail {
    pub id: u64,
    pub journal_id: u64,
    pub property: String,
    pub prop_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}
