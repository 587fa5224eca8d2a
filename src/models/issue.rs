use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CustomFieldValue;

/// 移行先ストアのIssue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// 未保存のIssueではNone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub subject: String,
    #[serde(default)]
    pub custom_field_values: Vec<CustomFieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
}

impl Issue {
    /// 未保存の空Issueを作成
    pub fn new() -> Self {
        Self {
            id: None,
            subject: String::new(),
            custom_field_values: Vec::new(),
            created_on: None,
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn custom_value(mut self, custom_field_id: u64, value: impl Into<String>) -> Self {
        let mut custom_value = CustomFieldValue::new(custom_field_id, value);
        custom_value.customized_id = self.id;
        self.custom_field_values.push(custom_value);
        self
    }

    /// まだストアに保存されていないかどうか
    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }
}

impl Default for Issue {
    fn default() -> Self {
        Self::new()
    }
}
