use serde::{Deserialize, Serialize};

/// カスタムフィールド定義（名前で一意に解決される）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl CustomField {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_required: false,
            max_length: None,
        }
    }

    pub fn required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// Issueに紐づくカスタムフィールド値（Issue × フィールドで一意）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub custom_field_id: u64,
    /// 所有するIssueのID（未保存のIssueではNone）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customized_id: Option<u64>,
    pub value: String,
}

impl CustomFieldValue {
    pub fn new(custom_field_id: u64, value: impl Into<String>) -> Self {
        Self {
            custom_field_id,
            customized_id: None,
            value: value.into(),
        }
    }
}
