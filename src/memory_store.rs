use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::models::{
    Attachment, ContainerType, CustomField, CustomFieldValue, Issue, Journal, JournalDetail,
};
use crate::store::DestinationStore;

/// ストア全体の内容（JSONスナップショットの形式も兼ねる）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub journals: Vec<Journal>,
    #[serde(default)]
    pub journal_details: Vec<JournalDetail>,
}

impl StoreSnapshot {
    fn next_issue_id(&self) -> u64 {
        self.issues.iter().filter_map(|i| i.id).max().unwrap_or(0) + 1
    }

    fn next_attachment_id(&self) -> u64 {
        self.attachments.iter().filter_map(|a| a.id).max().unwrap_or(0) + 1
    }

    fn issue_exists(&self, issue_id: u64) -> bool {
        self.issues.iter().any(|i| i.id == Some(issue_id))
    }

    fn custom_field(&self, custom_field_id: u64) -> Option<&CustomField> {
        self.custom_fields.iter().find(|f| f.id == custom_field_id)
    }

    /// カスタムフィールド値の検証
    fn validate_custom_value(&self, value: &CustomFieldValue) -> Result<()> {
        let field = self.custom_field(value.custom_field_id).ok_or_else(|| {
            Error::ValidationFailed(format!("Custom field {} is unknown", value.custom_field_id))
        })?;

        if field.is_required && value.value.trim().is_empty() {
            return Err(Error::ValidationFailed(format!("{} cannot be blank", field.name)));
        }

        if let Some(max_length) = field.max_length {
            if value.value.chars().count() > max_length {
                return Err(Error::ValidationFailed(format!(
                    "{} is too long (maximum is {} characters)",
                    field.name, max_length
                )));
            }
        }

        Ok(())
    }

    /// Issueの検証
    fn validate_issue(&self, issue: &Issue) -> Result<()> {
        if issue.subject.trim().is_empty() {
            return Err(Error::ValidationFailed("Subject cannot be blank".to_string()));
        }

        let mut seen = HashSet::new();
        for value in &issue.custom_field_values {
            self.validate_custom_value(value)?;
            if !seen.insert(value.custom_field_id) {
                return Err(Error::ValidationFailed(format!(
                    "Custom field {} has more than one value",
                    value.custom_field_id
                )));
            }
        }

        Ok(())
    }

    /// 添付ファイルの検証
    fn validate_attachment(&self, attachment: &Attachment) -> Result<()> {
        let container_id = attachment
            .container_id
            .ok_or_else(|| Error::ValidationFailed("Container cannot be blank".to_string()))?;

        if attachment.container_type == ContainerType::Issue && !self.issue_exists(container_id) {
            return Err(Error::ValidationFailed(format!(
                "Container Issue {} does not exist",
                container_id
            )));
        }

        if attachment.filename.trim().is_empty() {
            return Err(Error::ValidationFailed("Filename cannot be blank".to_string()));
        }

        if attachment.content.is_empty() {
            return Err(Error::ValidationFailed("File cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// メモリ上のテーブルで動作する移行先ストア
///
/// テスト用のフェイクとして使えるほか、`JsonStore` の実体としても使われる。
pub struct InMemoryStore {
    data: RwLock<StoreSnapshot>,
}

impl InMemoryStore {
    /// 空のストアを作成
    pub fn new() -> Self {
        Self::from_snapshot(StoreSnapshot::default())
    }

    /// スナップショットからストアを作成
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }

    /// 現在の内容をスナップショットとして取得
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.data.read().await.clone()
    }

    /// カスタムフィールド定義を登録
    pub async fn insert_custom_field(&self, field: CustomField) {
        self.data.write().await.custom_fields.push(field);
    }

    /// 変更履歴を登録
    pub async fn insert_journal(&self, journal: Journal) {
        self.data.write().await.journals.push(journal);
    }

    /// 変更履歴の明細を登録
    pub async fn insert_journal_detail(&self, detail: JournalDetail) {
        self.data.write().await.journal_details.push(detail);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DestinationStore for InMemoryStore {
    async fn find_all_issues(&self) -> Result<Vec<Issue>> {
        Ok(self.data.read().await.issues.clone())
    }

    async fn find_custom_field_by_name(&self, name: &str) -> Result<Option<CustomField>> {
        let data = self.data.read().await;
        Ok(data.custom_fields.iter().find(|f| f.name == name).cloned())
    }

    async fn find_attachments(
        &self,
        container_type: ContainerType,
        container_id: u64,
    ) -> Result<Vec<Attachment>> {
        let data = self.data.read().await;
        Ok(data
            .attachments
            .iter()
            .filter(|a| a.belongs_to(container_type, container_id))
            .cloned()
            .collect())
    }

    async fn delete_attachments(
        &self,
        container_type: ContainerType,
        container_id: u64,
    ) -> Result<usize> {
        let mut data = self.data.write().await;
        let before = data.attachments.len();
        data.attachments
            .retain(|a| !a.belongs_to(container_type, container_id));
        Ok(before - data.attachments.len())
    }

    async fn find_journals(
        &self,
        subject_type: ContainerType,
        subject_id: u64,
    ) -> Result<Vec<Journal>> {
        let data = self.data.read().await;
        Ok(data
            .journals
            .iter()
            .filter(|j| j.journalized_type == subject_type && j.journalized_id == subject_id)
            .cloned()
            .collect())
    }

    async fn delete_journal(&self, journal_id: u64) -> Result<bool> {
        let mut data = self.data.write().await;
        let before = data.journals.len();
        data.journals.retain(|j| j.id != journal_id);
        Ok(data.journals.len() < before)
    }

    async fn find_journal_details(&self, journal_id: u64) -> Result<Vec<JournalDetail>> {
        let data = self.data.read().await;
        Ok(data
            .journal_details
            .iter()
            .filter(|d| d.journal_id == journal_id)
            .cloned()
            .collect())
    }

    async fn delete_journal_details(&self, journal_id: u64) -> Result<usize> {
        let mut data = self.data.write().await;
        let before = data.journal_details.len();
        data.journal_details.retain(|d| d.journal_id != journal_id);
        Ok(before - data.journal_details.len())
    }

    async fn save_issue(&self, issue: &Issue) -> Result<Issue> {
        let mut data = self.data.write().await;
        data.validate_issue(issue)?;

        let mut saved = issue.clone();
        match saved.id {
            Some(id) => {
                let position = data
                    .issues
                    .iter()
                    .position(|i| i.id == Some(id))
                    .ok_or_else(|| {
                        Error::ValidationFailed(format!("Issue {} does not exist", id))
                    })?;
                for value in &mut saved.custom_field_values {
                    value.customized_id = Some(id);
                }
                data.issues[position] = saved.clone();
            }
            None => {
                let id = data.next_issue_id();
                saved.id = Some(id);
                saved.created_on.get_or_insert_with(Utc::now);
                for value in &mut saved.custom_field_values {
                    value.customized_id = Some(id);
                }
                data.issues.push(saved.clone());
            }
        }

        Ok(saved)
    }

    async fn save_attachment(&self, attachment: &Attachment) -> Result<Attachment> {
        let mut data = self.data.write().await;
        data.validate_attachment(attachment)?;

        let mut saved = attachment.clone();
        saved.id = Some(data.next_attachment_id());
        saved.filesize = saved.content.len() as u64;
        saved.created_on.get_or_insert_with(Utc::now);
        data.attachments.push(saved.clone());

        Ok(saved)
    }

    async fn save_custom_field_value(&self, value: &CustomFieldValue) -> Result<()> {
        let mut data = self.data.write().await;
        data.validate_custom_value(value)?;

        let issue_id = value
            .customized_id
            .ok_or_else(|| Error::ValidationFailed("Customized cannot be blank".to_string()))?;
        let issue = data
            .issues
            .iter_mut()
            .find(|i| i.id == Some(issue_id))
            .ok_or_else(|| Error::ValidationFailed(format!("Issue {} does not exist", issue_id)))?;

        match issue
            .custom_field_values
            .iter_mut()
            .find(|v| v.custom_field_id == value.custom_field_id)
        {
            Some(existing) => existing.value = value.value.clone(),
            None => issue.custom_field_values.push(value.clone()),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::TimeZone;

    fn journal(id: u64, issue_id: u64) -> Journal {
        Journal {
            id,
            journalized_type: ContainerType::Issue,
            journalized_id: issue_id,
            user_id: 1,
            notes: String::new(),
            created_on: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_save_issue_assigns_id_and_owner() {
        // Given: Legacy IDフィールドを持つストア
        let store = InMemoryStore::new();
        store.insert_custom_field(CustomField::new(3, "Legacy ID")).await;

        // When: 新規Issueを保存
        let saved = store
            .save_issue(&Issue::new().subject("First").custom_value(3, "LID-1"))
            .await
            .unwrap();

        // Then: IDが採番され、カスタム値の所有者も設定される
        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.custom_field_values[0].customized_id, Some(1));
        assert!(saved.created_on.is_some());
        assert_eq!(store.find_all_issues().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_issue_rejects_blank_subject() {
        let store = InMemoryStore::new();

        let result = store.save_issue(&Issue::new()).await;

        match result {
            Err(Error::ValidationFailed(msg)) => assert_eq!(msg, "Subject cannot be blank"),
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_issue_rejects_duplicate_field_values() {
        let store = InMemoryStore::new();
        store.insert_custom_field(CustomField::new(3, "Legacy ID")).await;

        let issue = Issue::new()
            .subject("Dup")
            .custom_value(3, "LID-1")
            .custom_value(3, "LID-2");
        let result = store.save_issue(&issue).await;

        assert!(matches!(result, Err(Error::ValidationFailed(_))));
        assert!(store.find_all_issues().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_attachment_validation() {
        let store = InMemoryStore::new();
        let issue = store.save_issue(&Issue::new().subject("Host")).await.unwrap();

        // 空ファイルは拒否される
        let empty = Attachment::for_issue(&issue, "empty.txt", Bytes::new());
        assert!(matches!(
            store.save_attachment(&empty).await,
            Err(Error::ValidationFailed(_))
        ));

        // 未保存のIssueには添付できない
        let orphan = Attachment::for_issue(&Issue::new(), "a.txt", Bytes::from_static(b"x"));
        match store.save_attachment(&orphan).await {
            Err(Error::ValidationFailed(msg)) => assert_eq!(msg, "Container cannot be blank"),
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }

        let ok = Attachment::for_issue(&issue, "a.txt", Bytes::from_static(b"abc"));
        let saved = store.save_attachment(&ok).await.unwrap();
        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.filesize, 3);
        assert!(saved.created_on.is_some());
    }

    #[tokio::test]
    async fn test_save_custom_field_value_enforces_max_length() {
        let store = InMemoryStore::new();
        store
            .insert_custom_field(CustomField::new(3, "Legacy ID").max_length(5))
            .await;
        let issue = store
            .save_issue(&Issue::new().subject("Host").custom_value(3, "LID-1"))
            .await
            .unwrap();

        let mut value = issue.custom_field_values[0].clone();
        value.value = "LID-123456".to_string();
        let result = store.save_custom_field_value(&value).await;

        match result {
            Err(Error::ValidationFailed(msg)) => {
                assert_eq!(msg, "Legacy ID is too long (maximum is 5 characters)")
            }
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
        let stored = store.find_all_issues().await.unwrap();
        assert_eq!(stored[0].custom_field_values[0].value, "LID-1");
    }

    #[tokio::test]
    async fn test_delete_journal_does_not_cascade() {
        let store = InMemoryStore::new();
        store.insert_journal(journal(1, 7)).await;
        store
            .insert_journal_detail(JournalDetail {
                id: 1,
                journal_id: 1,
                property: "attr".to_string(),
                prop_key: "status_id".to_string(),
                old_value: Some("1".to_string()),
                value: Some("2".to_string()),
            })
            .await;

        assert!(store.delete_journal(1).await.unwrap());
        assert!(!store.delete_journal(1).await.unwrap());

        // 明細は明示的に削除するまで残る
        assert_eq!(store.find_journal_details(1).await.unwrap().len(), 1);
        assert_eq!(store.delete_journal_details(1).await.unwrap(), 1);
        assert!(store.find_journal_details(1).await.unwrap().is_empty());
    }
}
