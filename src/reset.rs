use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::models::ContainerType;
use crate::store::DestinationStore;

/// 1件のIssueに対する削除件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    pub attachments_deleted: usize,
    pub journals_deleted: usize,
    pub journal_details_deleted: usize,
}

/// 再インポート前にIssueの子レコード（添付ファイル・変更履歴）を削除する
#[derive(Clone)]
pub struct ChildRecordReset {
    store: Arc<dyn DestinationStore>,
}

impl ChildRecordReset {
    pub fn new(store: Arc<dyn DestinationStore>) -> Self {
        Self { store }
    }

    /// Issueの添付ファイルを一括削除
    pub async fn reset_attachments(&self, issue_id: u64) -> Result<usize> {
        let deleted = self
            .store
            .delete_attachments(ContainerType::Issue, issue_id)
            .await?;
        tracing::debug!(issue_id, deleted, "Reset attachments");
        Ok(deleted)
    }

    /// Issueの変更履歴と明細を削除し、削除した変更履歴の件数を返す
    pub async fn reset_journal(&self, issue_id: u64) -> Result<usize> {
        Ok(self.reset_journal_counts(issue_id).await?.0)
    }

    /// 添付ファイルと変更履歴をまとめて削除
    pub async fn reset_all(&self, issue_id: u64) -> Result<ResetSummary> {
        let attachments_deleted = self.reset_attachments(issue_id).await?;
        let (journals_deleted, journal_details_deleted) =
            self.reset_journal_counts(issue_id).await?;

        Ok(ResetSummary {
            attachments_deleted,
            journals_deleted,
            journal_details_deleted,
        })
    }

    async fn reset_journal_counts(&self, issue_id: u64) -> Result<(usize, usize)> {
        let journals = self
            .store
            .find_journals(ContainerType::Issue, issue_id)
            .await?;

        let mut journals_deleted = 0;
        let mut details_deleted = 0;
        for journal in &journals {
            // 明細は連鎖削除されないため明示的に削除する
            details_deleted += self.store.delete_journal_details(journal.id).await?;
            if self.store.delete_journal(journal.id).await? {
                journals_deleted += 1;
            }
        }

        tracing::debug!(
            issue_id,
            journals = journals_deleted,
            details = details_deleted,
            "Reset journal"
        );
        Ok((journals_deleted, details_deleted))
    }
}
