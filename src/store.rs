use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Attachment, ContainerType, CustomField, CustomFieldValue, Issue, Journal, JournalDetail,
};

/// 移行先ストアへのリポジトリ抽象化トレイト
///
/// 保存系メソッドはストアの検証に失敗すると `Error::ValidationFailed` を返す。
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// 全てのIssueを読み込み
    async fn find_all_issues(&self) -> Result<Vec<Issue>>;

    /// 名前が完全一致するカスタムフィールド定義を取得
    async fn find_custom_field_by_name(&self, name: &str) -> Result<Option<CustomField>>;

    /// 指定コンテナの添付ファイルを取得
    async fn find_attachments(
        &self,
        container_type: ContainerType,
        container_id: u64,
    ) -> Result<Vec<Attachment>>;

    /// 指定コンテナの添付ファイルを一括削除し、削除件数を返す
    async fn delete_attachments(
        &self,
        container_type: ContainerType,
        container_id: u64,
    ) -> Result<usize>;

    /// 指定対象の変更履歴を取得
    async fn find_journals(&self, subject_type: ContainerType, subject_id: u64)
    -> Result<Vec<Journal>>;

    /// 変更履歴を1件削除（明細は連鎖削除されない）
    async fn delete_journal(&self, journal_id: u64) -> Result<bool>;

    /// 指定変更履歴の明細を取得
    async fn find_journal_details(&self, journal_id: u64) -> Result<Vec<JournalDetail>>;

    /// 指定変更履歴の明細を全て削除し、削除件数を返す
    async fn delete_journal_details(&self, journal_id: u64) -> Result<usize>;

    /// Issueを保存（新規の場合はIDが採番されたIssueを返す）
    async fn save_issue(&self, issue: &Issue) -> Result<Issue>;

    /// 添付ファイルを保存（採番済みの添付ファイルを返す）
    async fn save_attachment(&self, attachment: &Attachment) -> Result<Attachment>;

    /// 既存のカスタムフィールド値を保存
    async fn save_custom_field_value(&self, value: &CustomFieldValue) -> Result<()>;
}
