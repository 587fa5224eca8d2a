use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ImportConfig;
use crate::custom_field::CustomFieldIndex;
use crate::error::{Error, Result};
use crate::fetcher::AttachmentFetcher;
use crate::importer::{AttachmentImport, AttachmentImporter, SkipReason};
use crate::matcher::IssueMatcher;
use crate::models::{CustomFieldValue, Issue};
use crate::reset::ChildRecordReset;
use crate::store::DestinationStore;

/// 旧システムのカスタムフィールド値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyCustomValue {
    pub name: String,
    pub value: String,
}

/// 旧システムの添付ファイル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyAttachment {
    pub url: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
}

/// 旧システムから取り込む1件のレコード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRecord {
    pub legacy_id: String,
    /// 新規作成時のみ使われる
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub custom_values: Vec<LegacyCustomValue>,
    #[serde(default)]
    pub attachments: Vec<LegacyAttachment>,
}

impl LegacyRecord {
    pub fn new(legacy_id: impl Into<String>) -> Self {
        Self {
            legacy_id: legacy_id.into(),
            subject: String::new(),
            custom_values: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn custom_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_values.push(LegacyCustomValue {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn attachment(mut self, url: impl Into<String>, filename: impl Into<String>) -> Self {
        self.attachments.push(LegacyAttachment {
            url: url.into(),
            filename: filename.into(),
            created_on: None,
        });
        self
    }
}

/// スキップした添付ファイル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedAttachment {
    pub legacy_id: String,
    pub filename: String,
    pub reason: SkipReason,
}

/// インポート処理の結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    /// 開始時刻
    pub start_time: DateTime<Utc>,
    /// 終了時刻
    pub end_time: DateTime<Utc>,
    /// 処理したレコード数
    pub processed_records: usize,
    /// 新規作成したIssue数
    pub created_issues: usize,
    /// 既存Issueに反映したレコード数
    pub updated_issues: usize,
    /// 中断したレコード数
    pub failed_records: usize,
    /// 保存した添付ファイル数
    pub imported_attachments: usize,
    /// スキップした添付ファイル
    pub skipped_attachments: Vec<SkippedAttachment>,
    /// 削除した既存添付ファイル数
    pub attachments_deleted: usize,
    /// 削除した変更履歴数
    pub journals_deleted: usize,
    /// エラーメッセージ一覧
    pub error_messages: Vec<String>,
    /// エラーなく完了したかどうか（スキップはエラーに含めない）
    pub is_success: bool,
}

impl ImportReport {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            processed_records: 0,
            created_issues: 0,
            updated_issues: 0,
            failed_records: 0,
            imported_attachments: 0,
            skipped_attachments: Vec::new(),
            attachments_deleted: 0,
            journals_deleted: 0,
            error_messages: Vec::new(),
            is_success: false,
        }
    }

    /// 終了を記録
    pub fn finish(&mut self) {
        self.end_time = Utc::now();
        self.is_success = self.error_messages.is_empty();
    }

    pub fn add_error(&mut self, message: String) {
        self.error_messages.push(message);
    }

    /// 処理時間を取得（秒）
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

impl Default for ImportReport {
    fn default() -> Self {
        Self::new()
    }
}

/// 旧システムのレコード群を移行先ストアへ順に取り込む
pub struct ImportOrchestrator {
    config: ImportConfig,
    store: Arc<dyn DestinationStore>,
    fields: CustomFieldIndex,
    matcher: IssueMatcher,
    reset: ChildRecordReset,
    importer: AttachmentImporter,
}

impl ImportOrchestrator {
    /// 設定からフェッチャーを作成し、Issueキャッシュを構築する
    pub async fn new(store: Arc<dyn DestinationStore>, config: ImportConfig) -> Result<Self> {
        let fetcher = AttachmentFetcher::from_config(&config)?;
        Self::with_fetcher(store, config, fetcher).await
    }

    pub async fn with_fetcher(
        store: Arc<dyn DestinationStore>,
        config: ImportConfig,
        fetcher: AttachmentFetcher,
    ) -> Result<Self> {
        let fields = CustomFieldIndex::new(store.clone());
        let matcher = IssueMatcher::load(store.as_ref(), &fields, &config.legacy_id_field).await?;

        Ok(Self {
            reset: ChildRecordReset::new(store.clone()),
            importer: AttachmentImporter::new(store.clone(), fetcher),
            config,
            store,
            fields,
            matcher,
        })
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn matcher(&self) -> &IssueMatcher {
        &self.matcher
    }

    /// 全レコードを順に処理
    ///
    /// レコード単位のエラーはレポートに記録して次のレコードへ進む。
    /// ストア自体の障害（I/Oエラーなど）は処理全体を中断する。
    pub async fn run(&mut self, records: &[LegacyRecord]) -> Result<ImportReport> {
        let mut report = ImportReport::new();
        tracing::info!(records = records.len(), "Starting legacy import");

        for record in records {
            report.processed_records += 1;
            match self.import_record(record, &mut report).await {
                Ok(()) => {}
                Err(e) if e.is_record_fatal() => {
                    tracing::warn!(legacy_id = %record.legacy_id, error = %e, "Record failed");
                    report.failed_records += 1;
                    report.add_error(format!("{}: {}", record.legacy_id, e));
                }
                Err(e) => {
                    tracing::error!(legacy_id = %record.legacy_id, error = %e, "Aborting import");
                    return Err(e);
                }
            }
        }

        report.finish();
        tracing::info!(
            processed = report.processed_records,
            created = report.created_issues,
            updated = report.updated_issues,
            failed = report.failed_records,
            attachments = report.imported_attachments,
            skipped = report.skipped_attachments.len(),
            "Finished legacy import"
        );
        Ok(report)
    }

    async fn import_record(&mut self, record: &LegacyRecord, report: &mut ImportReport) -> Result<()> {
        let issue = if self.config.create_missing_issues {
            self.matcher.get_or_create(&record.legacy_id)
        } else {
            self.matcher.get_or_fail(&record.legacy_id)?.clone()
        };

        let issue = if issue.is_new_record() {
            let issue = self.create_issue(issue, record).await?;
            report.created_issues += 1;
            issue
        } else {
            let issue = self.update_issue(issue, record, report).await?;
            report.updated_issues += 1;
            issue
        };

        for attachment in &record.attachments {
            let result = self
                .importer
                .import_attachment(&attachment.url, &attachment.filename, &issue, attachment.created_on)
                .await;

            match result {
                Ok(AttachmentImport::Imported(_)) => report.imported_attachments += 1,
                Ok(AttachmentImport::Skipped(reason)) => {
                    report.skipped_attachments.push(SkippedAttachment {
                        legacy_id: record.legacy_id.clone(),
                        filename: attachment.filename.clone(),
                        reason,
                    });
                }
                // 添付ファイル単位の失敗はレコード全体を中断しない
                Err(e @ (Error::ValidationFailed(_) | Error::InvalidInput(_))) => {
                    tracing::warn!(
                        legacy_id = %record.legacy_id,
                        filename = %attachment.filename,
                        error = %e,
                        "Attachment failed"
                    );
                    report.add_error(format!(
                        "{}: attachment {}: {}",
                        record.legacy_id, attachment.filename, e
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    async fn create_issue(&mut self, mut issue: Issue, record: &LegacyRecord) -> Result<Issue> {
        let legacy_field_id = self.matcher.legacy_field().id;
        issue.subject = record.subject.clone();
        issue
            .custom_field_values
            .push(CustomFieldValue::new(legacy_field_id, record.legacy_id.clone()));

        for custom_value in &record.custom_values {
            let field = self.fields.resolve(&custom_value.name).await?;
            if field.id != legacy_field_id {
                issue
                    .custom_field_values
                    .push(CustomFieldValue::new(field.id, custom_value.value.clone()));
            }
        }

        let saved = self.store.save_issue(&issue).await?;
        tracing::info!(legacy_id = %record.legacy_id, issue_id = ?saved.id, "Created issue");
        self.matcher.remember(saved.clone())?;
        Ok(saved)
    }

    async fn update_issue(
        &mut self,
        mut issue: Issue,
        record: &LegacyRecord,
        report: &mut ImportReport,
    ) -> Result<Issue> {
        let issue_id = issue
            .id
            .ok_or_else(|| Error::Unexpected("Cached issue has no id".to_string()))?;

        for custom_value in &record.custom_values {
            self.fields
                .set_value(&mut issue, &custom_value.name, &custom_value.value)
                .await?;
        }

        report.attachments_deleted += self.reset.reset_attachments(issue_id).await?;
        if self.config.reset_journals {
            report.journals_deleted += self.reset.reset_journal(issue_id).await?;
        }

        tracing::debug!(legacy_id = %record.legacy_id, issue_id, "Reset issue for re-import");
        self.matcher.remember(issue.clone())?;
        Ok(issue)
    }
}
