use async_trait::async_trait;
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tokio::fs::{File, create_dir_all, rename};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::memory_store::{InMemoryStore, StoreSnapshot};
use crate::models::{
    Attachment, ContainerType, CustomField, CustomFieldValue, Issue, Journal, JournalDetail,
};
use crate::store::DestinationStore;

/// JSONスナップショットファイルを背後に持つ移行先ストア（gzip圧縮対応）
///
/// 読み込み後はメモリ上の `InMemoryStore` で処理し、書き込みのたびに
/// ファイルへ書き戻す（`with_auto_flush(false)` の場合は `flush` 呼び出し時のみ）。
pub struct JsonStore {
    /// データディレクトリのパス
    data_dir: PathBuf,
    /// gzip圧縮を使用するかどうか
    use_compression: bool,
    /// 書き込みごとにファイルへ反映するかどうか
    auto_flush: bool,
    inner: InMemoryStore,
}

impl JsonStore {
    /// 新しいJSONストアを作成（内容は `load` で読み込む）
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            use_compression: true,
            auto_flush: true,
            inner: InMemoryStore::new(),
        }
    }

    /// 圧縮設定を変更
    pub fn with_compression(mut self, use_compression: bool) -> Self {
        self.use_compression = use_compression;
        self
    }

    /// 書き込みごとのファイル反映を設定
    pub fn with_auto_flush(mut self, auto_flush: bool) -> Self {
        self.auto_flush = auto_flush;
        self
    }

    /// スナップショットファイルのパスを取得
    pub fn snapshot_path(&self) -> PathBuf {
        let filename = if self.use_compression {
            "store.json.gz"
        } else {
            "store.json"
        };
        self.data_dir.join(filename)
    }

    /// ファイルから内容を読み込み（ファイルがなければ空のストア）
    pub async fn load(mut self) -> Result<Self> {
        let path = self.snapshot_path();
        if path.exists() {
            let snapshot = self.read_snapshot(&path).await?;
            tracing::debug!(
                path = %path.display(),
                issues = snapshot.issues.len(),
                attachments = snapshot.attachments.len(),
                "Loaded store snapshot"
            );
            self.inner = InMemoryStore::from_snapshot(snapshot);
        }
        Ok(self)
    }

    /// スナップショットを初期内容として書き込み、そのストアを返す
    pub async fn create(self, snapshot: StoreSnapshot) -> Result<Self> {
        let store = Self {
            inner: InMemoryStore::from_snapshot(snapshot),
            ..self
        };
        store.flush().await?;
        Ok(store)
    }

    /// 現在の内容を取得
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.inner.snapshot().await
    }

    /// 現在の内容をファイルに書き込み
    pub async fn flush(&self) -> Result<()> {
        create_dir_all(&self.data_dir).await?;
        let snapshot = self.inner.snapshot().await;
        self.write_snapshot(&self.snapshot_path(), &snapshot).await
    }

    async fn flush_if_enabled(&self) -> Result<()> {
        if self.auto_flush {
            self.flush().await?;
        }
        Ok(())
    }

    async fn write_snapshot(&self, path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
        let json_data = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| Error::SerializationError(format!("JSON serialization failed: {}", e)))?;

        let final_data = if self.use_compression {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&json_data)?;
            encoder.finish()?
        } else {
            json_data
        };

        // 一時ファイルに書き込んでから置き換える
        let temp_path = temp_path_for(path);
        let mut file = File::create(&temp_path).await?;
        file.write_all(&final_data).await?;
        file.sync_all().await?;
        drop(file);
        rename(&temp_path, path).await?;

        Ok(())
    }

    async fn read_snapshot(&self, path: &Path) -> Result<StoreSnapshot> {
        let mut file = File::open(path).await?;
        let mut raw_data = Vec::new();
        file.read_to_end(&mut raw_data).await?;

        let json_data = if self.use_compression {
            let mut decoder = GzDecoder::new(&raw_data[..]);
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed)?;
            decompressed
        } else {
            raw_data
        };

        serde_json::from_slice(&json_data)
            .map_err(|e| Error::SerializationError(format!("JSON deserialization failed: {}", e)))
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[async_trait]
impl DestinationStore for JsonStore {
    async fn find_all_issues(&self) -> Result<Vec<Issue>> {
        self.inner.find_all_issues().await
    }

    async fn find_custom_field_by_name(&self, name: &str) -> Result<Option<CustomField>> {
        self.inner.find_custom_field_by_name(name).await
    }

    async fn find_attachments(
        &self,
        container_type: ContainerType,
        container_id: u64,
    ) -> Result<Vec<Attachment>> {
        self.inner.find_attachments(container_type, container_id).await
    }

    async fn delete_attachments(
        &self,
        container_type: ContainerType,
        container_id: u64,
    ) -> Result<usize> {
        let deleted = self
            .inner
            .delete_attachments(container_type, container_id)
            .await?;
        self.flush_if_enabled().await?;
        Ok(deleted)
    }

    async fn find_journals(
        &self,
        subject_type: ContainerType,
        subject_id: u64,
    ) -> Result<Vec<Journal>> {
        self.inner.find_journals(subject_type, subject_id).await
    }

    async fn delete_journal(&self, journal_id: u64) -> Result<bool> {
        let deleted = self.inner.delete_journal(journal_id).await?;
        self.flush_if_enabled().await?;
        Ok(deleted)
    }

    async fn find_journal_details(&self, journal_id: u64) -> Result<Vec<JournalDetail>> {
        self.inner.find_journal_details(journal_id).await
    }

    async fn delete_journal_details(&self, journal_id: u64) -> Result<usize> {
        let deleted = self.inner.delete_journal_details(journal_id).await?;
        self.flush_if_enabled().await?;
        Ok(deleted)
    }

    async fn save_issue(&self, issue: &Issue) -> Result<Issue> {
        let saved = self.inner.save_issue(issue).await?;
        self.flush_if_enabled().await?;
        Ok(saved)
    }

    async fn save_attachment(&self, attachment: &Attachment) -> Result<Attachment> {
        let saved = self.inner.save_attachment(attachment).await?;
        self.flush_if_enabled().await?;
        Ok(saved)
    }

    async fn save_custom_field_value(&self, value: &CustomFieldValue) -> Result<()> {
        self.inner.save_custom_field_value(value).await?;
        self.flush_if_enabled().await
    }
}
