use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{CustomField, CustomFieldValue, Issue};
use crate::store::DestinationStore;

/// カスタムフィールド定義の解決と値の読み書き
#[derive(Clone)]
pub struct CustomFieldIndex {
    store: Arc<dyn DestinationStore>,
}

impl CustomFieldIndex {
    pub fn new(store: Arc<dyn DestinationStore>) -> Self {
        Self { store }
    }

    /// 名前が完全一致するフィールド定義を取得
    pub async fn resolve(&self, name: &str) -> Result<CustomField> {
        self.store
            .find_custom_field_by_name(name)
            .await?
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))
    }

    /// Issueが持つ指定フィールドの値を取得（最初に一致したもの）
    pub fn get_value<'a>(issue: &'a Issue, field: &CustomField) -> Option<&'a CustomFieldValue> {
        issue
            .custom_field_values
            .iter()
            .find(|cv| cv.custom_field_id == field.id)
    }

    /// 既存のカスタムフィールド値を上書きして保存
    ///
    /// 値が存在しない場合は新規作成せず `CustomValueNotFound` を返す。
    /// `issue` はストアへの保存に成功した場合のみ更新される。
    pub async fn set_value(&self, issue: &mut Issue, name: &str, value: &str) -> Result<()> {
        let field = self.resolve(name).await?;

        let mut updated = Self::get_value(issue, &field)
            .cloned()
            .ok_or_else(|| Error::CustomValueNotFound(name.to_string()))?;
        updated.value = value.to_string();
        updated.customized_id = issue.id;

        self.store.save_custom_field_value(&updated).await?;

        if let Some(existing) = issue
            .custom_field_values
            .iter_mut()
            .find(|cv| cv.custom_field_id == field.id)
        {
            *existing = updated;
        }

        tracing::debug!(issue_id = ?issue.id, field = name, "Updated custom value");
        Ok(())
    }
}
