use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::custom_field::CustomFieldIndex;
use crate::error::{Error, Result};
use crate::models::{CustomField, Issue};
use crate::store::DestinationStore;

/// Legacy IDをキーにした移行先Issueのキャッシュ
///
/// 構築時に全Issueを一度だけ読み込む。以降に他所で行われた書き込みは
/// `remember` で登録しない限り反映されない。
#[derive(Debug, Clone)]
pub struct IssueMatcher {
    legacy_field: CustomField,
    issues: Vec<Issue>,
    by_legacy_id: HashMap<String, usize>,
    by_issue_id: HashMap<u64, usize>,
}

impl IssueMatcher {
    /// ストアから全Issueを読み込んでキャッシュを構築
    pub async fn load(
        store: &dyn DestinationStore,
        fields: &CustomFieldIndex,
        field_name: &str,
    ) -> Result<Self> {
        let legacy_field = fields.resolve(field_name).await?;
        let issues = store.find_all_issues().await?;
        let matcher = Self::from_issues(legacy_field, issues);

        tracing::info!(
            field = field_name,
            issues = matcher.issues.len(),
            indexed = matcher.by_legacy_id.len(),
            "Built legacy ID index"
        );
        Ok(matcher)
    }

    /// 読み込み済みのIssue一覧からキャッシュを構築
    pub fn from_issues(legacy_field: CustomField, issues: Vec<Issue>) -> Self {
        let mut matcher = Self {
            legacy_field,
            issues: Vec::with_capacity(issues.len()),
            by_legacy_id: HashMap::new(),
            by_issue_id: HashMap::new(),
        };
        for issue in issues {
            matcher.push(issue);
        }
        matcher
    }

    fn legacy_value(&self, issue: &Issue) -> Option<String> {
        CustomFieldIndex::get_value(issue, &self.legacy_field).map(|cv| cv.value.clone())
    }

    /// 末尾に追加して索引付け（重複時は先に読み込んだIssueを優先）
    fn push(&mut self, issue: Issue) {
        let position = self.issues.len();
        let legacy_id = self.legacy_value(&issue);
        if let Some(id) = issue.id {
            self.by_issue_id.entry(id).or_insert(position);
        }

        if let Some(legacy_id) = legacy_id {
            match self.by_legacy_id.entry(legacy_id) {
                Entry::Occupied(entry) => {
                    tracing::warn!(
                        legacy_id = %entry.key(),
                        kept = ?self.issues[*entry.get()].id,
                        ignored = ?issue.id,
                        "Duplicate legacy ID"
                    );
                }
                Entry::Vacant(entry) => {
                    entry.insert(position);
                }
            }
        }
        self.issues.push(issue);
    }

    /// キャッシュ済みIssueを同じ位置で置き換え、Legacy IDが変わった場合のみ索引を更新
    fn replace(&mut self, position: usize, issue: Issue) {
        let old_legacy_id = self.legacy_value(&self.issues[position]);
        let new_legacy_id = self.legacy_value(&issue);
        self.issues[position] = issue;

        if old_legacy_id == new_legacy_id {
            return;
        }

        if let Some(old) = old_legacy_id {
            if self.by_legacy_id.get(&old) == Some(&position) {
                self.by_legacy_id.remove(&old);
                // 同じ旧値を持つ次のIssueが先頭になる
                if let Some(next) = self.first_position_of(&old) {
                    self.by_legacy_id.insert(old, next);
                }
            }
        }

        if let Some(new) = new_legacy_id {
            match self.by_legacy_id.entry(new) {
                Entry::Occupied(mut entry) => {
                    if *entry.get() > position {
                        entry.insert(position);
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(position);
                }
            }
        }
    }

    fn first_position_of(&self, legacy_id: &str) -> Option<usize> {
        self.issues.iter().position(|issue| {
            CustomFieldIndex::get_value(issue, &self.legacy_field)
                .is_some_and(|cv| cv.value == legacy_id)
        })
    }

    pub fn legacy_field(&self) -> &CustomField {
        &self.legacy_field
    }

    /// キャッシュ済みIssue数
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Legacy IDが一致するIssueを検索
    pub fn find_by_legacy_id(&self, legacy_id: &str) -> Option<&Issue> {
        self.by_legacy_id
            .get(legacy_id)
            .map(|&position| &self.issues[position])
    }

    /// Legacy IDが一致するIssueを取得（存在しなければ `IssueNotFound`）
    pub fn get_or_fail(&self, legacy_id: &str) -> Result<&Issue> {
        self.find_by_legacy_id(legacy_id)
            .ok_or_else(|| Error::IssueNotFound(legacy_id.to_string()))
    }

    /// 一致するIssue、なければ未保存の新規Issueを返す
    pub fn get_or_create(&self, legacy_id: &str) -> Issue {
        match self.find_by_legacy_id(legacy_id) {
            Some(issue) => issue.clone(),
            None => {
                tracing::debug!(legacy_id, "No issue for legacy ID, using new issue");
                Issue::new()
            }
        }
    }

    /// 同じ実行中に保存したIssueを登録（2巡目以降の照合で見つかるようにする）
    ///
    /// キャッシュ済みのIssueは読み込み順の位置を保ったまま置き換える。
    pub fn remember(&mut self, issue: Issue) -> Result<()> {
        let Some(issue_id) = issue.id else {
            return Err(Error::InvalidInput(
                "Only saved issues can be remembered".to_string(),
            ));
        };
        if CustomFieldIndex::get_value(&issue, &self.legacy_field).is_none() {
            return Err(Error::InvalidInput(format!(
                "Issue {} has no {} value",
                issue_id, self.legacy_field.name
            )));
        }

        match self.by_issue_id.get(&issue_id).copied() {
            Some(position) => self.replace(position, issue),
            None => self.push(issue),
        }
        Ok(())
    }
}
