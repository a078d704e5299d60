use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// 同期済みのタイムエントリー1件分の記録。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub synced_at: DateTime<Utc>,
    pub asana_task_gid: String,
    pub duration_minutes: i64,
    pub entered_on: String,
    /// Asanaに同じ記録が既にあり、作成を行わなかった場合に`true`となる。
    #[serde(default, skip_serializing_if = "is_false")]
    pub already_existed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// TogglのエントリーIDから同期結果への対応表。
///
/// 記録は実行中はメモリ上でのみ更新し、`persist`でまとめて書き出す。
/// 一度記録されたエントリーが再び作成されることはない。
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    records: BTreeMap<u64, LedgerRecord>,
}

impl Ledger {
    /// 台帳を読み込む。
    ///
    /// ファイルが存在しない場合は初回実行とみなし、空の台帳を返す。
    /// 権限不足など、それ以外の読み込みエラーはそのまま返す。
    pub fn load(path: &Path) -> Result<Self> {
        let records = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse ledger: {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No ledger at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read ledger: {}", path.display()));
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn is_synced(&self, entry_id: u64) -> bool {
        self.records.contains_key(&entry_id)
    }

    #[cfg(test)]
    pub fn get(&self, entry_id: u64) -> Option<&LedgerRecord> {
        self.records.get(&entry_id)
    }

    /// 記録を追加または更新する。ファイルへは書き込まない。
    pub fn record(&mut self, entry_id: u64, record: LedgerRecord) {
        self.records.insert(entry_id, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 台帳全体をファイルに書き出す。
    ///
    /// 同じディレクトリの一時ファイルに書いてから置き換えるため、
    /// 途中で失敗しても以前の台帳は壊れない。
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create ledger directory: {}", parent.display())
                })?;
            }
        }

        let mut content =
            serde_json::to_string_pretty(&self.records).context("Failed to serialize ledger")?;
        content.push('\n');

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write ledger: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace ledger: {}", self.path.display()))?;
        debug!("Persisted {} ledger records", self.records.len());

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".to_string());
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }
}
