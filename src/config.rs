use std::{env, path::PathBuf};

use anyhow::{Context, Result};

pub const TOGGL_API_TOKEN: &str = "TOGGL_API_TOKEN";
pub const TOGGL_WORKSPACE_ID: &str = "TOGGL_WORKSPACE_ID";
pub const ASANA_ACCESS_TOKEN: &str = "ASANA_ACCESS_TOKEN";
pub const LEDGER_PATH: &str = "TOGGL2ASANA_LEDGER";

/// 同期処理全体で利用する設定。
///
/// 起動時に一度だけ構築し、各クライアントとコマンドには参照で渡す。
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub toggl_api_token: String,
    pub toggl_workspace_id: u64,
    pub asana_access_token: String,
    pub ledger_path: PathBuf,
}

impl Config {
    /// 環境変数から設定を読み込む。
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 指定された関数で値を引いて設定を構築する。
    ///
    /// 必須の値が存在しない、または空の場合はエラーを返す。
    ///
    /// # Arguments
    ///
    /// * `lookup` - キーに対応する値を返す関数
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };

        let toggl_api_token = required(TOGGL_API_TOKEN)?;
        let toggl_workspace_id = required(TOGGL_WORKSPACE_ID)?
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a numeric workspace id", TOGGL_WORKSPACE_ID))?;
        let asana_access_token = required(ASANA_ACCESS_TOKEN)?;
        let ledger_path = lookup(LEDGER_PATH)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_ledger_path);

        Ok(Self {
            toggl_api_token,
            toggl_workspace_id,
            asana_access_token,
            ledger_path,
        })
    }
}

/// 台帳ファイルのデフォルトの保存先。
fn default_ledger_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toggl2asana")
        .join("synced_entries.json")
}
