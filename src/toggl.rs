use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{Duration, NaiveDate};
use log::{debug, info, warn};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::remote::ensure_success;
use crate::task::LinkedTask;
use crate::time_entry::{RawTimeEntry, TimeEntry};

const TOGGL_BASE_URL: &str = "https://api.track.toggl.com";
const NEXT_ROW_HEADER: &str = "X-Next-Row-Number";

/// タイムエントリーを取得する対象の範囲。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryScope {
    /// APIトークンのユーザー自身のエントリー。
    CurrentUser,
    /// ワークスペースの全メンバーのエントリー。
    Workspace,
}

/// Toggl APIから情報を取得するためのリポジトリ。
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait TogglRepository {
    /// 指定された期間(両端を含む)のタイムエントリーを取得する。
    ///
    /// タスクに紐づかないエントリーは含まれない。
    async fn read_time_entries(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        scope: EntryScope,
    ) -> Result<Vec<TimeEntry>>;

    /// タスクの連携情報を取得する。
    async fn read_task(&self, project_id: u64, task_id: u64) -> Result<LinkedTask>;
}

/// `/me/time_entries`のレスポンスをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglTimeEntry {
    id: u64,
    task_id: Option<u64>,
    project_id: Option<u64>,
    start: String,
    duration: Option<i64>,
    description: Option<String>,
    billable: Option<bool>,
}

/// Reports APIの検索リクエスト。
#[derive(Debug, Serialize)]
struct ReportSearchRequest {
    start_date: String,
    end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_row_number: Option<u64>,
}

/// Reports APIが返すタスク・プロジェクト・ユーザー単位のグループ。
#[derive(Debug, Deserialize)]
struct ReportGroup {
    user_id: Option<u64>,
    project_id: Option<u64>,
    task_id: Option<u64>,
    description: Option<String>,
    billable: Option<bool>,
    #[serde(default)]
    time_entries: Vec<ReportTimeEntry>,
}

/// Reports APIのグループに含まれる個々のエントリー。
#[derive(Debug, Deserialize)]
struct ReportTimeEntry {
    id: u64,
    seconds: Option<i64>,
    start: String,
}

/// Toggl APIのタスク詳細をデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglTask {
    name: String,
    integration_provider: Option<String>,
    integration_ext_id: Option<String>,
}

/// Toggl APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = TogglClient::new(&config);
/// let entries = client.read_time_entries(start, end, EntryScope::Workspace).await?;
/// ```
pub struct TogglClient {
    client: Client,
    base_url: String,
    workspace_id: u64,
    auth_header: String,
}

impl TogglClient {
    /// 新しい`TogglClient`を返す。
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(config, TOGGL_BASE_URL)
    }

    /// 接続先を指定して新しい`TogglClient`を返す。
    ///
    /// Basic認証のヘッダーはここで一度だけ計算し、以降のリクエストで使い回す。
    pub fn with_base_url(config: &Config, base_url: &str) -> Self {
        let credential = STANDARD.encode(format!("{}:api_token", config.toggl_api_token));

        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            workspace_id: config.toggl_workspace_id,
            auth_header: format!("Basic {}", credential),
        }
    }

    /// ユーザー自身のタイムエントリーを取得する。
    ///
    /// `end_date`はAPI側で排他的に扱われるため、1日進めて指定する。
    async fn read_my_time_entries(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RawTimeEntry>> {
        let url = format!("{}/api/v9/me/time_entries", self.base_url);
        let exclusive_end = end_date + Duration::days(1);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("start_date", start_date.format("%Y-%m-%d").to_string()),
                ("end_date", exclusive_end.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send request to Toggl API at {}", url))?;
        let toggl_time_entries = ensure_success(response)
            .await?
            .json::<Vec<TogglTimeEntry>>()
            .await
            .context("Failed to deserialize time entries")?;

        Ok(toggl_time_entries
            .into_iter()
            .map(|entry| RawTimeEntry {
                id: entry.id,
                task_id: entry.task_id,
                project_id: entry.project_id,
                user_id: None,
                start: entry.start,
                seconds: None,
                duration: entry.duration,
                description: entry.description,
                billable: entry.billable,
            })
            .collect())
    }

    /// ワークスペース全体のタイムエントリーをReports APIから取得する。
    ///
    /// グループ単位で返されるため、エントリーごとに平坦化してグループの属性を複写する。
    async fn read_workspace_time_entries(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RawTimeEntry>> {
        let url = format!(
            "{}/reports/api/v3/workspace/{}/search/time_entries",
            self.base_url, self.workspace_id
        );
        let mut groups: Vec<ReportGroup> = Vec::new();
        let mut first_row_number = None;

        loop {
            let request = ReportSearchRequest {
                start_date: start_date.format("%Y-%m-%d").to_string(),
                end_date: end_date.format("%Y-%m-%d").to_string(),
                first_row_number,
            };
            let response = self
                .client
                .post(&url)
                .header(AUTHORIZATION, &self.auth_header)
                .json(&request)
                .send()
                .await
                .with_context(|| format!("Failed to send request to Toggl API at {}", url))?;
            let response = ensure_success(response).await?;
            let next_row = response
                .headers()
                .get(NEXT_ROW_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok());
            let page = response
                .json::<Vec<ReportGroup>>()
                .await
                .context("Failed to deserialize report groups")?;
            debug!("Fetched {} report groups", page.len());
            groups.extend(page);

            match next_row {
                Some(row) if row > first_row_number.unwrap_or(0) => first_row_number = Some(row),
                Some(row) => {
                    warn!("Reports API returned a non-advancing next row {}, stopping", row);
                    break;
                }
                None => break,
            }
        }

        Ok(flatten_groups(groups))
    }
}

impl TogglRepository for TogglClient {
    async fn read_time_entries(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        scope: EntryScope,
    ) -> Result<Vec<TimeEntry>> {
        let raw_entries = match scope {
            EntryScope::CurrentUser => self.read_my_time_entries(start_date, end_date).await?,
            EntryScope::Workspace => {
                self.read_workspace_time_entries(start_date, end_date)
                    .await?
            }
        };
        info!("Fetched {} time entries from Toggl", raw_entries.len());

        Ok(normalize_entries(raw_entries))
    }

    async fn read_task(&self, project_id: u64, task_id: u64) -> Result<LinkedTask> {
        let url = format!(
            "{}/api/v9/workspaces/{}/projects/{}/tasks/{}",
            self.base_url, self.workspace_id, project_id, task_id
        );
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to Toggl API at {}", url))?;
        let task = ensure_success(response)
            .await?
            .json::<TogglTask>()
            .await
            .context("Failed to deserialize task")?;

        Ok(LinkedTask {
            integration_provider: task.integration_provider,
            integration_ext_id: task.integration_ext_id,
            name: task.name,
        })
    }
}

/// Reports APIのグループを1エントリー1レコードに平坦化する。
fn flatten_groups(groups: Vec<ReportGroup>) -> Vec<RawTimeEntry> {
    groups
        .into_iter()
        .flat_map(|group| {
            let ReportGroup {
                user_id,
                project_id,
                task_id,
                description,
                billable,
                time_entries,
            } = group;
            time_entries.into_iter().map(move |entry| RawTimeEntry {
                id: entry.id,
                task_id,
                project_id,
                user_id,
                start: entry.start,
                seconds: entry.seconds,
                duration: None,
                description: description.clone(),
                billable,
            })
        })
        .collect()
}

/// 正規化できたエントリーだけを返す。
///
/// 時間が不正なエントリーは警告を出して除外し、タスクに紐づかないエントリーは黙って除外する。
fn normalize_entries(raw_entries: Vec<RawTimeEntry>) -> Vec<TimeEntry> {
    raw_entries
        .into_iter()
        .filter_map(|raw| {
            let id = raw.id;
            match raw.normalize() {
                Ok(Some(entry)) => Some(entry),
                Ok(None) => {
                    debug!("Skipping time entry {} without a task", id);
                    None
                }
                Err(e) => {
                    warn!("Skipping malformed time entry: {:#}", e);
                    None
                }
            }
        })
        .collect()
}
