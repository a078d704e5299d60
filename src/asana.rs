use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::remote::ensure_success;

const ASANA_API_URL: &str = "https://app.asana.com/api/1.0";
const PAGE_LIMIT: &str = "100";

/// Asanaのタスクに登録済みの時間記録。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AsanaTimeEntry {
    pub entered_on: String,
    pub duration_minutes: i64,
}

/// Asana APIと通信するためのリポジトリ。
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait AsanaRepository {
    /// タスクに登録済みの時間記録を全件取得する。
    async fn read_time_tracking_entries(&self, task_gid: &str) -> Result<Vec<AsanaTimeEntry>>;

    /// タスクに時間記録を作成する。
    async fn create_time_tracking_entry(
        &self,
        task_gid: &str,
        duration_minutes: i64,
        entered_on: &str,
    ) -> Result<()>;
}

/// Asana APIのレスポンスを包む`data`要素。
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    next_page: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    offset: String,
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    data: NewTimeTrackingEntry<'a>,
}

#[derive(Debug, Serialize)]
struct NewTimeTrackingEntry<'a> {
    duration_minutes: i64,
    entered_on: &'a str,
}

/// Asana APIと通信するためのクライアント。
pub struct AsanaClient {
    client: Client,
    api_url: String,
    access_token: String,
}

impl AsanaClient {
    /// 新しい`AsanaClient`を返す。
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(config, ASANA_API_URL)
    }

    /// 接続先を指定して新しい`AsanaClient`を返す。
    pub fn with_base_url(config: &Config, api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            access_token: config.asana_access_token.clone(),
        }
    }

    fn time_tracking_entries_url(&self, task_gid: &str) -> String {
        format!("{}/tasks/{}/time_tracking_entries", self.api_url, task_gid)
    }
}

impl AsanaRepository for AsanaClient {
    async fn read_time_tracking_entries(&self, task_gid: &str) -> Result<Vec<AsanaTimeEntry>> {
        let url = self.time_tracking_entries_url(task_gid);
        let mut entries = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query = vec![
                ("opt_fields", "entered_on,duration_minutes".to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(offset) = &offset {
                query.push(("offset", offset.clone()));
            }
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&query)
                .send()
                .await
                .with_context(|| format!("Failed to send request to Asana API at {}", url))?;
            let page = ensure_success(response)
                .await?
                .json::<Envelope<Vec<AsanaTimeEntry>>>()
                .await
                .context("Failed to deserialize time tracking entries")?;
            entries.extend(page.data);

            match page.next_page {
                Some(next) => offset = Some(next.offset),
                None => break,
            }
        }
        debug!("Task {} has {} time tracking entries", task_gid, entries.len());

        Ok(entries)
    }

    async fn create_time_tracking_entry(
        &self,
        task_gid: &str,
        duration_minutes: i64,
        entered_on: &str,
    ) -> Result<()> {
        let url = self.time_tracking_entries_url(task_gid);
        let request = CreateRequest {
            data: NewTimeTrackingEntry {
                duration_minutes,
                entered_on,
            },
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Asana API at {}", url))?;
        ensure_success(response).await?;

        Ok(())
    }
}
