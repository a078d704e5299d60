use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use log::{debug, error, info};

use crate::asana::{AsanaRepository, AsanaTimeEntry};
use crate::cache::Memo;
use crate::datetime;
use crate::duplicate::{existing_entries, is_duplicate};
use crate::grouping::{group_by_task, TaskGroup};
use crate::ledger::{Ledger, LedgerRecord};
use crate::resolver::resolve_task;
use crate::task::LinkedTask;
use crate::toggl::{EntryScope, TogglRepository};

/// 期間が指定されなかった場合に遡る日数。
const DEFAULT_RANGE_DAYS: i64 = 7;

/// 同期処理の引数。
#[derive(Debug, clap::Args)]
pub struct SyncArgs {
    #[clap(
        short = 's',
        long = "start",
        help = "First date to sync in the format YYYY-MM-DD (defaults to 7 days before the end date)",
        parse(try_from_str = datetime::parse_date),
    )]
    start: Option<NaiveDate>,

    #[clap(
        short = 'e',
        long = "end",
        help = "Last date to sync in the format YYYY-MM-DD (defaults to today)",
        parse(try_from_str = datetime::parse_date),
    )]
    end: Option<NaiveDate>,

    #[clap(long = "all-users", help = "Sync entries of every workspace member")]
    all_users: bool,

    #[clap(long = "ledger", help = "Path of the sync ledger file")]
    pub ledger: Option<PathBuf>,

    #[clap(long = "dry-run", help = "Show what would be created without writing anything")]
    dry_run: bool,
}

impl SyncArgs {
    /// 引数を解決して同期のオプションを返す。
    ///
    /// 終了日の既定は今日、開始日の既定は終了日の7日前とする。
    pub fn to_options(&self, today: NaiveDate) -> Result<SyncOptions> {
        let end_date = self.end.unwrap_or(today);
        let start_date = self
            .start
            .unwrap_or_else(|| end_date - Duration::days(DEFAULT_RANGE_DAYS));
        if start_date > end_date {
            bail!("Start date {} is after end date {}", start_date, end_date);
        }
        let scope = if self.all_users {
            EntryScope::Workspace
        } else {
            EntryScope::CurrentUser
        };

        Ok(SyncOptions {
            start_date,
            end_date,
            scope,
            dry_run: self.dry_run,
        })
    }
}

/// 1回の同期処理の対象と動作。
#[derive(Clone, Debug, PartialEq)]
pub struct SyncOptions {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub scope: EntryScope,
    pub dry_run: bool,
}

/// 同期処理の結果の件数。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// 新しいエントリーを処理し終えたタスク数。
    pub synced_tasks: usize,
    /// 全エントリーが同期済みだったタスク数。
    pub already_synced_tasks: usize,
    /// Asanaと連携していないため対象外としたタスク数。
    pub skipped_tasks: usize,
    /// 処理中にエラーとなったタスク数。
    pub failed_tasks: usize,
    pub created_entries: usize,
    pub existing_entries: usize,
}

enum TaskOutcome {
    Synced,
    AlreadySynced,
    Skipped,
}

/// TogglのタイムエントリーをAsanaに同期するコマンド。
pub struct SyncCommand<'a, T: TogglRepository, A: AsanaRepository> {
    toggl: &'a T,
    asana: &'a A,
}

impl<'a, T: TogglRepository, A: AsanaRepository> SyncCommand<'a, T, A> {
    /// 新しい`SyncCommand`を返す。
    ///
    /// # Arguments
    /// * `toggl` - Toggl APIと通信するためのリポジトリ
    /// * `asana` - Asana APIと通信するためのリポジトリ
    pub fn new(toggl: &'a T, asana: &'a A) -> Self {
        Self { toggl, asana }
    }

    /// 同期処理を1回実行する。
    ///
    /// 台帳を読み込み、期間内のエントリーをタスクごとに処理してから台帳を一度だけ書き出す。
    /// タスク単位のエラーはログに出して次のタスクへ進み、
    /// エントリー一覧の取得と台帳の読み書きの失敗のみを実行全体のエラーとする。
    ///
    /// # Arguments
    ///
    /// * `options` - 同期の対象期間と動作
    /// * `ledger_path` - 台帳ファイルのパス
    pub async fn run(&self, options: &SyncOptions, ledger_path: &Path) -> Result<SyncSummary> {
        let mut ledger = Ledger::load(ledger_path).context("Failed to load ledger")?;
        info!(
            "Loaded {} ledger records from {}",
            ledger.len(),
            ledger.path().display()
        );

        info!(
            "Start date: {}, End date: {}, Scope: {:?}",
            options.start_date, options.end_date, options.scope
        );
        let time_entries = self
            .toggl
            .read_time_entries(options.start_date, options.end_date, options.scope)
            .await
            .context("Failed to retrieve time entries")?;
        let groups = group_by_task(time_entries);
        info!("Processing {} tasks", groups.len());

        let mut tasks: Memo<u64, LinkedTask> = Memo::new();
        let mut existing: Memo<String, Vec<AsanaTimeEntry>> = Memo::new();
        let mut summary = SyncSummary::default();

        for group in &groups {
            let outcome = self
                .sync_task(
                    group,
                    options.dry_run,
                    &mut ledger,
                    &mut tasks,
                    &mut existing,
                    &mut summary,
                )
                .await;
            match outcome {
                Ok(TaskOutcome::Synced) => summary.synced_tasks += 1,
                Ok(TaskOutcome::AlreadySynced) => summary.already_synced_tasks += 1,
                Ok(TaskOutcome::Skipped) => summary.skipped_tasks += 1,
                Err(e) => {
                    error!("Failed to sync task {}: {:#}", group.task_id, e);
                    summary.failed_tasks += 1;
                }
            }
        }

        debug!("Resolved {} distinct Toggl tasks", tasks.len());
        if options.dry_run {
            info!("Dry run, ledger not written");
        } else {
            ledger.persist().context("Failed to persist ledger")?;
            info!("Ledger saved with {} records", ledger.len());
        }

        Ok(summary)
    }

    /// 1タスク分のエントリーを同期する。
    ///
    /// 途中で失敗した場合、それまでに処理したエントリーは台帳に残り、残りは記録されない。
    async fn sync_task(
        &self,
        group: &TaskGroup,
        dry_run: bool,
        ledger: &mut Ledger,
        tasks: &mut Memo<u64, LinkedTask>,
        existing: &mut Memo<String, Vec<AsanaTimeEntry>>,
        summary: &mut SyncSummary,
    ) -> Result<TaskOutcome> {
        let task = resolve_task(self.toggl, tasks, group.project_id, group.task_id).await?;
        let task_gid = match task.asana_task_gid() {
            Some(gid) => gid.to_string(),
            None => {
                debug!(
                    "Skipping task {} ({}), not linked to Asana",
                    group.task_id, task.name
                );
                return Ok(TaskOutcome::Skipped);
            }
        };

        let new_entries: Vec<_> = group
            .entries
            .iter()
            .filter(|entry| !ledger.is_synced(entry.id))
            .collect();
        if new_entries.is_empty() {
            debug!("Task {} ({}) is already synced", group.task_id, task.name);
            return Ok(TaskOutcome::AlreadySynced);
        }

        let remote_entries = existing_entries(self.asana, existing, &task_gid).await;

        for entry in new_entries {
            let duration_minutes = entry.duration_minutes();
            let entered_on = entry.entered_on().to_string();
            let already_existed = is_duplicate(entry, &remote_entries);
            debug!(
                "Entry {}: {:?} billable={} start={}",
                entry.id, entry.description, entry.billable, entry.start
            );

            if already_existed {
                info!(
                    "Entry {} already exists on Asana task {} ({} min on {})",
                    entry.id, task_gid, duration_minutes, entered_on
                );
                summary.existing_entries += 1;
            } else if dry_run {
                info!(
                    "Would create {} min on {} for Asana task {} (entry {})",
                    duration_minutes, entered_on, task_gid, entry.id
                );
                summary.created_entries += 1;
                continue;
            } else {
                self.asana
                    .create_time_tracking_entry(&task_gid, duration_minutes, &entered_on)
                    .await
                    .with_context(|| {
                        format!(
                            "Failed to create time entry {} on Asana task {}",
                            entry.id, task_gid
                        )
                    })?;
                info!(
                    "Created {} min on {} for Asana task {} (entry {})",
                    duration_minutes, entered_on, task_gid, entry.id
                );
                summary.created_entries += 1;
            }

            ledger.record(
                entry.id,
                LedgerRecord {
                    synced_at: datetime::now(),
                    asana_task_gid: task_gid.clone(),
                    duration_minutes,
                    entered_on,
                    already_existed,
                    user_id: entry.user_id,
                },
            );
        }
        info!(
            "Synced task {} ({}) to Asana task {}",
            group.task_id, task.name, task_gid
        );

        Ok(TaskOutcome::Synced)
    }
}
