use anyhow::{Context, Result};
use log::debug;

use crate::cache::Memo;
use crate::task::LinkedTask;
use crate::toggl::TogglRepository;

/// Togglのタスクの連携情報を解決する。
///
/// 結果は`task_id`ごとにキャッシュし、同じ実行中に同じタスクを二度問い合わせない。
/// 取得に失敗した場合はキャッシュせずにエラーを返す。
///
/// # Arguments
///
/// * `toggl` - Toggl APIと通信するためのリポジトリ
/// * `cache` - 実行中のみ有効なタスクのキャッシュ
/// * `project_id` - タスクが属するプロジェクトのID
/// * `task_id` - 解決するタスクのID
pub async fn resolve_task<T: TogglRepository>(
    toggl: &T,
    cache: &mut Memo<u64, LinkedTask>,
    project_id: u64,
    task_id: u64,
) -> Result<LinkedTask> {
    if let Some(task) = cache.get(&task_id) {
        debug!("Task {} resolved from cache", task_id);
        return Ok(task.clone());
    }

    let task = toggl
        .read_task(project_id, task_id)
        .await
        .with_context(|| format!("Failed to resolve Toggl task {}", task_id))?;
    cache.insert(task_id, task.clone());

    Ok(task)
}
