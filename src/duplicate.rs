use log::warn;

use crate::asana::{AsanaRepository, AsanaTimeEntry};
use crate::cache::Memo;
use crate::time_entry::TimeEntry;

/// Asanaのタスクに登録済みの時間記録を取得する。
///
/// 結果はタスクのgidごとにキャッシュする。
/// 取得に失敗した場合は実行を止めず、警告を出して空の一覧を返す(重複作成の可能性は許容する)。
pub async fn existing_entries<A: AsanaRepository>(
    asana: &A,
    cache: &mut Memo<String, Vec<AsanaTimeEntry>>,
    task_gid: &str,
) -> Vec<AsanaTimeEntry> {
    if let Some(entries) = cache.get(task_gid) {
        return entries.clone();
    }

    match asana.read_time_tracking_entries(task_gid).await {
        Ok(entries) => {
            cache.insert(task_gid.to_string(), entries.clone());
            entries
        }
        Err(e) => {
            warn!(
                "Failed to fetch existing time entries for Asana task {}, assuming none: {:#}",
                task_gid, e
            );
            Vec::new()
        }
    }
}

/// 日付と分単位の時間が完全に一致する記録があれば重複とみなす。
pub fn is_duplicate(entry: &TimeEntry, existing: &[AsanaTimeEntry]) -> bool {
    let entered_on = entry.entered_on();
    let duration_minutes = entry.duration_minutes();
    existing
        .iter()
        .any(|remote| remote.entered_on == entered_on && remote.duration_minutes == duration_minutes)
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use rstest::rstest;

    use super::{existing_entries, is_duplicate};
    use crate::asana::{AsanaTimeEntry, MockAsanaRepository};
    use crate::cache::Memo;
    use crate::time_entry::TimeEntry;

    fn entry(start: &str, duration_seconds: i64) -> TimeEntry {
        TimeEntry {
            id: 1,
            task_id: 10,
            project_id: 100,
            user_id: None,
            start: start.to_string(),
            duration_seconds,
            description: String::new(),
            billable: false,
        }
    }

    fn remote(entered_on: &str, duration_minutes: i64) -> AsanaTimeEntry {
        AsanaTimeEntry {
            entered_on: entered_on.to_string(),
            duration_minutes,
        }
    }

    #[rstest]
    #[case::same_date_and_duration("2026-02-01T10:00:00Z", 3600, true)]
    #[case::rounded_duration_matches("2026-02-01T10:00:00Z", 3629, true)]
    #[case::different_duration("2026-02-01T10:00:00Z", 3660, false)]
    #[case::different_date("2026-02-02T10:00:00Z", 3600, false)]
    #[case::no_timezone_conversion("2026-02-01T23:30:00-05:00", 3600, true)]
    fn test_is_duplicate(#[case] start: &str, #[case] seconds: i64, #[case] expected: bool) {
        let existing = vec![remote("2026-01-31", 60), remote("2026-02-01", 60)];

        assert_eq!(is_duplicate(&entry(start, seconds), &existing), expected);
    }

    #[test]
    fn test_is_duplicate_no_existing() {
        assert!(!is_duplicate(&entry("2026-02-01T10:00:00Z", 3600), &[]));
    }

    #[tokio::test]
    async fn test_existing_entries_uses_cache() {
        let mut asana = MockAsanaRepository::new();
        asana
            .expect_read_time_tracking_entries()
            .times(1)
            .returning(|_| Ok(vec![remote("2026-02-01", 60)]));
        let mut cache = Memo::new();

        let first = existing_entries(&asana, &mut cache, "1200").await;
        let second = existing_entries(&asana, &mut cache, "1200").await;

        assert_eq!(first, vec![remote("2026-02-01", 60)]);
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_existing_entries_failure_returns_empty() {
        let mut asana = MockAsanaRepository::new();
        asana
            .expect_read_time_tracking_entries()
            .times(1)
            .returning(|_| Err(anyhow!("connection reset")));
        let mut cache = Memo::new();

        let entries = existing_entries(&asana, &mut cache, "1200").await;

        assert!(entries.is_empty());
        assert_eq!(cache.len(), 0);
    }
}
