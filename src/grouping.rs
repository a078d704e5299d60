use std::collections::HashMap;

use crate::time_entry::TimeEntry;

/// 同じタスクに紐づくタイムエントリーのまとまり。
#[derive(Clone, Debug, PartialEq)]
pub struct TaskGroup {
    pub task_id: u64,
    pub project_id: u64,
    pub entries: Vec<TimeEntry>,
}

/// タイムエントリーをタスクごとにまとめる。
///
/// グループは各タスクが最初に現れた順に並び、グループ内のエントリーも受け取った順を保つ。
/// タスクの問い合わせ回数をエントリー数ではなくタスク数に抑えるために使う。
pub fn group_by_task(entries: Vec<TimeEntry>) -> Vec<TaskGroup> {
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut groups: Vec<TaskGroup> = Vec::new();

    for entry in entries {
        match index.get(&entry.task_id) {
            Some(&position) => groups[position].entries.push(entry),
            None => {
                index.insert(entry.task_id, groups.len());
                groups.push(TaskGroup {
                    task_id: entry.task_id,
                    project_id: entry.project_id,
                    entries: vec![entry],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::group_by_task;
    use crate::time_entry::TimeEntry;

    fn entry(id: u64, task_id: u64) -> TimeEntry {
        TimeEntry {
            id,
            task_id,
            project_id: task_id * 10,
            user_id: None,
            start: "2026-02-01T10:00:00Z".to_string(),
            duration_seconds: 60,
            description: String::new(),
            billable: false,
        }
    }

    #[rstest]
    #[case::empty(vec![], vec![])]
    #[case::single_task(vec![(1, 10), (2, 10)], vec![(10, vec![1, 2])])]
    #[case::interleaved(
        vec![(1, 10), (2, 20), (3, 10), (4, 30), (5, 20)],
        vec![(10, vec![1, 3]), (20, vec![2, 5]), (30, vec![4])],
    )]
    fn test_group_by_task(
        #[case] input: Vec<(u64, u64)>,
        #[case] expected: Vec<(u64, Vec<u64>)>,
    ) {
        let entries = input.iter().map(|(id, task)| entry(*id, *task)).collect();

        let groups = group_by_task(entries);

        let actual: Vec<(u64, Vec<u64>)> = groups
            .iter()
            .map(|group| {
                (
                    group.task_id,
                    group.entries.iter().map(|entry| entry.id).collect(),
                )
            })
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_group_keeps_project() {
        let groups = group_by_task(vec![entry(1, 10)]);

        assert_eq!(groups[0].project_id, 100);
    }
}
