/// Asanaへの同期対象とする連携先。
pub const ASANA_PROVIDER: &str = "asana";

/// Togglのタスクが外部のタスク管理サービスと連携しているかを表す。
#[derive(Clone, Debug, PartialEq)]
pub struct LinkedTask {
    pub integration_provider: Option<String>,
    pub integration_ext_id: Option<String>,
    pub name: String,
}

impl LinkedTask {
    /// Asanaと連携している場合は、Asanaのタスクgidを返す。
    ///
    /// 連携先がAsana以外、または外部IDが空の場合は同期対象外として`None`を返す。
    pub fn asana_task_gid(&self) -> Option<&str> {
        let provider = self.integration_provider.as_deref()?;
        if !provider.eq_ignore_ascii_case(ASANA_PROVIDER) {
            return None;
        }
        self.integration_ext_id
            .as_deref()
            .filter(|gid| !gid.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::LinkedTask;

    #[rstest]
    #[case::asana(Some("asana"), Some("1200"), Some("1200"))]
    #[case::asana_upper_case(Some("Asana"), Some("1200"), Some("1200"))]
    #[case::other_provider(Some("jira"), Some("PRJ-1"), None)]
    #[case::no_provider(None, None, None)]
    #[case::asana_without_gid(Some("asana"), None, None)]
    #[case::asana_blank_gid(Some("asana"), Some(" "), None)]
    fn test_asana_task_gid(
        #[case] provider: Option<&str>,
        #[case] ext_id: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let task = LinkedTask {
            integration_provider: provider.map(str::to_string),
            integration_ext_id: ext_id.map(str::to_string),
            name: "task".to_string(),
        };

        assert_eq!(task.asana_task_gid(), expected);
    }
}
