use anyhow::{bail, Context, Result};

/// Togglの各APIから取得したレスポンスを正規化したタイムエントリー。
#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntry {
    pub id: u64,
    pub task_id: u64,
    pub project_id: u64,
    pub user_id: Option<u64>,
    pub start: String,
    pub duration_seconds: i64,
    pub description: String,
    pub billable: bool,
}

impl TimeEntry {
    /// Asanaに登録する分単位の時間を返す。
    pub fn duration_minutes(&self) -> i64 {
        round_minutes(self.duration_seconds)
    }

    /// 開始日時の日付部分(`YYYY-MM-DD`)を返す。
    ///
    /// タイムゾーンの変換は行わず、`T`より前の文字列をそのまま利用する。
    pub fn entered_on(&self) -> &str {
        self.start.split('T').next().unwrap_or(&self.start)
    }
}

/// エンドポイントごとに異なるレスポンス形式を受け止めるための、正規化前のタイムエントリー。
///
/// 時間は集計系のAPIでは`seconds`、ユーザー単位のAPIでは`duration`で返される。
#[derive(Clone, Debug, Default)]
pub struct RawTimeEntry {
    pub id: u64,
    pub task_id: Option<u64>,
    pub project_id: Option<u64>,
    pub user_id: Option<u64>,
    pub start: String,
    pub seconds: Option<i64>,
    pub duration: Option<i64>,
    pub description: Option<String>,
    pub billable: Option<bool>,
}

impl RawTimeEntry {
    /// 正規化したタイムエントリーを返す。
    ///
    /// タスクに紐づかないエントリーは同期できないため`None`を返す。
    /// 時間が取得できない、または計測中(負の値)のエントリーはエラーとする。
    pub fn normalize(self) -> Result<Option<TimeEntry>> {
        let duration_seconds = match (self.seconds, self.duration) {
            (Some(seconds), _) => seconds,
            (None, Some(duration)) => duration,
            (None, None) => bail!("Time entry {} has neither seconds nor duration", self.id),
        };
        if duration_seconds < 0 {
            bail!("Time entry {} is still running", self.id);
        }

        let task_id = match self.task_id {
            Some(task_id) => task_id,
            None => return Ok(None),
        };
        let project_id = self
            .project_id
            .with_context(|| format!("Time entry {} has a task but no project", self.id))?;

        Ok(Some(TimeEntry {
            id: self.id,
            task_id,
            project_id,
            user_id: self.user_id,
            start: self.start,
            duration_seconds,
            description: self.description.unwrap_or_default(),
            billable: self.billable.unwrap_or_default(),
        }))
    }
}

/// 秒を分に丸める。
///
/// ちょうど30秒の端数は偶数側に丸める。
pub fn round_minutes(seconds: i64) -> i64 {
    let minutes = seconds.div_euclid(60);
    let remainder = seconds.rem_euclid(60);
    match (remainder * 2).cmp(&60) {
        std::cmp::Ordering::Less => minutes,
        std::cmp::Ordering::Greater => minutes + 1,
        std::cmp::Ordering::Equal => minutes + minutes.rem_euclid(2),
    }
}
