use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// テスト時に利用するモック時間を取得する。
#[cfg(test)]
pub mod mock_datetime {
    use std::cell::RefCell;

    use super::DateTime;
    use super::Utc;

    thread_local! {
        static MOCK_TIME: RefCell<Option<DateTime<Utc>>> = RefCell::new(None);
    }

    /// モック時間を取得する。
    pub fn now() -> DateTime<Utc> {
        MOCK_TIME.with(|cell| cell.borrow().as_ref().cloned().unwrap_or_else(Utc::now))
    }

    /// モック時間を設定する。
    pub fn set_mock_time(time: DateTime<Utc>) {
        MOCK_TIME.with(|cell| *cell.borrow_mut() = Some(time));
    }

    // 設定したモック時間をクリアする。
    pub fn clear_mock_time() {
        MOCK_TIME.with(|cell| *cell.borrow_mut() = None);
    }
}

#[cfg(test)]
pub use mock_datetime::now;

/// Localタイムゾーンでの今日の日付を返す。
pub fn today() -> NaiveDate {
    now().with_timezone(&Local).date_naive()
}

/// `YYYY-MM-DD`形式の日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Failed to parse date: {}", s))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
    use rstest::rstest;

    use super::{mock_datetime, parse_date, today};

    /// 何も設定しない場合は、現在時間が取得できることを確認する。
    ///
    ///  - 現在時刻での比較を行なっているため、ミリ秒単位まで比較するとテストが失敗する可能性があり、秒単位で比較している。
    #[test]
    fn test_now() {
        mock_datetime::clear_mock_time();

        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// モック時間を設定した時に、その日付が今日として扱われることを確認する。
    #[test]
    fn test_today_with_mock_time() {
        let time = DateTime::parse_from_rfc3339("2026-02-01T12:00:00+00:00")
            .unwrap()
            .to_utc();
        mock_datetime::set_mock_time(time);

        assert_eq!(today(), time.with_timezone(&Local).date_naive());
        mock_datetime::clear_mock_time();
    }

    #[rstest]
    #[case("2026-02-01", NaiveDate::from_ymd_opt(2026, 2, 1))]
    #[case(" 2026-12-31 ", NaiveDate::from_ymd_opt(2026, 12, 31))]
    #[case("2026-02-30", None)]
    #[case("02/01/2026", None)]
    fn test_parse_date(#[case] input: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_date(input).ok(), expected);
    }
}
