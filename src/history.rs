use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use tracing::warn;

use crate::config::TimeGranularity;
use crate::models::{HistorySequence, PeriodRecord, RawPeriodRecord};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum DropReason {
    #[error("missing date")]
    MissingDate,
    #[error("unparseable date {0:?}")]
    UnparseableDate(String),
    #[error("hour {0} out of range")]
    HourOutOfRange(i64),
    #[error("minute {0} out of range")]
    MinuteOutOfRange(i64),
    #[error("invalid time of day {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },
}

/// Turn raw store records into a history ordered most recent first.
/// Corrupt records are skipped.
pub fn normalize<I>(records: I, granularity: TimeGranularity) -> HistorySequence
where
    I: IntoIterator<Item = RawPeriodRecord>,
{
    let parsed = records
        .into_iter()
        .filter_map(|raw| match normalize_record(&raw, granularity) {
            Ok(record) => Some(record),
            Err(reason) => {
                warn!(id = %raw.id, %reason, "dropping period record");
                None
            }
        })
        .collect();

    HistorySequence::new(parsed)
}

fn normalize_record(
    raw: &RawPeriodRecord,
    granularity: TimeGranularity,
) -> Result<PeriodRecord, DropReason> {
    let date_str = raw.date.as_deref().ok_or(DropReason::MissingDate)?;
    let parsed =
        parse_date(date_str).ok_or_else(|| DropReason::UnparseableDate(date_str.to_string()))?;

    let hour = match raw.hour {
        Some(h) if (0..=23).contains(&h) => h as u32,
        Some(h) => return Err(DropReason::HourOutOfRange(h)),
        None => parsed.hour(),
    };
    let minute = match raw.minute {
        Some(m) if !(0..=59).contains(&m) => return Err(DropReason::MinuteOutOfRange(m)),
        Some(m) => m as u32,
        None => parsed.minute(),
    };

    let timestamp = compose_timestamp(parsed.date(), hour, minute, granularity)
        .ok_or(DropReason::InvalidTime { hour, minute })?;

    Ok(PeriodRecord::new(raw.id.clone(), timestamp))
}

/// Build a record timestamp at the given precision. `None` for an invalid time of day.
pub fn compose_timestamp(
    date: NaiveDate,
    hour: u32,
    minute: u32,
    granularity: TimeGranularity,
) -> Option<NaiveDateTime> {
    let minute = match granularity {
        TimeGranularity::Hour => 0,
        TimeGranularity::Minute => minute,
    };
    date.and_hms_opt(hour, minute, 0)
}

/// Accepts RFC 3339 (keeping the wall clock of its offset), ISO date-times, and plain dates.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(id: &str, date: Option<&str>, hour: Option<i64>, minute: Option<i64>) -> RawPeriodRecord {
        RawPeriodRecord {
            id: id.into(),
            owner_id: "user-1".into(),
            date: date.map(String::from),
            hour,
            minute,
        }
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn sorts_most_recent_first() {
        let history = normalize(
            vec![
                raw("a", Some("2024-01-03"), None, None),
                raw("b", Some("2024-03-01"), None, None),
                raw("c", Some("2024-02-01"), None, None),
            ],
            TimeGranularity::Hour,
        );
        let ids: Vec<&str> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn drops_missing_and_corrupt_dates() {
        let history = normalize(
            vec![
                raw("ok", Some("2024-03-01"), Some(9), None),
                raw("none", None, Some(9), None),
                raw("garbage", Some("yesterday-ish"), None, None),
                raw("bad-hour", Some("2024-02-01"), Some(24), None),
                raw("bad-minute", Some("2024-02-01"), Some(3), Some(75)),
            ],
            TimeGranularity::Minute,
        );
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().id, "ok");
    }

    #[test]
    fn drop_reasons_describe_the_record() {
        let reason = normalize_record(&raw("a", None, None, None), TimeGranularity::Hour).unwrap_err();
        assert_eq!(reason.to_string(), "missing date");

        let reason =
            normalize_record(&raw("a", Some("2024-03-01"), Some(24), None), TimeGranularity::Hour)
                .unwrap_err();
        assert_eq!(reason, DropReason::HourOutOfRange(24));
        assert_eq!(reason.to_string(), "hour 24 out of range");

        let reason = normalize_record(&raw("a", Some("soon"), None, None), TimeGranularity::Hour)
            .unwrap_err();
        assert_eq!(reason.to_string(), "unparseable date \"soon\"");
    }

    #[test]
    fn invalid_time_of_day_has_its_own_reason() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(compose_timestamp(date, 24, 0, TimeGranularity::Minute), None);
        assert_eq!(compose_timestamp(date, 9, 60, TimeGranularity::Minute), None);
        // minutes are ignored at hour precision
        assert!(compose_timestamp(date, 9, 60, TimeGranularity::Hour).is_some());

        let reason = DropReason::InvalidTime { hour: 9, minute: 60 };
        assert_eq!(reason.to_string(), "invalid time of day 09:60");
    }

    #[test]
    fn hour_defaults_to_zero() {
        let history = normalize(vec![raw("a", Some("2024-03-01"), None, None)], TimeGranularity::Hour);
        assert_eq!(history.latest().unwrap().timestamp, ts("2024-03-01 00:00"));
    }

    #[test]
    fn explicit_hour_overrides_parsed_time() {
        let history = normalize(
            vec![raw("a", Some("2024-03-01T06:30:00"), Some(14), None)],
            TimeGranularity::Minute,
        );
        assert_eq!(history.latest().unwrap().timestamp, ts("2024-03-01 14:30"));
    }

    #[test]
    fn hour_granularity_discards_minutes() {
        let history = normalize(
            vec![raw("a", Some("2024-03-01"), Some(8), Some(45))],
            TimeGranularity::Hour,
        );
        assert_eq!(history.latest().unwrap().timestamp, ts("2024-03-01 08:00"));

        let history = normalize(
            vec![raw("a", Some("2024-03-01"), Some(8), Some(45))],
            TimeGranularity::Minute,
        );
        assert_eq!(history.latest().unwrap().timestamp, ts("2024-03-01 08:45"));
    }

    #[test]
    fn seconds_are_truncated() {
        let history = normalize(
            vec![raw("a", Some("2024-03-01 08:45:59"), None, None)],
            TimeGranularity::Minute,
        );
        assert_eq!(history.latest().unwrap().timestamp, ts("2024-03-01 08:45"));
    }

    #[test]
    fn rfc3339_keeps_local_wall_clock() {
        let parsed = parse_date("2024-03-01T23:15:00+03:00").unwrap();
        assert_eq!(parsed, ts("2024-03-01 23:15"));
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let history = normalize(
            vec![
                raw("first", Some("2024-03-01"), Some(10), None),
                raw("second", Some("2024-03-01"), Some(10), None),
            ],
            TimeGranularity::Hour,
        );
        let ids: Vec<&str> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
    }

    proptest! {
        #[test]
        fn normalizing_sorted_history_is_noop(
            offsets in prop::collection::vec(0i64..5000, 0..20)
        ) {
            let base = ts("2020-01-01 00:00");
            let raws: Vec<RawPeriodRecord> = offsets
                .iter()
                .enumerate()
                .map(|(i, days)| {
                    let t = base + chrono::Duration::hours(*days * 7);
                    RawPeriodRecord {
                        id: i.to_string(),
                        date: Some(t.format("%Y-%m-%dT%H:%M:%S").to_string()),
                        ..Default::default()
                    }
                })
                .collect();

            let once = normalize(raws, TimeGranularity::Minute);
            let again = HistorySequence::new(once.clone().into_records());
            prop_assert_eq!(&once, &again);

            let pairs: Vec<_> = once.records().windows(2).collect();
            for w in pairs {
                prop_assert!(w[0].timestamp >= w[1].timestamp);
            }
        }
    }
}
