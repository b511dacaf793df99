use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A period record as delivered by the record source, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RawPeriodRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub hour: Option<i64>,
    #[serde(default)]
    pub minute: Option<i64>,
}

/// One observed period start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeriodRecord {
    /// Storage key owned by the record source.
    pub id: String,
    pub timestamp: NaiveDateTime,
}

impl PeriodRecord {
    pub fn new(id: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            timestamp,
        }
    }
}

/// Period records ordered most recent first. Only constructible through [`HistorySequence::new`].
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct HistorySequence {
    records: Vec<PeriodRecord>,
}

impl HistorySequence {
    /// Build a history from records in any order.
    /// The sort is stable, so records sharing a timestamp keep their input order.
    pub fn new(mut records: Vec<PeriodRecord>) -> Self {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self { records }
    }

    pub fn records(&self) -> &[PeriodRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PeriodRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&PeriodRecord> {
        self.records.first()
    }

    /// The `n` most recent records.
    pub fn recent(&self, n: usize) -> &[PeriodRecord] {
        &self.records[..n.min(self.records.len())]
    }

    pub fn into_records(self) -> Vec<PeriodRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a HistorySequence {
    type Item = &'a PeriodRecord;
    type IntoIter = std::slice::Iter<'a, PeriodRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleEstimate {
    pub average_cycle_days: i64,
    /// Gaps (in whole days) that contributed to the average.
    pub sample_gaps: Vec<i64>,
    /// Gaps dropped by the outlier filter.
    pub discarded_gaps: usize,
    /// True when no usable gap existed and the default length was used.
    pub defaulted: bool,
}

/// Inclusive range of timestamps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn length_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictionResult {
    pub last_period: NaiveDateTime,
    pub average_cycle_days: i64,
    pub ovulation: NaiveDateTime,
    pub risk_window: DateWindow,
    pub safe_windows: [DateWindow; 2],
    pub next_period: NaiveDateTime,
}

impl PredictionResult {
    /// Time from the last period to the predicted next one.
    pub fn cycle_span(&self) -> Duration {
        self.next_period - self.last_period
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CycleVerdict {
    FirstRecord,
    WithinRange,
    TooShort,
    TooLong,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub days_between: Option<i64>,
    pub verdict: CycleVerdict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryStats {
    pub total_records: usize,
    /// Oldest record in the history.
    pub first_period: Option<NaiveDateTime>,
    pub last_period: Option<NaiveDateTime>,
    /// Whole days from the oldest to the newest record.
    pub tracked_days: Option<i64>,
    pub shortest_gap_days: Option<i64>,
    pub longest_gap_days: Option<i64>,
    pub mean_gap_days: Option<f64>,
    pub gap_std_dev: Option<f64>,
}

/// A history row as shown in record lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordSummary {
    pub record: PeriodRecord,
    /// Calendar days between the record and "now".
    pub days_ago: i64,
    /// Whole hours back to the next older record, if any.
    pub hours_since_previous: Option<i64>,
}

/// Snapshot handed to a rendering collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleOverview {
    pub generated_at: NaiveDateTime,
    pub recent: Vec<RecordSummary>,
    pub estimate: CycleEstimate,
    pub prediction: Option<PredictionResult>,
    pub stats: HistoryStats,
}

/// Payload for the record sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPeriodRecord {
    pub owner_id: String,
    pub date: NaiveDateTime,
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreparedRecord {
    pub record: NewPeriodRecord,
    pub validation: ValidationResult,
}
