use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::{info, warn};

use crate::config::{ConfigError, CycleConfig};
use crate::history;
use crate::models::*;
use crate::prediction;
use crate::validation::{self, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid time of day {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },
}

/// Stateless entry point tying normalization, estimation, prediction and validation
/// to one configuration.
#[derive(Debug, Clone, Default)]
pub struct CycleEngine {
    config: CycleConfig,
}

impl CycleEngine {
    pub fn new(config: CycleConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn standard() -> Self {
        Self {
            config: CycleConfig::standard(),
        }
    }

    pub fn basic() -> Self {
        Self {
            config: CycleConfig::basic(),
        }
    }

    pub fn from_json_config(json: &str) -> Result<Self, EngineError> {
        Ok(Self {
            config: CycleConfig::from_json(json)?,
        })
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn load_history<I>(&self, records: I) -> HistorySequence
    where
        I: IntoIterator<Item = RawPeriodRecord>,
    {
        history::normalize(records, self.config.granularity)
    }

    /// Load a JSON array of raw records as produced by the record source.
    pub fn load_history_json(&self, json: &str) -> Result<HistorySequence, EngineError> {
        let records: Vec<RawPeriodRecord> = serde_json::from_str(json)?;
        Ok(self.load_history(records))
    }

    pub fn estimate(&self, history: &HistorySequence) -> CycleEstimate {
        prediction::estimate_cycle(history, &self.config)
    }

    /// `None` until the history holds enough records.
    pub fn predict(&self, history: &HistorySequence) -> Option<PredictionResult> {
        prediction::predict_history(history, &self.config)
    }

    pub fn validate(&self, candidate: NaiveDateTime, history: &HistorySequence) -> ValidationResult {
        validation::validate_candidate(
            candidate,
            history.latest().map(|r| r.timestamp),
            self.config.min_cycle_days,
            self.config.max_cycle_days,
        )
    }

    pub fn build_timestamp(
        &self,
        date: NaiveDate,
        hour: u32,
        minute: u32,
    ) -> Result<NaiveDateTime, EngineError> {
        if hour > 23 || minute > 59 {
            return Err(EngineError::InvalidTime { hour, minute });
        }
        history::compose_timestamp(date, hour, minute, self.config.granularity)
            .ok_or(EngineError::InvalidTime { hour, minute })
    }

    /// Run the checks that precede a write to the record sink.
    ///
    /// Future dates and a full history are always refused. An implausible cycle
    /// length is refused only when `require_valid_cycle` is set; otherwise the
    /// returned validation carries the warning.
    pub fn prepare_record(
        &self,
        owner_id: &str,
        candidate: NaiveDateTime,
        now: NaiveDateTime,
        history: &HistorySequence,
    ) -> Result<PreparedRecord, EngineError> {
        let candidate =
            self.build_timestamp(candidate.date(), candidate.hour(), candidate.minute())?;

        validation::ensure_not_future(candidate, now)?;
        validation::ensure_capacity(history.len(), self.config.max_records)?;

        let validation = self.validate(candidate, history);
        if self.config.require_valid_cycle && !validation.is_valid {
            if let Some(days_between) = validation.days_between {
                warn!(owner_id, days_between, "refusing implausible period date");
                return Err(ValidationError::ImplausibleCycle {
                    days_between,
                    min: self.config.min_cycle_days,
                    max: self.config.max_cycle_days,
                }
                .into());
            }
        }

        info!(owner_id, date = %candidate, valid = validation.is_valid, "prepared period record");

        Ok(PreparedRecord {
            record: NewPeriodRecord {
                owner_id: owner_id.to_string(),
                date: candidate,
                hour: candidate.hour(),
                minute: candidate.minute(),
            },
            validation,
        })
    }

    pub fn overview(&self, history: &HistorySequence, now: NaiveDateTime) -> CycleOverview {
        let records = history.records();
        let recent = history
            .recent(self.config.recent_records)
            .iter()
            .enumerate()
            .map(|(i, record)| RecordSummary {
                record: record.clone(),
                days_ago: (now.date() - record.timestamp.date()).num_days(),
                hours_since_previous: records
                    .get(i + 1)
                    .map(|prev| (record.timestamp - prev.timestamp).num_hours().abs()),
            })
            .collect();

        CycleOverview {
            generated_at: now,
            recent,
            estimate: self.estimate(history),
            prediction: self.predict(history),
            stats: prediction::history_stats(history),
        }
    }

    pub fn export_overview(
        &self,
        history: &HistorySequence,
        now: NaiveDateTime,
    ) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(&self.overview(history, now))?)
    }
}
