use serde::{Deserialize, Serialize};

/// Upper bound for every day-valued setting.
pub const MAX_CONFIG_DAYS: i64 = 366;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Precision kept on record timestamps. Seconds are always dropped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeGranularity {
    Hour,
    Minute,
}

/// Cycle parameters. Both historical app behaviors are presets of this struct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CycleConfig {
    pub min_cycle_days: i64,
    pub max_cycle_days: i64,
    pub default_cycle_days: i64,
    /// Clamp the estimated average into `[min_cycle_days, max_cycle_days]`.
    pub clamp_average: bool,
    /// Gaps of this many days or fewer are treated as entry errors.
    pub outlier_threshold_days: Option<i64>,
    pub luteal_phase_days: i64,
    pub risk_window_lead_days: i64,
    pub risk_window_trail_days: i64,
    pub safe_window_offset_days: i64,
    pub min_records_for_prediction: usize,
    pub max_records: usize,
    pub recent_records: usize,
    pub granularity: TimeGranularity,
    /// Refuse implausible new records instead of only flagging them.
    pub require_valid_cycle: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl CycleConfig {
    /// Filtered, clamped estimate with a six day risk window.
    pub fn standard() -> Self {
        Self {
            min_cycle_days: 20,
            max_cycle_days: 35,
            default_cycle_days: 28,
            clamp_average: true,
            outlier_threshold_days: Some(10),
            luteal_phase_days: 14,
            risk_window_lead_days: 5,
            risk_window_trail_days: 1,
            safe_window_offset_days: 5,
            min_records_for_prediction: 2,
            max_records: 120,
            recent_records: 3,
            granularity: TimeGranularity::Hour,
            require_valid_cycle: true,
        }
    }

    /// Unfiltered, unclamped estimate with a two day risk window and minute precision.
    pub fn basic() -> Self {
        Self {
            clamp_average: false,
            outlier_threshold_days: None,
            risk_window_lead_days: 1,
            max_records: 9,
            granularity: TimeGranularity::Minute,
            require_valid_cycle: false,
            ..Self::standard()
        }
    }

    /// Parse a JSON document; missing fields fall back to [`CycleConfig::standard`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CycleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_cycle_days < 1 {
            return Err(ConfigError::Invalid(format!(
                "min_cycle_days must be positive, got {}",
                self.min_cycle_days
            )));
        }
        if self.min_cycle_days > self.max_cycle_days {
            return Err(ConfigError::Invalid(format!(
                "min_cycle_days ({}) exceeds max_cycle_days ({})",
                self.min_cycle_days, self.max_cycle_days
            )));
        }
        if self.default_cycle_days < 1 {
            return Err(ConfigError::Invalid(format!(
                "default_cycle_days must be positive, got {}",
                self.default_cycle_days
            )));
        }
        if self.clamp_average
            && !(self.min_cycle_days..=self.max_cycle_days).contains(&self.default_cycle_days)
        {
            return Err(ConfigError::Invalid(format!(
                "default_cycle_days ({}) lies outside {}..={}",
                self.default_cycle_days, self.min_cycle_days, self.max_cycle_days
            )));
        }
        for (name, value) in [
            ("max_cycle_days", self.max_cycle_days),
            ("default_cycle_days", self.default_cycle_days),
            ("outlier_threshold_days", self.outlier_threshold_days.unwrap_or(0)),
            ("luteal_phase_days", self.luteal_phase_days),
            ("risk_window_lead_days", self.risk_window_lead_days),
            ("risk_window_trail_days", self.risk_window_trail_days),
            ("safe_window_offset_days", self.safe_window_offset_days),
        ] {
            if !(0..=MAX_CONFIG_DAYS).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must lie in 0..={MAX_CONFIG_DAYS}, got {value}"
                )));
            }
        }
        if self.min_records_for_prediction < 1 {
            return Err(ConfigError::Invalid(
                "min_records_for_prediction must be at least 1".into(),
            ));
        }
        if self.max_records == 0 {
            return Err(ConfigError::Invalid("max_records must be at least 1".into()));
        }
        Ok(())
    }
}
