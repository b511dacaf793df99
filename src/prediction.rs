use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::config::CycleConfig;
use crate::models::{CycleEstimate, DateWindow, HistoryStats, HistorySequence, PredictionResult};

/// Whole days between adjacent records, truncated toward zero.
fn gaps(history: &HistorySequence) -> Vec<i64> {
    history
        .records()
        .windows(2)
        .map(|w| (w[0].timestamp - w[1].timestamp).num_days().abs())
        .collect()
}

/// Reduce the history to one representative cycle length.
/// Falls back to the configured default when no gap survives filtering.
pub fn estimate_cycle(history: &HistorySequence, config: &CycleConfig) -> CycleEstimate {
    let all = gaps(history);
    let total = all.len();

    let sample_gaps: Vec<i64> = match config.outlier_threshold_days {
        Some(threshold) => all.into_iter().filter(|&g| g > threshold).collect(),
        None => all,
    };
    let discarded_gaps = total - sample_gaps.len();

    let Some(mean) = mean_gap(&sample_gaps) else {
        debug!(total, discarded_gaps, "no usable cycle gaps, using default length");
        return CycleEstimate {
            average_cycle_days: config.default_cycle_days,
            sample_gaps,
            discarded_gaps,
            defaulted: true,
        };
    };

    let mut average = mean.round() as i64;
    if config.clamp_average {
        average = average.max(config.min_cycle_days).min(config.max_cycle_days);
    }

    debug!(
        samples = sample_gaps.len(),
        discarded_gaps,
        average_cycle_days = average,
        "estimated cycle length"
    );

    CycleEstimate {
        average_cycle_days: average,
        sample_gaps,
        discarded_gaps,
        defaulted: false,
    }
}

/// Move `ts` by whole days, pinning to the representable range instead of overflowing.
fn shift_days(ts: NaiveDateTime, days: i64) -> NaiveDateTime {
    Duration::try_days(days)
        .and_then(|delta| ts.checked_add_signed(delta))
        .unwrap_or(if days < 0 {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        })
}

/// Derive ovulation, risk and safe windows, and the next period.
/// Offsets are whole days, so the time of day of `last_period` carries through.
/// Offsets beyond the calendar's range saturate at its ends.
pub fn predict(
    last_period: NaiveDateTime,
    average_cycle_days: i64,
    config: &CycleConfig,
) -> PredictionResult {
    let ovulation = shift_days(
        last_period,
        average_cycle_days.saturating_sub(config.luteal_phase_days),
    );
    let risk_start = shift_days(ovulation, config.risk_window_lead_days.saturating_neg());
    let risk_end = shift_days(ovulation, config.risk_window_trail_days);

    let safe_one = DateWindow::new(
        shift_days(last_period, config.safe_window_offset_days),
        shift_days(risk_start, -1),
    );
    let safe_two = DateWindow::new(
        shift_days(risk_end, 1),
        shift_days(last_period, average_cycle_days.saturating_sub(1)),
    );

    PredictionResult {
        last_period,
        average_cycle_days,
        ovulation,
        risk_window: DateWindow::new(risk_start, risk_end),
        safe_windows: [safe_one, safe_two],
        next_period: shift_days(last_period, average_cycle_days),
    }
}

/// Predict from a history. Requires `min_records_for_prediction` records.
pub fn predict_history(history: &HistorySequence, config: &CycleConfig) -> Option<PredictionResult> {
    if history.len() < config.min_records_for_prediction {
        return None;
    }
    let last = history.latest()?;
    let estimate = estimate_cycle(history, config);
    Some(predict(last.timestamp, estimate.average_cycle_days, config))
}

/// Summary of raw gaps, without outlier filtering or clamping.
pub fn history_stats(history: &HistorySequence) -> HistoryStats {
    let gaps = gaps(history);
    let first_period = history.records().last().map(|r| r.timestamp);
    let last_period = history.latest().map(|r| r.timestamp);

    HistoryStats {
        total_records: history.len(),
        first_period,
        last_period,
        tracked_days: first_period
            .zip(last_period)
            .map(|(first, last)| (last - first).num_days()),
        shortest_gap_days: gaps.iter().copied().min(),
        longest_gap_days: gaps.iter().copied().max(),
        mean_gap_days: mean_gap(&gaps),
        gap_std_dev: gap_std_dev(&gaps),
    }
}

/// `None` for an empty slice.
fn mean_gap(gaps: &[i64]) -> Option<f64> {
    if gaps.is_empty() {
        return None;
    }
    Some(gaps.iter().map(|&g| g as f64).sum::<f64>() / gaps.len() as f64)
}

/// Sample standard deviation (n - 1). Needs at least two gaps.
fn gap_std_dev(gaps: &[i64]) -> Option<f64> {
    if gaps.len() < 2 {
        return None;
    }
    let avg = mean_gap(gaps)?;
    let squares: f64 = gaps.iter().map(|&g| (g as f64 - avg).powi(2)).sum();
    Some((squares / (gaps.len() - 1) as f64).sqrt())
}
