//! Per-clinic running statistics backing the forecaster.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Running sum and count for one bucket. The average is always derived as
/// `total / count`, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketEntry {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: u64,
}

impl BucketEntry {
    pub fn add(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total / self.count as f64)
        }
    }
}

/// Running totals for one clinic: overall, per hour of day, per weekday, and
/// a bounded window of the most recent observed wait times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicStats {
    #[serde(default)]
    pub overall: BucketEntry,
    #[serde(default)]
    pub hourly: BTreeMap<u8, BucketEntry>,
    #[serde(default)]
    pub weekday: BTreeMap<u8, BucketEntry>,
    #[serde(default)]
    pub recent: VecDeque<f64>,
}

impl ClinicStats {
    /// Record one observed wait time. `history_cap` bounds the recent window;
    /// the oldest entry is evicted first.
    pub fn observe(&mut self, hour: u8, weekday: u8, wait_minutes: f64, history_cap: usize) {
        self.overall.add(wait_minutes);
        self.hourly.entry(hour % 24).or_default().add(wait_minutes);
        self.weekday.entry(weekday % 7).or_default().add(wait_minutes);

        self.recent.push_back(wait_minutes);
        while self.recent.len() > history_cap {
            self.recent.pop_front();
        }
    }

    /// Mean of all populated bucket averages, or `None` when fewer than
    /// `min_buckets` are populated. Guards against overfitting to a single
    /// observed hour or weekday.
    pub fn bucket_mean(buckets: &BTreeMap<u8, BucketEntry>, min_buckets: usize) -> Option<f64> {
        let averages: Vec<f64> = buckets.values().filter_map(BucketEntry::average).collect();
        if averages.len() < min_buckets {
            return None;
        }
        Some(averages.iter().sum::<f64>() / averages.len() as f64)
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let n = coerce_f64(&value);
    if n.is_finite() && n > 0.0 {
        Ok(n as u64)
    } else {
        Ok(0)
    }
}

/// Coerce legacy or malformed numeric fields to a number, defaulting to zero.
fn coerce_f64(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_updates_all_buckets() {
        let mut stats = ClinicStats::default();
        stats.observe(9, 2, 25.0, 20);
        stats.observe(9, 3, 35.0, 20);

        assert_eq!(stats.overall.average(), Some(30.0));
        assert_eq!(stats.hourly.get(&9).and_then(BucketEntry::average), Some(30.0));
        assert_eq!(stats.weekday.get(&2).and_then(BucketEntry::average), Some(25.0));
        assert_eq!(stats.recent, VecDeque::from([25.0, 35.0]));
    }

    #[test]
    fn hour_and_weekday_wrap() {
        let mut stats = ClinicStats::default();
        stats.observe(25, 8, 10.0, 20);

        assert!(stats.hourly.contains_key(&1));
        assert!(stats.weekday.contains_key(&1));
    }

    #[test]
    fn recent_window_evicts_oldest_first() {
        let mut stats = ClinicStats::default();
        for i in 0..5 {
            stats.observe(9, 2, i as f64, 3);
        }

        assert_eq!(stats.recent, VecDeque::from([2.0, 3.0, 4.0]));
        assert_eq!(stats.overall.count, 5);
    }

    #[test]
    fn bucket_mean_requires_minimum_population() {
        let mut stats = ClinicStats::default();
        stats.observe(9, 2, 10.0, 20);
        assert_eq!(ClinicStats::bucket_mean(&stats.hourly, 2), None);

        stats.observe(14, 2, 30.0, 20);
        assert_eq!(ClinicStats::bucket_mean(&stats.hourly, 2), Some(20.0));
    }

    #[test]
    fn counter_average_matches_total_over_count() {
        let mut entry = BucketEntry::default();
        assert_eq!(entry.average(), None);
        entry.add(12.5);
        entry.add(7.5);
        assert_eq!(entry.average(), Some(entry.total / entry.count as f64));
    }

    #[test]
    fn legacy_fields_coerce_to_zero() -> Result<(), Box<dyn std::error::Error>> {
        let stats: ClinicStats = serde_json::from_str(
            r#"{
                "overall": {"total": "not a number", "count": null},
                "hourly": {"9": {"total": "42.5", "count": 2.0}},
                "weekday": {}
            }"#,
        )?;

        assert_eq!(stats.overall, BucketEntry { total: 0.0, count: 0 });
        assert_eq!(
            stats.hourly.get(&9),
            Some(&BucketEntry { total: 42.5, count: 2 })
        );
        assert!(stats.recent.is_empty());
        Ok(())
    }

    #[test]
    fn stats_round_trip_preserves_buckets_and_window() -> Result<(), Box<dyn std::error::Error>> {
        let mut stats = ClinicStats::default();
        for (i, wait) in [10.0, 20.0, 30.0, 40.0].iter().enumerate() {
            stats.observe(i as u8, i as u8, *wait, 3);
        }

        let json = serde_json::to_string(&stats)?;
        let back: ClinicStats = serde_json::from_str(&json)?;

        assert_eq!(back, stats);
        assert_eq!(back.recent, VecDeque::from([20.0, 30.0, 40.0]));
        Ok(())
    }
}
