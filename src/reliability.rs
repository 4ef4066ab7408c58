//! Reliability scoring from report volume and recency.
//!
//! The score trends high with a handful of reports (log growth) but never
//! pegs at 100, and clinics with no recent activity cannot claim the same
//! confidence as actively-reported ones.

/// Baseline returned when a clinic has no reports at all.
pub const EMPTY_BASELINE: f64 = 55.0;
/// Upper bound on any reliability score.
pub const MAX_SCORE: f64 = 97.0;

/// Convert report volume and 7-day recency into a bounded confidence score.
pub fn score(total_reports: usize, recent_reports: usize) -> f64 {
    if total_reports == 0 {
        return EMPTY_BASELINE;
    }

    let base = 55.0 + ((1.0 + total_reports as f64).ln() * 12.0).min(25.0);
    let recency_boost = (recent_reports as f64 * 4.0).min(20.0);
    let activity_bonus = if recent_reports > 0 { 5.0 } else { 0.0 };

    (base + recency_boost + activity_bonus).min(MAX_SCORE)
}
