//! Snapshot aggregation over the full check-in log.
//!
//! The orchestrator is stateless and idempotent: every call rebuilds the
//! entire snapshot mapping from the log in one O(n) pass, so a corrupt
//! snapshot index is self-healing on the next read.

use crate::checkin::{round1, CheckIn, Condition, GeoPoint};
use crate::identity::{self, ClinicKey};
use crate::reliability;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::{Duration, OffsetDateTime};

/// Check-ins newer than this count as "recent" for condition and reliability.
pub const RECENT_WINDOW: Duration = Duration::days(7);

/// The aggregated view of one clinic, fully rebuildable from the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicSnapshot {
    pub clinic_id: ClinicKey,
    pub clinic_name: String,
    pub location: Option<GeoPoint>,
    pub average_wait_time: Option<f64>,
    pub latest_wait_time: Option<f64>,
    pub current_condition: Condition,
    pub reliability_score: f64,
    pub total_reports: usize,
    pub recent_reports: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// Group all check-ins by resolved clinic key and compute one snapshot per
/// group.
pub fn aggregate(
    checkins: &[CheckIn],
    now: OffsetDateTime,
) -> BTreeMap<ClinicKey, ClinicSnapshot> {
    let mut groups: BTreeMap<ClinicKey, Vec<&CheckIn>> = BTreeMap::new();
    for checkin in checkins {
        let key = identity::resolve(&checkin.clinic_name, checkin.latitude(), checkin.longitude());
        groups.entry(key).or_default().push(checkin);
    }

    groups
        .into_iter()
        .map(|(key, group)| {
            let snapshot = snapshot_for_group(key.clone(), &group, now);
            (key, snapshot)
        })
        .collect()
}

fn snapshot_for_group(
    key: ClinicKey,
    group: &[&CheckIn],
    now: OffsetDateTime,
) -> ClinicSnapshot {
    debug_assert!(!group.is_empty());

    let recent: Vec<&CheckIn> = group
        .iter()
        .copied()
        .filter(|c| now - c.created_at <= RECENT_WINDOW)
        .collect();

    let wait_sum: f64 = group.iter().map(|c| c.wait_time_minutes).sum();
    let average_wait_time = if group.is_empty() {
        None
    } else {
        Some(round1(wait_sum / group.len() as f64))
    };

    // Most recent by creation time carries the display location and the
    // latest reported wait; the first contributing check-in supplies the
    // display name, and its location if the latest record has none.
    let latest = group.iter().copied().max_by_key(|c| c.created_at);
    let first = group.first().copied();

    let latest_wait_time = latest.map(|c| round1(c.wait_time_minutes));
    let location = latest
        .and_then(|c| c.location)
        .or_else(|| first.and_then(|c| c.location));

    ClinicSnapshot {
        clinic_id: key,
        clinic_name: first
            .map(|c| c.clinic_name.clone())
            .unwrap_or_else(|| "Unknown Clinic".to_string()),
        location,
        average_wait_time,
        latest_wait_time,
        current_condition: dominant_condition(&recent),
        reliability_score: round1(reliability::score(group.len(), recent.len())),
        total_reports: group.len(),
        recent_reports: recent.len(),
        last_updated: now,
    }
}

/// Mode of the recent conditions. Counting iterates `Condition::ALL` so the
/// first maximum encountered wins; `Moderate` when there are no recent
/// reports.
fn dominant_condition(recent: &[&CheckIn]) -> Condition {
    let mut counts = [0usize; Condition::ALL.len()];
    for checkin in recent {
        counts[checkin.condition.index()] += 1;
    }

    let mut best = Condition::Moderate;
    let mut best_count = 0;
    for condition in Condition::ALL {
        let count = counts[condition.index()];
        if count > best_count {
            best = condition;
            best_count = count;
        }
    }
    best
}

/// Placeholder clinics returned when no reports exist yet, so a fresh
/// deployment is never presented with an empty map.
pub fn seed_default_clinics(now: OffsetDateTime) -> BTreeMap<ClinicKey, ClinicSnapshot> {
    let templates = [
        (
            "Central Care Clinic",
            GeoPoint { latitude: 51.0453, longitude: -114.0573 },
            22.0,
            18.0,
            Condition::Moderate,
            40.0,
            8,
            3,
        ),
        (
            "Riverside Medical",
            GeoPoint { latitude: 51.0508, longitude: -114.0719 },
            35.0,
            42.0,
            Condition::Overloaded,
            55.0,
            15,
            5,
        ),
        (
            "Northside Health Centre",
            GeoPoint { latitude: 51.0805, longitude: -114.1065 },
            12.0,
            10.0,
            Condition::Smooth,
            30.0,
            6,
            2,
        ),
    ];

    templates
        .into_iter()
        .map(|(name, location, avg, latest, condition, reliability, total, recent)| {
            let key = identity::resolve(name, None, None);
            let snapshot = ClinicSnapshot {
                clinic_id: key.clone(),
                clinic_name: name.to_string(),
                location: Some(location),
                average_wait_time: Some(avg),
                latest_wait_time: Some(latest),
                current_condition: condition,
                reliability_score: reliability,
                total_reports: total,
                recent_reports: recent,
                last_updated: now,
            };
            (key, snapshot)
        })
        .collect()
}
