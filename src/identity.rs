//! Clinic identity resolution.
//!
//! Check-ins carry free-text clinic names and imprecise coordinates, so the
//! grouping key is derived: the normalized name plus a coarse spatial bucket.
//! Two clinics sharing a name more than one 0.1° cell apart resolve to
//! different keys; check-ins without usable coordinates fall back to the
//! name-only key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side length of a spatial bucket in degrees (~11 km at the equator).
pub const BUCKET_DEGREES: f64 = 0.1;

/// Derived grouping identity for check-ins believed to refer to the same
/// physical clinic. Never persisted as an identity table; recomputed on every
/// aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicKey(String);

impl ClinicKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClinicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a clinic name and optional coordinates into a stable grouping key.
///
/// Pure and total: malformed coordinates degrade to name-only grouping.
pub fn resolve(name: &str, lat: Option<f64>, lon: Option<f64>) -> ClinicKey {
    let norm = normalize_name(name);
    match location_bucket(lat, lon) {
        Some((lat_bucket, lon_bucket)) => ClinicKey(format!("{norm}__{lat_bucket}_{lon_bucket}")),
        None => ClinicKey(norm),
    }
}

/// Lower-case the name, collapse runs of non-alphanumeric characters to a
/// single underscore, and trim underscores from both ends.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Bucket coordinates into grid cells of `BUCKET_DEGREES` per side.
///
/// Returns `None` when either coordinate is missing or non-finite.
pub fn location_bucket(lat: Option<f64>, lon: Option<f64>) -> Option<(i64, i64)> {
    let lat = lat.filter(|v| v.is_finite())?;
    let lon = lon.filter(|v| v.is_finite())?;
    Some((
        (lat / BUCKET_DEGREES).floor() as i64,
        (lon / BUCKET_DEGREES).floor() as i64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_punctuation_runs() {
        assert_eq!(normalize_name("Central Care Clinic!!"), "central_care_clinic");
        assert_eq!(normalize_name("  St. Mary's -- Walk-In  "), "st_mary_s_walk_in");
        assert_eq!(normalize_name("___"), "");
    }

    #[test]
    fn same_cell_resolves_to_same_key() {
        let a = resolve("Central Clinic", Some(51.05), Some(-114.06));
        let b = resolve("central clinic!", Some(51.08), Some(-114.09));
        assert_eq!(a, b);
    }

    #[test]
    fn distant_cells_resolve_to_different_keys() {
        let a = resolve("Central Clinic", Some(51.05), Some(-114.06));
        let b = resolve("Central Clinic", Some(51.25), Some(-114.06));
        assert_ne!(a, b);
    }

    #[test]
    fn missing_coordinates_fall_back_to_name_only() {
        let key = resolve("Central Clinic", None, None);
        assert_eq!(key.as_str(), "central_clinic");

        let half = resolve("Central Clinic", Some(51.05), None);
        assert_eq!(half, key);
    }

    #[test]
    fn non_finite_coordinates_degrade_to_name_only() {
        let key = resolve("Central Clinic", Some(f64::NAN), Some(-114.06));
        assert_eq!(key.as_str(), "central_clinic");

        let inf = resolve("Central Clinic", Some(51.05), Some(f64::INFINITY));
        assert_eq!(inf.as_str(), "central_clinic");
    }

    #[test]
    fn bucket_floors_negative_coordinates() {
        // -114.06 / 0.1 = -1140.6, floored to -1141
        assert_eq!(
            location_bucket(Some(51.05), Some(-114.06)),
            Some((510, -1141))
        );
    }

    #[test]
    fn keyed_form_embeds_both_buckets() {
        let key = resolve("Central Clinic", Some(51.05), Some(-114.06));
        assert_eq!(key.as_str(), "central_clinic__510_-1141");
    }
}
