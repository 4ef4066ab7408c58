//! Check-in records and their validation.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Self-reported crowding condition at a clinic. `Busy` is accepted as an
/// alias for `Moderate` from older reporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Smooth,
    #[serde(alias = "Busy")]
    Moderate,
    Overloaded,
}

impl Condition {
    /// All conditions in a fixed order; dominant-condition counting iterates
    /// this so ties break deterministically (first maximum wins).
    pub const ALL: [Condition; 3] = [Condition::Smooth, Condition::Moderate, Condition::Overloaded];

    pub fn index(self) -> usize {
        match self {
            Condition::Smooth => 0,
            Condition::Moderate => 1,
            Condition::Overloaded => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Smooth => "Smooth",
            Condition::Moderate => "Moderate",
            Condition::Overloaded => "Overloaded",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized condition: {0:?}")]
pub struct ParseConditionError(String);

impl FromStr for Condition {
    type Err = ParseConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Smooth" => Ok(Condition::Smooth),
            "Moderate" | "Busy" => Ok(Condition::Moderate),
            "Overloaded" => Ok(Condition::Overloaded),
            other => Err(ParseConditionError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// An inbound check-in before validation.
#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub clinic_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub check_in_time: OffsetDateTime,
    pub check_out_time: OffsetDateTime,
    pub condition: Condition,
}

/// One reporter-submitted observation, immutable once created. Appended to
/// the check-in log and never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub checkin_id: Uuid,
    pub clinic_name: String,
    pub location: Option<GeoPoint>,
    #[serde(with = "time::serde::rfc3339")]
    pub check_in_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub check_out_time: OffsetDateTime,
    /// Derived once at creation and never recomputed.
    pub wait_time_minutes: f64,
    pub condition: Condition,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl NewCheckIn {
    /// Validate the submission and derive the immutable record.
    ///
    /// Rejects empty names, non-finite coordinates, and non-positive visit
    /// durations; a submission carrying only one coordinate is treated as
    /// having no location.
    pub fn into_record(self, now: OffsetDateTime) -> Result<CheckIn, AppError> {
        if self.clinic_name.trim().is_empty() {
            return Err(AppError::validation("clinic name must not be empty"));
        }
        for (label, value) in [("latitude", self.latitude), ("longitude", self.longitude)] {
            if let Some(v) = value
                && !v.is_finite()
            {
                return Err(AppError::validation(format!("{label} must be finite")));
            }
        }
        if self.check_out_time <= self.check_in_time {
            return Err(AppError::validation(
                "check-out time must be after check-in time",
            ));
        }

        let location = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };

        let wait_time_minutes = wait_minutes(self.check_in_time, self.check_out_time);

        Ok(CheckIn {
            checkin_id: Uuid::new_v4(),
            clinic_name: self.clinic_name,
            location,
            check_in_time: self.check_in_time,
            check_out_time: self.check_out_time,
            wait_time_minutes,
            condition: self.condition,
            created_at: now,
        })
    }
}

/// Minutes between check-in and check-out, floored at zero and rounded to one
/// decimal.
pub fn wait_minutes(check_in: OffsetDateTime, check_out: OffsetDateTime) -> f64 {
    let seconds = (check_out - check_in).whole_seconds() as f64;
    round1((seconds / 60.0).max(0.0))
}

/// Round to one decimal place, matching the precision of stored wait times.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl CheckIn {
    pub fn latitude(&self) -> Option<f64> {
        self.location.map(|l| l.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.location.map(|l| l.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn submission() -> NewCheckIn {
        NewCheckIn {
            clinic_name: "Central Clinic".to_string(),
            latitude: Some(51.05),
            longitude: Some(-114.06),
            check_in_time: datetime!(2026-08-01 09:00 UTC),
            check_out_time: datetime!(2026-08-01 09:25 UTC),
            condition: Condition::Moderate,
        }
    }

    #[test]
    fn valid_submission_derives_wait_minutes() -> Result<(), AppError> {
        let record = submission().into_record(datetime!(2026-08-01 10:00 UTC))?;
        assert_eq!(record.wait_time_minutes, 25.0);
        assert_eq!(record.condition, Condition::Moderate);
        assert_eq!(record.latitude(), Some(51.05));
        Ok(())
    }

    #[test]
    fn check_out_before_check_in_is_rejected() {
        let mut sub = submission();
        sub.check_out_time = sub.check_in_time;
        let result = sub.into_record(datetime!(2026-08-01 10:00 UTC));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn non_finite_coordinate_is_rejected() {
        let mut sub = submission();
        sub.latitude = Some(f64::NAN);
        let result = sub.into_record(datetime!(2026-08-01 10:00 UTC));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn single_coordinate_degrades_to_no_location() -> Result<(), AppError> {
        let mut sub = submission();
        sub.longitude = None;
        let record = sub.into_record(datetime!(2026-08-01 10:00 UTC))?;
        assert_eq!(record.location, None);
        Ok(())
    }

    #[test]
    fn empty_clinic_name_is_rejected() {
        let mut sub = submission();
        sub.clinic_name = "   ".to_string();
        let result = sub.into_record(datetime!(2026-08-01 10:00 UTC));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn condition_parses_busy_as_moderate() {
        assert_eq!("Busy".parse::<Condition>(), Ok(Condition::Moderate));
        assert_eq!("Smooth".parse::<Condition>(), Ok(Condition::Smooth));
        assert!("Packed".parse::<Condition>().is_err());
    }

    #[test]
    fn record_round_trips_through_json() -> Result<(), Box<dyn std::error::Error>> {
        let record = submission().into_record(datetime!(2026-08-01 10:00 UTC))?;
        let json = serde_json::to_string(&record)?;
        let back: CheckIn = serde_json::from_str(&json)?;
        assert_eq!(back, record);
        Ok(())
    }

    #[test]
    fn busy_alias_deserializes_in_records() -> Result<(), Box<dyn std::error::Error>> {
        let condition: Condition = serde_json::from_str("\"Busy\"")?;
        assert_eq!(condition, Condition::Moderate);
        Ok(())
    }
}
