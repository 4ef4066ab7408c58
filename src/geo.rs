//! Map-facing views: GeoJSON export with color bands, and the nearby query.

use crate::aggregate::ClinicSnapshot;
use crate::checkin::round1;
use crate::forecast::Forecaster;
use crate::identity::ClinicKey;
use serde::Serialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Pin color bands keyed off the reference wait time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBand {
    Green,
    Yellow,
    Orange,
    Red,
}

impl ColorBand {
    pub fn for_wait(minutes: f64) -> Self {
        if minutes < 15.0 {
            ColorBand::Green
        } else if minutes < 30.0 {
            ColorBand::Yellow
        } else if minutes < 60.0 {
            ColorBand::Orange
        } else {
            ColorBand::Red
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

#[derive(Debug, Serialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// GeoJSON position order: longitude first.
    pub coordinates: [f64; 2],
}

#[derive(Debug, Serialize)]
pub struct FeatureProperties {
    pub clinic_id: ClinicKey,
    pub clinic_name: String,
    pub latest_wait_time: Option<f64>,
    pub predicted_wait_time: f64,
    pub current_condition: crate::checkin::Condition,
    pub reliability_score: f64,
    pub total_reports: usize,
    pub color: ColorBand,
}

/// A clinic within the nearby search radius, annotated with distance and the
/// current prediction.
#[derive(Debug, Serialize)]
pub struct NearbyClinic {
    #[serde(flatten)]
    pub clinic: ClinicSnapshot,
    pub distance_km: f64,
    pub predicted_wait_time: f64,
}

/// Build a GeoJSON FeatureCollection from the snapshot map, one feature per
/// clinic with usable coordinates.
///
/// The color band is selected on the latest reported wait when one exists,
/// else on the prediction.
pub fn export_geojson(
    clinics: &BTreeMap<ClinicKey, ClinicSnapshot>,
    forecaster: &Forecaster,
    now: OffsetDateTime,
) -> FeatureCollection {
    let hour = now.hour();
    let weekday = now.weekday().number_days_from_monday();

    let features = clinics
        .iter()
        .filter_map(|(key, snapshot)| {
            let location = snapshot.location?;
            if !location.latitude.is_finite() || !location.longitude.is_finite() {
                return None;
            }

            let predicted = round1(forecaster.predict(
                key,
                hour,
                weekday,
                snapshot.current_condition,
                snapshot.latest_wait_time,
            ));
            let reference = snapshot.latest_wait_time.unwrap_or(predicted);

            Some(Feature {
                kind: "Feature",
                geometry: Geometry {
                    kind: "Point",
                    coordinates: [location.longitude, location.latitude],
                },
                properties: FeatureProperties {
                    clinic_id: key.clone(),
                    clinic_name: snapshot.clinic_name.clone(),
                    latest_wait_time: snapshot.latest_wait_time,
                    predicted_wait_time: predicted,
                    current_condition: snapshot.current_condition,
                    reliability_score: snapshot.reliability_score,
                    total_reports: snapshot.total_reports,
                    color: ColorBand::for_wait(reference),
                },
            })
        })
        .collect();

    FeatureCollection {
        kind: "FeatureCollection",
        features,
    }
}

/// Clinics within `radius_km` of the caller, sorted by predicted wait time,
/// truncated to `limit`.
pub fn nearby(
    clinics: &BTreeMap<ClinicKey, ClinicSnapshot>,
    forecaster: &Forecaster,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    limit: usize,
    now: OffsetDateTime,
) -> Vec<NearbyClinic> {
    let hour = now.hour();
    let weekday = now.weekday().number_days_from_monday();

    let mut results: Vec<NearbyClinic> = clinics
        .iter()
        .filter_map(|(key, snapshot)| {
            let location = snapshot.location?;
            let distance_km = flat_distance_km(
                latitude,
                longitude,
                location.latitude,
                location.longitude,
            );
            if !distance_km.is_finite() || distance_km > radius_km {
                return None;
            }

            let predicted = round1(forecaster.predict(
                key,
                hour,
                weekday,
                snapshot.current_condition,
                snapshot.latest_wait_time,
            ));

            Some(NearbyClinic {
                clinic: snapshot.clone(),
                distance_km: round2(distance_km),
                predicted_wait_time: predicted,
            })
        })
        .collect();

    results.sort_by(|a, b| a.predicted_wait_time.total_cmp(&b.predicted_wait_time));
    results.truncate(limit);
    results
}

/// Flat-earth distance approximation, adequate at city scale.
fn flat_distance_km(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let lat_diff = lat_a - lat_b;
    let lon_diff = lon_a - lon_b;
    (lat_diff * lat_diff + lon_diff * lon_diff).sqrt() * 111.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
