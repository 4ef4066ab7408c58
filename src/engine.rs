//! The engine: the four core operations over the injected blob store.
//!
//! Each write performs load log -> append -> full re-aggregation -> persist
//! snapshot -> predict -> update forecaster -> persist forecaster, all
//! blocking and in sequence. Racing writers on the same blob can overwrite
//! each other; accepted at this write volume.

use crate::aggregate::{self, ClinicSnapshot};
use crate::checkin::{CheckIn, NewCheckIn};
use crate::error::AppError;
use crate::forecast::Forecaster;
use crate::geo::{self, FeatureCollection, NearbyClinic};
use crate::identity::{self, ClinicKey};
use crate::store::{BlobKind, BlobStore};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ForecastSettings {
    pub default_wait: f64,
    pub history_cap: usize,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            default_wait: crate::config::DEFAULT_WAIT_MINUTES,
            history_cap: crate::config::DEFAULT_HISTORY_CAP,
        }
    }
}

pub struct Engine {
    store: Box<dyn BlobStore>,
    settings: ForecastSettings,
}

impl Engine {
    pub fn new(store: Box<dyn BlobStore>, settings: ForecastSettings) -> Self {
        Self { store, settings }
    }

    /// Validate and record a new check-in, then refresh the snapshot index
    /// and forecaster state. Nothing is written when validation fails.
    pub fn submit(&self, submission: NewCheckIn) -> Result<CheckIn, AppError> {
        self.submit_at(submission, OffsetDateTime::now_utc())
    }

    pub fn submit_at(
        &self,
        submission: NewCheckIn,
        now: OffsetDateTime,
    ) -> Result<CheckIn, AppError> {
        let record = submission.into_record(now)?;

        let mut log = self.load_checkins()?;
        log.push(record.clone());
        self.save_checkins(&log)?;

        let snapshots = aggregate::aggregate(&log, now);
        self.save_clinics(&snapshots)?;

        let key = identity::resolve(&record.clinic_name, record.latitude(), record.longitude());
        let hour = record.check_in_time.hour();
        let weekday = record.check_in_time.weekday().number_days_from_monday();

        let mut forecaster = self.load_forecaster()?;
        let predicted = forecaster.predict(&key, hour, weekday, record.condition, None);
        forecaster.update(
            &key,
            hour,
            weekday,
            record.condition,
            record.wait_time_minutes,
            Some(predicted),
        );
        self.save_forecaster(&forecaster)?;

        info!(
            clinic = %key,
            wait_minutes = record.wait_time_minutes,
            predicted_minutes = predicted,
            "check-in recorded"
        );
        Ok(record)
    }

    /// All check-ins in insertion order.
    pub fn list_checkins(&self) -> Result<Vec<CheckIn>, AppError> {
        self.load_checkins()
    }

    /// Current clinic snapshots. With `regenerate` the log is re-aggregated
    /// and the index refreshed; otherwise the saved index is served. An empty
    /// result falls back to the saved index and finally to seeded
    /// placeholders.
    pub fn list_clinics(
        &self,
        regenerate: bool,
    ) -> Result<BTreeMap<ClinicKey, ClinicSnapshot>, AppError> {
        self.list_clinics_at(regenerate, OffsetDateTime::now_utc())
    }

    pub fn list_clinics_at(
        &self,
        regenerate: bool,
        now: OffsetDateTime,
    ) -> Result<BTreeMap<ClinicKey, ClinicSnapshot>, AppError> {
        if regenerate {
            let log = self.load_checkins()?;
            if !log.is_empty() {
                let snapshots = aggregate::aggregate(&log, now);
                if !snapshots.is_empty() {
                    self.save_clinics(&snapshots)?;
                    return Ok(snapshots);
                }
            }
        }

        let saved = self.load_clinics()?;
        if !saved.is_empty() {
            return Ok(saved);
        }

        debug!("no clinic data available, seeding placeholder clinics");
        let seeded = aggregate::seed_default_clinics(now);
        self.save_clinics(&seeded)?;
        Ok(seeded)
    }

    /// GeoJSON view of all clinics with predictions and color bands.
    pub fn export_geojson(&self) -> Result<FeatureCollection, AppError> {
        self.export_geojson_at(OffsetDateTime::now_utc())
    }

    pub fn export_geojson_at(&self, now: OffsetDateTime) -> Result<FeatureCollection, AppError> {
        let clinics = self.list_clinics_at(true, now)?;
        let forecaster = self.load_forecaster()?;
        Ok(geo::export_geojson(&clinics, &forecaster, now))
    }

    /// Clinics within `radius_km`, sorted by predicted wait.
    pub fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyClinic>, AppError> {
        self.nearby_at(latitude, longitude, radius_km, limit, OffsetDateTime::now_utc())
    }

    pub fn nearby_at(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: usize,
        now: OffsetDateTime,
    ) -> Result<Vec<NearbyClinic>, AppError> {
        let clinics = self.list_clinics_at(false, now)?;
        let forecaster = self.load_forecaster()?;
        Ok(geo::nearby(
            &clinics, &forecaster, latitude, longitude, radius_km, limit, now,
        ))
    }

    /// Forecaster state as persisted; a missing or corrupt blob degrades to
    /// an empty default rather than failing.
    pub fn load_forecaster(&self) -> Result<Forecaster, AppError> {
        let fresh = || Forecaster::new(self.settings.default_wait, self.settings.history_cap);
        match self.store.load(BlobKind::ForecasterModel)? {
            Some(bytes) => Ok(Forecaster::from_json(&bytes).unwrap_or_else(|err| {
                warn!(error = %err, "corrupt forecaster state, starting cold");
                fresh()
            })),
            None => Ok(fresh()),
        }
    }

    fn save_forecaster(&self, forecaster: &Forecaster) -> Result<(), AppError> {
        let bytes = forecaster.to_json()?;
        self.store.save(BlobKind::ForecasterModel, &bytes)?;
        Ok(())
    }

    fn load_checkins(&self) -> Result<Vec<CheckIn>, AppError> {
        match self.store.load(BlobKind::CheckinLog)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(error = %err, "corrupt check-in log, treating as empty");
                Vec::new()
            })),
            None => Ok(Vec::new()),
        }
    }

    fn save_checkins(&self, checkins: &[CheckIn]) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(checkins)?;
        self.store.save(BlobKind::CheckinLog, &bytes)?;
        Ok(())
    }

    fn load_clinics(&self) -> Result<BTreeMap<ClinicKey, ClinicSnapshot>, AppError> {
        match self.store.load(BlobKind::ClinicIndex)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(error = %err, "corrupt clinic index, treating as empty");
                BTreeMap::new()
            })),
            None => Ok(BTreeMap::new()),
        }
    }

    fn save_clinics(&self, clinics: &BTreeMap<ClinicKey, ClinicSnapshot>) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(clinics)?;
        self.store.save(BlobKind::ClinicIndex, &bytes)?;
        Ok(())
    }
}
