use carewait::checkin::{Condition, NewCheckIn};
use carewait::engine::{Engine, ForecastSettings};
use carewait::error::AppError;
use carewait::identity;
use carewait::store::LocalStore;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

const NOW: OffsetDateTime = datetime!(2026-08-10 12:00 UTC);

fn temp_root(tag: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("carewait-flow-{tag}-{unique}"))
}

fn engine_at(root: &PathBuf) -> Engine {
    let store = LocalStore::new(root.clone()).expect("create temp store");
    Engine::new(Box::new(store), ForecastSettings::default())
}

fn submission(wait_minutes: i64, check_out: OffsetDateTime) -> NewCheckIn {
    NewCheckIn {
        clinic_name: "Central Clinic".to_string(),
        latitude: Some(51.05),
        longitude: Some(-114.06),
        check_in_time: check_out - Duration::minutes(wait_minutes),
        check_out_time: check_out,
        condition: Condition::Moderate,
    }
}

#[test]
fn single_submission_flows_into_snapshot() -> Result<(), AppError> {
    let root = temp_root("single");
    let engine = engine_at(&root);

    let record = engine.submit_at(submission(25, NOW), NOW)?;
    assert_eq!(record.wait_time_minutes, 25.0);

    let clinics = engine.list_clinics_at(true, NOW)?;
    assert_eq!(clinics.len(), 1);
    let snapshot = clinics.values().next().expect("one snapshot");
    assert_eq!(snapshot.total_reports, 1);
    assert_eq!(snapshot.recent_reports, 1);
    assert_eq!(snapshot.average_wait_time, Some(25.0));
    assert_eq!(snapshot.latest_wait_time, Some(25.0));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn repeated_submissions_feed_the_forecaster() -> Result<(), AppError> {
    let root = temp_root("repeat");
    let engine = engine_at(&root);

    for (i, wait) in [10, 20, 30].into_iter().enumerate() {
        let at = NOW + Duration::minutes(i as i64);
        engine.submit_at(submission(wait, at), at)?;
    }

    let key = identity::resolve("Central Clinic", Some(51.05), Some(-114.06));
    let forecaster = engine.load_forecaster()?;
    let stats = forecaster.stats(&key).expect("stats accumulated");
    assert_eq!(stats.overall.average(), Some(20.0));
    assert_eq!(stats.recent.len(), 3);

    // The forward bias keeps the forecast strictly above the plain average.
    let predicted = forecaster.predict(&key, 11, 0, Condition::Moderate, None);
    assert!(
        predicted > 20.0 * 1.10,
        "prediction {predicted} not biased above the average"
    );

    let clinics = engine.list_clinics_at(true, NOW)?;
    assert_eq!(clinics.len(), 1);
    let snapshot = clinics.values().next().expect("one snapshot");
    assert_eq!(snapshot.total_reports, 3);
    assert_eq!(snapshot.average_wait_time, Some(20.0));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn rejected_submission_leaves_all_state_untouched() -> Result<(), AppError> {
    let root = temp_root("reject");
    let engine = engine_at(&root);

    engine.submit_at(submission(25, NOW), NOW)?;
    let clinics_before = engine.list_clinics_at(true, NOW)?;

    let mut bad = submission(25, NOW);
    bad.check_out_time = bad.check_in_time - Duration::minutes(5);
    let result = engine.submit_at(bad, NOW);
    assert!(matches!(result, Err(AppError::Validation(_))));

    assert_eq!(engine.list_checkins()?.len(), 1);
    assert_eq!(engine.list_clinics_at(true, NOW)?, clinics_before);

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn state_survives_engine_restart() -> Result<(), AppError> {
    let root = temp_root("restart");

    {
        let engine = engine_at(&root);
        engine.submit_at(submission(25, NOW), NOW)?;
    }

    let reopened = engine_at(&root);
    assert_eq!(reopened.list_checkins()?.len(), 1);

    let key = identity::resolve("Central Clinic", Some(51.05), Some(-114.06));
    let forecaster = reopened.load_forecaster()?;
    let stats = forecaster.stats(&key).expect("stats persisted");
    assert_eq!(stats.overall.average(), Some(25.0));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn distant_namesakes_produce_separate_snapshots() -> Result<(), AppError> {
    let root = temp_root("namesake");
    let engine = engine_at(&root);

    engine.submit_at(submission(25, NOW), NOW)?;
    let mut far = submission(40, NOW);
    far.latitude = Some(51.45);
    engine.submit_at(far, NOW)?;

    let clinics = engine.list_clinics_at(true, NOW)?;
    assert_eq!(clinics.len(), 2);

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn geojson_and_nearby_agree_on_submitted_clinic() -> Result<(), AppError> {
    let root = temp_root("views");
    let engine = engine_at(&root);

    engine.submit_at(submission(25, NOW), NOW)?;

    let collection = engine.export_geojson_at(NOW)?;
    assert_eq!(collection.features.len(), 1);
    let feature = &collection.features[0];
    assert_eq!(feature.geometry.coordinates, [-114.06, 51.05]);
    assert!(feature.properties.predicted_wait_time > 0.0);

    let nearby = engine.nearby_at(51.05, -114.06, 5.0, 10, NOW)?;
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].clinic.clinic_name, "Central Clinic");
    assert_eq!(
        nearby[0].predicted_wait_time,
        feature.properties.predicted_wait_time
    );

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}
