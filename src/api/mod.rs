use crate::engine::Engine;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub mod handlers;
pub mod responses;

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route(
            "/checkins",
            get(handlers::list_checkins).post(handlers::create_checkin),
        )
        .route("/clinics", get(handlers::list_clinics))
        .route("/clinics/geojson", get(handlers::clinics_geojson))
        .route("/clinics/nearby", get(handlers::nearby_clinics))
        .with_state(engine)
}
