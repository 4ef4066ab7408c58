use crate::api::responses::{ApiErrorCode, ErrorResponse};
use crate::checkin::{CheckIn, Condition, NewCheckIn};
use crate::engine::Engine;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::error;

const DEFAULT_RADIUS_KM: f64 = 10.0;
const DEFAULT_NEARBY_LIMIT: usize = 10;

pub enum ApiResponse<T> {
    Success { status: StatusCode, body: T },
    Error { status: StatusCode, body: ErrorResponse },
}

impl<T> ApiResponse<T> {
    fn ok(body: T) -> Self {
        ApiResponse::Success {
            status: StatusCode::OK,
            body,
        }
    }

    fn bad_request(message: impl Into<String>, now: OffsetDateTime) -> Self {
        ApiResponse::Error {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error_code: ApiErrorCode::ValidationError,
                error_message: message.into(),
                timestamp: format_timestamp(now),
            },
        }
    }

    fn from_engine_error(err: AppError, now: OffsetDateTime) -> Self {
        match err {
            AppError::Validation(reason) => Self::bad_request(reason, now),
            AppError::Store(source) => {
                error!(error = %source, "storage failure while handling request");
                ApiResponse::Error {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ErrorResponse {
                        error_code: ApiErrorCode::StorageError,
                        error_message: "Storage unavailable".to_string(),
                        timestamp: format_timestamp(now),
                    },
                }
            }
            AppError::Serialize(source) => {
                error!(error = %source, "serialization failure while handling request");
                ApiResponse::Error {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ErrorResponse {
                        error_code: ApiErrorCode::InternalError,
                        error_message: "Internal server error".to_string(),
                        timestamp: format_timestamp(now),
                    },
                }
            }
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success { status, body } => (status, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[derive(Debug, Deserialize)]
pub struct CheckInForm {
    pub clinic_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub check_in_time: String,
    pub check_out_time: String,
    pub condition: String,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default = "default_nearby_limit")]
    pub limit: usize,
}

fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

fn default_nearby_limit() -> usize {
    DEFAULT_NEARBY_LIMIT
}

pub async fn create_checkin(
    State(engine): State<Arc<Engine>>,
    Form(form): Form<CheckInForm>,
) -> impl IntoResponse {
    build_submit_response(&engine, form, OffsetDateTime::now_utc())
}

pub async fn list_checkins(State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    build_checkins_response(&engine, OffsetDateTime::now_utc())
}

pub async fn list_clinics(State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    build_clinics_response(&engine, OffsetDateTime::now_utc())
}

pub async fn clinics_geojson(State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    build_geojson_response(&engine, OffsetDateTime::now_utc())
}

pub async fn nearby_clinics(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<NearbyQuery>,
) -> impl IntoResponse {
    build_nearby_response(&engine, query, OffsetDateTime::now_utc())
}

fn build_submit_response(
    engine: &Engine,
    form: CheckInForm,
    now: OffsetDateTime,
) -> ApiResponse<CheckIn> {
    let check_in_time = match OffsetDateTime::parse(&form.check_in_time, &Rfc3339) {
        Ok(parsed) => parsed,
        Err(err) => return ApiResponse::bad_request(format!("invalid check_in_time: {err}"), now),
    };
    let check_out_time = match OffsetDateTime::parse(&form.check_out_time, &Rfc3339) {
        Ok(parsed) => parsed,
        Err(err) => return ApiResponse::bad_request(format!("invalid check_out_time: {err}"), now),
    };
    let condition: Condition = match form.condition.parse() {
        Ok(parsed) => parsed,
        Err(err) => return ApiResponse::bad_request(format!("{err}"), now),
    };

    let submission = NewCheckIn {
        clinic_name: form.clinic_name,
        latitude: form.latitude,
        longitude: form.longitude,
        check_in_time,
        check_out_time,
        condition,
    };

    match engine.submit_at(submission, now) {
        Ok(record) => ApiResponse::Success {
            status: StatusCode::CREATED,
            body: record,
        },
        Err(err) => ApiResponse::from_engine_error(err, now),
    }
}

fn build_checkins_response(engine: &Engine, now: OffsetDateTime) -> ApiResponse<Vec<CheckIn>> {
    match engine.list_checkins() {
        Ok(checkins) => ApiResponse::ok(checkins),
        Err(err) => ApiResponse::from_engine_error(err, now),
    }
}

fn build_clinics_response(
    engine: &Engine,
    now: OffsetDateTime,
) -> ApiResponse<Vec<crate::aggregate::ClinicSnapshot>> {
    match engine.list_clinics_at(true, now) {
        Ok(clinics) => ApiResponse::ok(clinics.into_values().collect()),
        Err(err) => ApiResponse::from_engine_error(err, now),
    }
}

fn build_geojson_response(
    engine: &Engine,
    now: OffsetDateTime,
) -> ApiResponse<crate::geo::FeatureCollection> {
    match engine.export_geojson_at(now) {
        Ok(collection) => ApiResponse::ok(collection),
        Err(err) => ApiResponse::from_engine_error(err, now),
    }
}

fn build_nearby_response(
    engine: &Engine,
    query: NearbyQuery,
    now: OffsetDateTime,
) -> ApiResponse<Vec<crate::geo::NearbyClinic>> {
    if !query.latitude.is_finite() || !query.longitude.is_finite() {
        return ApiResponse::bad_request("latitude and longitude must be finite", now);
    }
    if !query.radius_km.is_finite() || query.radius_km <= 0.0 {
        return ApiResponse::bad_request("radius_km must be positive", now);
    }

    match engine.nearby_at(query.latitude, query.longitude, query.radius_km, query.limit, now) {
        Ok(results) => ApiResponse::ok(results),
        Err(err) => ApiResponse::from_engine_error(err, now),
    }
}
