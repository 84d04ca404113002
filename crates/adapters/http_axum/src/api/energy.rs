//! JSON REST handlers for energy readings.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lightkeeper_app::ports::{
    EnergyRepository, LightRepository, OwnerRepository, RoutineRepository,
};
use lightkeeper_domain::energy::EnergyReading;

use crate::api::{parse_device, parse_light, parse_owner};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for a controller reporting consumption.
#[derive(Deserialize)]
pub struct RecordRequest {
    pub device_id: String,
    pub light_id: String,
    pub energy_wh: f64,
    /// RFC 3339; the server time is used when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

/// History of an owner's readings, newest first per light.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub energy_readings: Vec<EnergyReading>,
}

/// Possible responses from the record endpoint.
pub enum RecordResponse {
    Created(Json<EnergyReading>),
}

impl IntoResponse for RecordResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the history endpoint.
pub enum ListResponse {
    Ok(Json<HistoryResponse>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/energy`
pub async fn record<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Json(req): Json<RecordRequest>,
) -> Result<RecordResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let device = parse_device(req.device_id)?;
    let light = parse_light(req.light_id)?;
    let reading = state
        .energy_service
        .record(&device, light, req.energy_wh, req.timestamp)
        .await?;
    Ok(RecordResponse::Created(Json(reading)))
}

/// `GET /api/owners/{owner}/energy`
pub async fn list<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
) -> Result<ListResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let energy_readings = state.energy_service.readings(parse_owner(&owner)?).await?;
    Ok(ListResponse::Ok(Json(HistoryResponse { energy_readings })))
}
