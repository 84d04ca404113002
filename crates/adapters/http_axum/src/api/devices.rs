//! JSON REST handlers for paired controllers.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lightkeeper_app::ports::{
    EnergyRepository, LightRepository, OwnerRepository, RoutineRepository,
};
use lightkeeper_domain::id::{DeviceId, LightId, OwnerId};
use lightkeeper_domain::light::{Light, LightStatus};
use lightkeeper_domain::owner::Owner;

use crate::api::{parse_device, parse_light};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for pairing a controller with an owner.
#[derive(Deserialize)]
pub struct PairRequest {
    pub device_id: String,
    pub email: String,
}

/// Request body for a controller registering one of its lights.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub light_id: String,
    pub token: String,
}

/// Who a controller is paired with.
#[derive(Debug, Serialize)]
pub struct DeviceInfo {
    pub device_id: DeviceId,
    pub owner_id: OwnerId,
    pub email: String,
    pub paired_at: Option<DateTime<Utc>>,
}

impl DeviceInfo {
    fn from_owner(device_id: DeviceId, owner: Owner) -> Self {
        Self {
            device_id,
            owner_id: owner.id,
            email: owner.email,
            paired_at: owner.device_paired_at,
        }
    }
}

/// Possible responses from the pair and info endpoints.
pub enum InfoResponse {
    Ok(Json<DeviceInfo>),
}

impl IntoResponse for InfoResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the status poll.
pub enum StatusResponse {
    Ok(Json<BTreeMap<LightId, LightStatus>>),
}

impl IntoResponse for StatusResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the device light registration endpoint.
pub enum RegisterResponse {
    Created(Json<Light>),
    Existing(Json<Light>),
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
            Self::Existing(json) => json.into_response(),
        }
    }
}

/// `POST /api/devices/pair`
pub async fn pair<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Json(req): Json<PairRequest>,
) -> Result<InfoResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let device = parse_device(req.device_id)?;
    let owner = state
        .device_service
        .pair_device(device.clone(), req.email.trim())
        .await?;
    Ok(InfoResponse::Ok(Json(DeviceInfo::from_owner(device, owner))))
}

/// `GET /api/devices/{device}`
pub async fn info<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(device): Path<String>,
) -> Result<InfoResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let device = parse_device(device)?;
    let owner = state.device_service.device_owner(&device).await?;
    Ok(InfoResponse::Ok(Json(DeviceInfo::from_owner(device, owner))))
}

/// `GET /api/devices/{device}/status`
pub async fn status<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(device): Path<String>,
) -> Result<StatusResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let device = parse_device(device)?;
    let lights = state.device_service.device_status(&device).await?;
    Ok(StatusResponse::Ok(Json(lights)))
}

/// `POST /api/devices/{device}/lights`
pub async fn register_light<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(device): Path<String>,
    Json(req): Json<RegisterRequest>,
) -> Result<RegisterResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let device = parse_device(device)?;
    let light = parse_light(req.light_id)?;
    let registered = state
        .device_service
        .register_light(device, light, &req.token)
        .await?;
    if registered.created {
        Ok(RegisterResponse::Created(Json(registered.light)))
    } else {
        Ok(RegisterResponse::Existing(Json(registered.light)))
    }
}
