//! JSON REST handlers for lights.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use lightkeeper_app::ports::{
    EnergyRepository, LightRepository, OwnerRepository, RoutineRepository,
};
use lightkeeper_app::services::light_service::LightView;
use lightkeeper_domain::light::{Light, LightStatus, TimeoutInfo};

use crate::api::{parse_light, parse_owner};
use crate::error::ApiError;
use crate::state::AppState;

/// A light as returned by the API, with its live countdown when ON.
#[derive(Debug, Serialize)]
pub struct LightResponse {
    #[serde(flatten)]
    pub light: Light,
    pub timeout_info: Option<TimeoutInfo>,
}

impl From<LightView> for LightResponse {
    fn from(view: LightView) -> Self {
        Self {
            light: view.light,
            timeout_info: view.timeout,
        }
    }
}

/// Request body for registering a light.
#[derive(Deserialize)]
pub struct RegisterLightRequest {
    pub light_id: String,
    pub name: Option<String>,
}

/// Request body for switching a light.
#[derive(Deserialize)]
pub struct ControlRequest {
    /// `ON` or `OFF`.
    pub status: String,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<LightResponse>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and control endpoints.
pub enum GetResponse {
    Ok(Json<LightResponse>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the register endpoint.
pub enum RegisterResponse {
    Created(Json<Light>),
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `GET /api/owners/{owner}/lights`
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
    let views = state.light_service.list_lights(parse_owner(&owner)?).await?;
    Ok(ListResponse::Ok(Json(
        views.into_iter().map(LightResponse::from).collect(),
    )))
}

/// `POST /api/owners/{owner}/lights`
pub async fn register<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
    Json(req): Json<RegisterLightRequest>,
) -> Result<RegisterResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let owner = parse_owner(&owner)?;
    let light = parse_light(req.light_id)?;
    let created = state
        .light_service
        .register_light(owner, light, req.name)
        .await?;
    Ok(RegisterResponse::Created(Json(created)))
}

/// `GET /api/owners/{owner}/lights/{light}`
pub async fn get<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path((owner, light)): Path<(String, String)>,
) -> Result<GetResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let owner = parse_owner(&owner)?;
    let light = parse_light(light)?;
    let view = state.light_service.get_light(owner, &light).await?;
    Ok(GetResponse::Ok(Json(view.into())))
}

/// `POST /api/owners/{owner}/lights/{light}/control`
pub async fn control<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path((owner, light)): Path<(String, String)>,
    Json(req): Json<ControlRequest>,
) -> Result<GetResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let owner = parse_owner(&owner)?;
    let light = parse_light(light)?;
    let status = LightStatus::from_str(&req.status)?;

    state.light_service.set_status(owner, &light, status).await?;
    let view = state.light_service.get_light(owner, &light).await?;
    Ok(GetResponse::Ok(Json(view.into())))
}
