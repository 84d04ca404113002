//! JSON REST handlers for owners.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use lightkeeper_app::ports::{
    EnergyRepository, LightRepository, OwnerRepository, RoutineRepository,
};
use lightkeeper_domain::owner::{DEFAULT_NOTIFY_BEFORE_SECS, Owner, TimeoutPolicy, parse_timezone};
use lightkeeper_domain::timeout::{DEFAULT_TIMEOUT_SECS, TimeoutDuration};

use crate::api::parse_owner;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating an owner.
#[derive(Deserialize)]
pub struct CreateOwnerRequest {
    pub email: String,
    pub username: Option<String>,
    /// IANA zone name, `UTC` when omitted.
    pub timezone: Option<String>,
    pub auto_timeout_enabled: Option<bool>,
    pub timeout_secs: Option<u32>,
    pub notify_before_secs: Option<u32>,
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Owner>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Owner>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `POST /api/owners`
pub async fn create<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Json(req): Json<CreateOwnerRequest>,
) -> Result<CreateResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let policy = TimeoutPolicy {
        enabled: req.auto_timeout_enabled.unwrap_or(true),
        timeout: TimeoutDuration::from_secs(req.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))?,
        notify_before_secs: req.notify_before_secs.unwrap_or(DEFAULT_NOTIFY_BEFORE_SECS),
    };

    let mut builder = Owner::builder()
        .email(req.email)
        .policy(policy)
        .created_at(state.light_service.clock().now());
    if let Some(username) = req.username {
        builder = builder.username(username);
    }
    if let Some(timezone) = req.timezone {
        builder = builder.timezone(parse_timezone(&timezone)?);
    }

    let owner = builder.build()?;
    let created = state.settings_service.create_owner(owner).await?;
    Ok(CreateResponse::Created(Json(created)))
}

/// `GET /api/owners/{owner}`
pub async fn get<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
) -> Result<GetResponse, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let owner = state.settings_service.get_owner(parse_owner(&owner)?).await?;
    Ok(GetResponse::Ok(Json(owner)))
}
