//! JSON REST handlers for the auto-off timer and notification window.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use lightkeeper_app::ports::{
    EnergyRepository, LightRepository, OwnerRepository, RoutineRepository,
};
use lightkeeper_domain::owner::Owner;

use crate::api::parse_owner;
use crate::error::ApiError;
use crate::state::AppState;

/// Auto-off timer as shown to clients.
#[derive(Debug, Serialize)]
pub struct TimerResponse {
    pub enabled: bool,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub total_secs: u32,
}

impl From<&Owner> for TimerResponse {
    fn from(owner: &Owner) -> Self {
        let (hours, minutes, seconds) = owner.policy.timeout.hms();
        Self {
            enabled: owner.policy.enabled,
            hours,
            minutes,
            seconds,
            total_secs: owner.policy.timeout.as_secs(),
        }
    }
}

/// Request body for setting the timer; omitted components count as zero.
#[derive(Deserialize)]
pub struct TimerRequest {
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
}

#[derive(Deserialize)]
pub struct AutoTimeoutRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Seconds a light may stay ON before its owner is notified.
    pub notify_duration: u32,
}

#[derive(Debug, Serialize)]
pub struct NotificationUpdate {
    pub notify_duration: u32,
    pub lights_updated: usize,
}

/// `GET /api/owners/{owner}/timer`
pub async fn get_timer<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
) -> Result<Json<TimerResponse>, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let owner = state.settings_service.get_owner(parse_owner(&owner)?).await?;
    Ok(Json(TimerResponse::from(&owner)))
}

/// `PUT /api/owners/{owner}/timer`
pub async fn set_timer<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
    Json(req): Json<TimerRequest>,
) -> Result<Json<TimerResponse>, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let owner = state
        .settings_service
        .handle_timeout_change(parse_owner(&owner)?, req.hours, req.minutes, req.seconds)
        .await?;
    Ok(Json(TimerResponse::from(&owner)))
}

/// `PUT /api/owners/{owner}/auto-timeout`
pub async fn toggle_auto_timeout<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
    Json(req): Json<AutoTimeoutRequest>,
) -> Result<Json<TimerResponse>, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let owner = state
        .settings_service
        .handle_policy_toggle(parse_owner(&owner)?, req.enabled)
        .await?;
    Ok(Json(TimerResponse::from(&owner)))
}

/// `GET /api/owners/{owner}/notification-settings`
pub async fn get_notification<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
) -> Result<Json<NotificationSettings>, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let notify_duration = state
        .settings_service
        .notify_duration(parse_owner(&owner)?)
        .await?;
    Ok(Json(NotificationSettings { notify_duration }))
}

/// `PUT /api/owners/{owner}/notification-settings`
pub async fn set_notification<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
    Json(req): Json<NotificationSettings>,
) -> Result<Json<NotificationUpdate>, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let lights_updated = state
        .settings_service
        .set_notify_duration(parse_owner(&owner)?, req.notify_duration)
        .await?;
    Ok(Json(NotificationUpdate {
        notify_duration: req.notify_duration,
        lights_updated,
    }))
}
