//! JSON REST handlers for the wake/sleep schedule.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use lightkeeper_app::ports::{
    EnergyRepository, LightRepository, OwnerRepository, RoutineRepository,
};
use lightkeeper_domain::routine::{RoutineTrigger, WakeSleepRoutine};

use crate::api::{parse_light, parse_owner};
use crate::error::ApiError;
use crate::state::AppState;

/// One trigger as sent by clients: `{"at": "07:00", "light_id": "main"}`.
#[derive(Deserialize)]
pub struct TriggerRequest {
    pub at: String,
    pub light_id: String,
}

impl TriggerRequest {
    fn parse(self) -> Result<RoutineTrigger, ApiError> {
        Ok(RoutineTrigger {
            at: self.at.parse()?,
            light_id: parse_light(self.light_id)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub wake_up: Option<TriggerRequest>,
    pub sleep: Option<TriggerRequest>,
}

/// `GET /api/owners/{owner}/schedule`
pub async fn get<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
) -> Result<Json<WakeSleepRoutine>, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let routine = state
        .routine_service
        .get_schedule(parse_owner(&owner)?)
        .await?;
    Ok(Json(routine))
}

/// `PUT /api/owners/{owner}/schedule`
pub async fn set<OR, LR, RR, ER>(
    State(state): State<AppState<OR, LR, RR, ER>>,
    Path(owner): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<WakeSleepRoutine>, ApiError>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    let owner = parse_owner(&owner)?;
    let wake_up = req.wake_up.map(TriggerRequest::parse).transpose()?;
    let sleep = req.sleep.map(TriggerRequest::parse).transpose()?;
    let routine = state
        .routine_service
        .set_schedule(owner, wake_up, sleep)
        .await?;
    Ok(Json(routine))
}
