//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod energy;
#[allow(clippy::missing_errors_doc)]
pub mod lights;
#[allow(clippy::missing_errors_doc)]
pub mod owners;
#[allow(clippy::missing_errors_doc)]
pub mod schedule;
#[allow(clippy::missing_errors_doc)]
pub mod settings;

use std::str::FromStr;

use axum::Router;
use axum::routing::{get, post, put};

use lightkeeper_app::ports::{
    EnergyRepository, LightRepository, OwnerRepository, RoutineRepository,
};
use lightkeeper_domain::error::ValidationError;
use lightkeeper_domain::id::{DeviceId, LightId, OwnerId};

use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<OR, LR, RR, ER>() -> Router<AppState<OR, LR, RR, ER>>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    Router::new()
        // Owners
        .route("/owners", post(owners::create::<OR, LR, RR, ER>))
        .route("/owners/{owner}", get(owners::get::<OR, LR, RR, ER>))
        // Lights
        .route(
            "/owners/{owner}/lights",
            get(lights::list::<OR, LR, RR, ER>).post(lights::register::<OR, LR, RR, ER>),
        )
        .route(
            "/owners/{owner}/lights/{light}",
            get(lights::get::<OR, LR, RR, ER>),
        )
        .route(
            "/owners/{owner}/lights/{light}/control",
            post(lights::control::<OR, LR, RR, ER>),
        )
        // Timer & notifications
        .route(
            "/owners/{owner}/timer",
            get(settings::get_timer::<OR, LR, RR, ER>).put(settings::set_timer::<OR, LR, RR, ER>),
        )
        .route(
            "/owners/{owner}/auto-timeout",
            put(settings::toggle_auto_timeout::<OR, LR, RR, ER>),
        )
        .route(
            "/owners/{owner}/notification-settings",
            get(settings::get_notification::<OR, LR, RR, ER>)
                .put(settings::set_notification::<OR, LR, RR, ER>),
        )
        // Wake/sleep schedule
        .route(
            "/owners/{owner}/schedule",
            get(schedule::get::<OR, LR, RR, ER>).put(schedule::set::<OR, LR, RR, ER>),
        )
        // Energy
        .route(
            "/owners/{owner}/energy",
            get(energy::list::<OR, LR, RR, ER>),
        )
        .route("/energy", post(energy::record::<OR, LR, RR, ER>))
        // Paired controllers
        .route("/devices/pair", post(devices::pair::<OR, LR, RR, ER>))
        .route("/devices/{device}", get(devices::info::<OR, LR, RR, ER>))
        .route(
            "/devices/{device}/status",
            get(devices::status::<OR, LR, RR, ER>),
        )
        .route(
            "/devices/{device}/lights",
            post(devices::register_light::<OR, LR, RR, ER>),
        )
}

/// Parse the `{owner}` path segment.
pub(crate) fn parse_owner(raw: &str) -> Result<OwnerId, ApiError> {
    OwnerId::from_str(raw).map_err(|_| ValidationError::InvalidOwnerId(raw.to_string()).into())
}

/// Parse the `{light}` path segment.
pub(crate) fn parse_light(raw: String) -> Result<LightId, ApiError> {
    Ok(LightId::new(raw)?)
}

/// Parse a device identifier from a path segment or body field.
pub(crate) fn parse_device(raw: String) -> Result<DeviceId, ApiError> {
    Ok(DeviceId::new(raw)?)
}
