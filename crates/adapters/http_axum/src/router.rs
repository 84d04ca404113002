//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use lightkeeper_app::ports::{
    EnergyRepository, LightRepository, OwnerRepository, RoutineRepository,
};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the JSON API under `/api` next to a `/health` check. Includes a
/// [`TraceLayer`] that logs each HTTP request/response at the `DEBUG` level
/// using the `tracing` ecosystem.
pub fn build<OR, LR, RR, ER>(state: AppState<OR, LR, RR, ER>) -> Router
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
