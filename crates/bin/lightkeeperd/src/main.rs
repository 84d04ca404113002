//! # lightkeeperd — lightkeeper daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters)
//! - Construct the timeout registry and application services
//! - Start the reconciliation sweep and the routine runner
//! - Build the axum router and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use lightkeeper_adapter_email_sendgrid::SendGridNotifier;
use lightkeeper_adapter_http_axum::state::AppState;
use lightkeeper_adapter_storage_sqlite_sqlx::{
    SqliteEnergyRepository, SqliteLightRepository, SqliteOwnerRepository,
    SqliteRoutineRepository,
};
use lightkeeper_app::clock::{Clock, SystemClock};
use lightkeeper_app::periodic::PeriodicTask;
use lightkeeper_app::routine_runner::RoutineRunner;
use lightkeeper_app::services::device_service::DeviceService;
use lightkeeper_app::services::energy_service::EnergyService;
use lightkeeper_app::services::light_service::LightService;
use lightkeeper_app::services::routine_service::RoutineService;
use lightkeeper_app::services::settings_service::SettingsService;
use lightkeeper_app::services::timeout_service::TimeoutService;
use lightkeeper_app::sweep::ReconciliationSweep;
use lightkeeper_app::timeout_registry::TimeoutRegistry;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter =
        EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Database
    let db = lightkeeper_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("failed to open database")?;
    let pool = db.pool().clone();

    // Repositories
    let owners = Arc::new(SqliteOwnerRepository::new(pool.clone()));
    let lights = Arc::new(SqliteLightRepository::new(pool.clone()));
    let routines = Arc::new(SqliteRoutineRepository::new(pool.clone()));
    let energy = Arc::new(SqliteEnergyRepository::new(pool));

    // Notifications
    let notifier = Arc::new(
        SendGridNotifier::new((&config.email).into()).context("failed to build email client")?,
    );

    // Scheduling
    let registry = Arc::new(TimeoutRegistry::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let timeouts = TimeoutService::new(
        Arc::clone(&owners),
        Arc::clone(&lights),
        Arc::clone(&registry),
        Arc::clone(&clock),
    );

    // Services
    let light_service = LightService::new(
        Arc::clone(&owners),
        Arc::clone(&lights),
        timeouts.clone(),
    );
    let settings_service =
        SettingsService::new(Arc::clone(&owners), Arc::clone(&lights), timeouts.clone());
    let routine_service = RoutineService::new(Arc::clone(&owners), Arc::clone(&routines));
    if config.devices.registration_token.is_none() {
        tracing::warn!("no device registration token set, controllers cannot register lights");
    }
    let device_service = DeviceService::new(
        Arc::clone(&owners),
        Arc::clone(&lights),
        Arc::clone(&clock),
        config.devices.registration_token.clone(),
    );
    let energy_service = EnergyService::new(Arc::clone(&owners), energy, clock);

    // Background tasks
    let sweep = ReconciliationSweep::new(
        Arc::clone(&owners),
        Arc::clone(&lights),
        notifier,
        timeouts,
    );
    let sweep_task = PeriodicTask::spawn("sweep", config.sweep_interval(), move || {
        let sweep = sweep.clone();
        async move {
            sweep.run_cycle().await;
        }
    });
    let runner = RoutineRunner::new(owners, routines, light_service.clone());
    let routine_task = PeriodicTask::spawn("routines", config.routine_interval(), move || {
        let runner = runner.clone();
        async move {
            runner.run_cycle().await;
        }
    });

    // HTTP
    let state = AppState::new(
        light_service,
        settings_service,
        routine_service,
        device_service,
        energy_service,
    );
    let app = lightkeeper_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "lightkeeperd listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweep_task.stop().await;
    routine_task.stop().await;
    registry.shutdown().await;
    tracing::info!("lightkeeperd stopped");

    served.context("http server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
