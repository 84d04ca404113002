//! Shared application state for axum handlers.

use std::sync::Arc;

use lightkeeper_app::ports::{
    EnergyRepository, LightRepository, OwnerRepository, RoutineRepository,
};
use lightkeeper_app::services::device_service::DeviceService;
use lightkeeper_app::services::energy_service::EnergyService;
use lightkeeper_app::services::light_service::LightService;
use lightkeeper_app::services::routine_service::RoutineService;
use lightkeeper_app::services::settings_service::SettingsService;

/// Application state shared across all axum handlers.
///
/// Generic over the repository types to avoid dynamic dispatch. `Clone` is
/// implemented manually so the repositories themselves do not need to be
/// `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<OR, LR, RR, ER> {
    pub light_service: Arc<LightService<OR, LR>>,
    pub settings_service: Arc<SettingsService<OR, LR>>,
    pub routine_service: Arc<RoutineService<OR, RR>>,
    pub device_service: Arc<DeviceService<OR, LR>>,
    pub energy_service: Arc<EnergyService<OR, ER>>,
}

impl<OR, LR, RR, ER> Clone for AppState<OR, LR, RR, ER> {
    fn clone(&self) -> Self {
        Self {
            light_service: Arc::clone(&self.light_service),
            settings_service: Arc::clone(&self.settings_service),
            routine_service: Arc::clone(&self.routine_service),
            device_service: Arc::clone(&self.device_service),
            energy_service: Arc::clone(&self.energy_service),
        }
    }
}

impl<OR, LR, RR, ER> AppState<OR, LR, RR, ER>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
    ER: EnergyRepository,
{
    /// Create a new application state from service instances.
    pub fn new(
        light_service: LightService<OR, LR>,
        settings_service: SettingsService<OR, LR>,
        routine_service: RoutineService<OR, RR>,
        device_service: DeviceService<OR, LR>,
        energy_service: EnergyService<OR, ER>,
    ) -> Self {
        Self {
            light_service: Arc::new(light_service),
            settings_service: Arc::new(settings_service),
            routine_service: Arc::new(routine_service),
            device_service: Arc::new(device_service),
            energy_service: Arc::new(energy_service),
        }
    }
}
