//! Energy service — per-light consumption samples reported by controllers.

use std::sync::Arc;

use lightkeeper_domain::energy::{EnergyReading, READINGS_PER_LIGHT};
use lightkeeper_domain::error::{LightkeeperError, NotFoundError};
use lightkeeper_domain::id::{DeviceId, LightId, OwnerId};
use lightkeeper_domain::time::Timestamp;

use crate::clock::Clock;
use crate::ports::{EnergyRepository, OwnerRepository};

pub struct EnergyService<OR, ER> {
    owners: Arc<OR>,
    energy: Arc<ER>,
    clock: Arc<dyn Clock>,
}

impl<OR, ER> Clone for EnergyService<OR, ER> {
    fn clone(&self) -> Self {
        Self {
            owners: Arc::clone(&self.owners),
            energy: Arc::clone(&self.energy),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<OR: OwnerRepository, ER: EnergyRepository> EnergyService<OR, ER> {
    pub fn new(owners: Arc<OR>, energy: Arc<ER>, clock: Arc<dyn Clock>) -> Self {
        Self {
            owners,
            energy,
            clock,
        }
    }

    /// Store a reading sent by `device` for one of its owner's lights.
    ///
    /// Readings without a timestamp are stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::Validation`] for a negative or non-finite
    /// value, [`LightkeeperError::NotFound`] when the device is not paired,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn record(
        &self,
        device: &DeviceId,
        light: LightId,
        energy_wh: f64,
        recorded_at: Option<Timestamp>,
    ) -> Result<EnergyReading, LightkeeperError> {
        let owner = self.owners.find_by_device(device).await?.ok_or_else(|| {
            LightkeeperError::from(NotFoundError {
                entity: "Device",
                id: device.to_string(),
            })
        })?;
        let at = recorded_at.unwrap_or_else(|| self.clock.now());
        let reading = EnergyReading::new(owner.id, light, energy_wh, at)?;
        self.energy.record(reading).await
    }

    /// The latest readings of every light of an owner.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unknown owner, or a
    /// storage error from the repository.
    pub async fn readings(&self, owner: OwnerId) -> Result<Vec<EnergyReading>, LightkeeperError> {
        if self.owners.get(owner).await?.is_none() {
            return Err(NotFoundError {
                entity: "Owner",
                id: owner.to_string(),
            }
            .into());
        }
        self.energy.recent_by_owner(owner, READINGS_PER_LIGHT).await
    }
}
