//! Device service — controller pairing, status polling and self-registration.
//!
//! A controller is paired with one owner by contact address. From then on it
//! polls [`DeviceService::device_status`] to learn the live switch position
//! of the lights wired to it, which is how hardware finds out that an
//! auto-off fired server-side.

use std::collections::BTreeMap;
use std::sync::Arc;

use subtle::ConstantTimeEq;

use lightkeeper_domain::error::{LightkeeperError, NotFoundError};
use lightkeeper_domain::id::{DeviceId, LightId};
use lightkeeper_domain::light::{Light, LightPatch, LightStatus};
use lightkeeper_domain::owner::{Owner, OwnerPatch};

use crate::clock::Clock;
use crate::ports::{LightRepository, OwnerRepository};

/// Outcome of a device-initiated light registration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLight {
    pub light: Light,
    /// `false` when the light already existed.
    pub created: bool,
}

/// Application service for paired controllers.
pub struct DeviceService<OR, LR> {
    owners: Arc<OR>,
    lights: Arc<LR>,
    clock: Arc<dyn Clock>,
    registration_token: Option<Arc<str>>,
}

impl<OR, LR> Clone for DeviceService<OR, LR> {
    fn clone(&self) -> Self {
        Self {
            owners: Arc::clone(&self.owners),
            lights: Arc::clone(&self.lights),
            clock: Arc::clone(&self.clock),
            registration_token: self.registration_token.clone(),
        }
    }
}

impl<OR: OwnerRepository, LR: LightRepository> DeviceService<OR, LR> {
    /// `registration_token` is the shared secret controllers present when
    /// registering lights; `None` disables self-registration.
    pub fn new(
        owners: Arc<OR>,
        lights: Arc<LR>,
        clock: Arc<dyn Clock>,
        registration_token: Option<String>,
    ) -> Self {
        Self {
            owners,
            lights,
            clock,
            registration_token: registration_token.map(Arc::from),
        }
    }

    /// Pair `device` with the owner registered under `email`.
    ///
    /// A device paired elsewhere is moved: the previous owner loses it.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] when no owner uses `email`, or
    /// a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn pair_device(
        &self,
        device: DeviceId,
        email: &str,
    ) -> Result<Owner, LightkeeperError> {
        let owner = self.owners.find_by_email(email).await?.ok_or_else(|| {
            LightkeeperError::from(NotFoundError {
                entity: "Owner",
                id: email.to_string(),
            })
        })?;
        let previous = self.owners.find_by_device(&device).await?;
        if let Some(previous) = previous.filter(|previous| previous.id != owner.id) {
            self.owners
                .update(previous.id, OwnerPatch::unpair_device())
                .await?;
            tracing::info!(previous = %previous.id, "device moved to another owner");
        }
        let paired = self
            .owners
            .update(owner.id, OwnerPatch::pair_device(device, self.clock.now()))
            .await?;
        tracing::info!(owner = %paired.id, "device paired");
        Ok(paired)
    }

    /// The owner a device is paired with.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unpaired device, or a
    /// storage error from the repository.
    pub async fn device_owner(&self, device: &DeviceId) -> Result<Owner, LightkeeperError> {
        self.owners.find_by_device(device).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: device.to_string(),
            }
            .into()
        })
    }

    /// Live switch position of every light wired to `device`.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unpaired device, or a
    /// storage error from the repository.
    pub async fn device_status(
        &self,
        device: &DeviceId,
    ) -> Result<BTreeMap<LightId, LightStatus>, LightkeeperError> {
        let owner = self.device_owner(device).await?;
        let lights = self.lights.list_by_owner(owner.id).await?;
        Ok(lights
            .into_iter()
            .filter(|light| light.device_id.as_ref() == Some(device))
            .map(|light| (light.id, light.status))
            .collect())
    }

    /// Register a light on behalf of a controller.
    ///
    /// The light is created OFF under the device's owner and wired to the
    /// device. An existing light is only rewired when it points elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotConfigured`] when no registration token
    /// is set, [`LightkeeperError::Unauthorized`] for a wrong token,
    /// [`LightkeeperError::NotFound`] for an unpaired device, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self, token))]
    pub async fn register_light(
        &self,
        device: DeviceId,
        light: LightId,
        token: &str,
    ) -> Result<DeviceLight, LightkeeperError> {
        let expected = self
            .registration_token
            .as_deref()
            .ok_or(LightkeeperError::NotConfigured("device registration token"))?;
        if !bool::from(expected.as_bytes().ct_eq(token.as_bytes())) {
            tracing::warn!("device presented a wrong registration token");
            return Err(LightkeeperError::Unauthorized("invalid device token"));
        }
        let owner = self.device_owner(&device).await?;

        if let Some(existing) = self.lights.get(owner.id, &light).await? {
            let light = if existing.device_id.as_ref() == Some(&device) {
                existing
            } else {
                self.lights
                    .write(owner.id, &light, LightPatch::device(Some(device)))
                    .await?
            };
            return Ok(DeviceLight {
                light,
                created: false,
            });
        }

        let mut created = Light::new(owner.id, light);
        created.device_id = Some(device);
        let light = self.lights.create(created).await?;
        tracing::info!(owner = %owner.id, light = %light.id, "light registered by device");
        Ok(DeviceLight {
            light,
            created: true,
        })
    }
}
