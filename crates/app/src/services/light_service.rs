//! Light service — registration, listing and ON/OFF commands.

use std::sync::Arc;

use lightkeeper_domain::error::{LightkeeperError, NotFoundError};
use lightkeeper_domain::id::{LightId, OwnerId};
use lightkeeper_domain::light::{Light, LightPatch, LightStatus, TimeoutInfo};
use lightkeeper_domain::owner::Owner;

use crate::clock::Clock;
use crate::ports::{LightRepository, OwnerRepository};
use crate::services::timeout_service::TimeoutService;

/// A light together with its live auto-off countdown, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LightView {
    pub light: Light,
    pub timeout: Option<TimeoutInfo>,
}

/// Application service for light registration and switching.
pub struct LightService<OR, LR> {
    owners: Arc<OR>,
    lights: Arc<LR>,
    timeouts: TimeoutService<OR, LR>,
}

impl<OR, LR> Clone for LightService<OR, LR> {
    fn clone(&self) -> Self {
        Self {
            owners: Arc::clone(&self.owners),
            lights: Arc::clone(&self.lights),
            timeouts: self.timeouts.clone(),
        }
    }
}

impl<OR: OwnerRepository, LR: LightRepository> LightService<OR, LR> {
    pub fn new(owners: Arc<OR>, lights: Arc<LR>, timeouts: TimeoutService<OR, LR>) -> Self {
        Self {
            owners,
            lights,
            timeouts,
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        self.timeouts.clock()
    }

    async fn owner(&self, id: OwnerId) -> Result<Owner, LightkeeperError> {
        self.owners.get(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Owner",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Register a light for an owner, or rename it when it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unknown owner, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn register_light(
        &self,
        owner: OwnerId,
        light: LightId,
        name: Option<String>,
    ) -> Result<Light, LightkeeperError> {
        self.owner(owner).await?;
        if self.lights.get(owner, &light).await?.is_some() {
            return self.lights.write(owner, &light, LightPatch::name(name)).await;
        }
        let mut created = Light::new(owner, light);
        created.name = name;
        self.lights.create(created).await
    }

    /// List the lights of an owner with their countdowns.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unknown owner, or a
    /// storage error from the repository.
    pub async fn list_lights(&self, owner: OwnerId) -> Result<Vec<LightView>, LightkeeperError> {
        let owner = self.owner(owner).await?;
        let now = self.timeouts.clock().now();
        let lights = self.lights.list_by_owner(owner.id).await?;
        Ok(lights
            .into_iter()
            .map(|light| LightView {
                timeout: light.timeout_info(&owner.policy, now),
                light,
            })
            .collect())
    }

    /// Get one light with its countdown.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] when the owner or the light is
    /// unknown, or a storage error from the repository.
    pub async fn get_light(
        &self,
        owner: OwnerId,
        light: &LightId,
    ) -> Result<LightView, LightkeeperError> {
        let owner = self.owner(owner).await?;
        let found = self.lights.get(owner.id, light).await?.ok_or_else(|| {
            LightkeeperError::from(NotFoundError {
                entity: "Light",
                id: light.to_string(),
            })
        })?;
        Ok(LightView {
            timeout: found.timeout_info(&owner.policy, self.timeouts.clock().now()),
            light: found,
        })
    }

    /// Switch a light ON and arm its auto-off.
    ///
    /// Unknown lights are created on the fly, as devices report themselves
    /// through their first command.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unknown owner, or the
    /// storage error of the status write. Hint persistence failures are only
    /// logged.
    #[tracing::instrument(skip(self))]
    pub async fn handle_light_on(
        &self,
        owner: OwnerId,
        light: &LightId,
    ) -> Result<Light, LightkeeperError> {
        let owner = self.owner(owner).await?;
        let at = self.timeouts.clock().now();
        let updated = self
            .lights
            .write(owner.id, light, LightPatch::turn_on(at))
            .await?;
        let armed = self.timeouts.on_light_turned_on(&owner, light, at).await;
        tracing::info!(armed, "light turned on");
        Ok(updated)
    }

    /// Switch a light OFF by hand, cancelling any pending auto-off first.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unknown owner, or the
    /// storage error of the status write.
    #[tracing::instrument(skip(self))]
    pub async fn handle_light_off(
        &self,
        owner: OwnerId,
        light: &LightId,
    ) -> Result<Light, LightkeeperError> {
        let owner = self.owner(owner).await?;
        self.timeouts.on_light_turned_off(owner.id, light);
        let at = self.timeouts.clock().now();
        let updated = self
            .lights
            .write(owner.id, light, LightPatch::manual_off(at))
            .await?;
        tracing::info!("light turned off manually");
        Ok(updated)
    }

    /// Switch a light OFF on behalf of a sleep routine.
    ///
    /// Cancels any pending auto-off like a manual OFF, but leaves
    /// `manually_turned_off` untouched: nobody pressed the switch.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unknown owner, or the
    /// storage error of the status write.
    #[tracing::instrument(skip(self))]
    pub async fn handle_scheduled_off(
        &self,
        owner: OwnerId,
        light: &LightId,
    ) -> Result<Light, LightkeeperError> {
        let owner = self.owner(owner).await?;
        self.timeouts.on_light_turned_off(owner.id, light);
        let at = self.timeouts.clock().now();
        let updated = self
            .lights
            .write(owner.id, light, LightPatch::scheduled_off(at))
            .await?;
        tracing::info!("light turned off by routine");
        Ok(updated)
    }

    /// Dispatch a control command to [`handle_light_on`](Self::handle_light_on)
    /// or [`handle_light_off`](Self::handle_light_off).
    ///
    /// # Errors
    ///
    /// See the two handlers.
    pub async fn set_status(
        &self,
        owner: OwnerId,
        light: &LightId,
        status: LightStatus,
    ) -> Result<Light, LightkeeperError> {
        match status {
            LightStatus::On => self.handle_light_on(owner, light).await,
            LightStatus::Off => self.handle_light_off(owner, light).await,
        }
    }
}
