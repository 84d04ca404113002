//! Settings service — owner accounts, timer and notification settings.

use std::sync::Arc;

use lightkeeper_domain::error::{LightkeeperError, NotFoundError, ValidationError};
use lightkeeper_domain::id::OwnerId;
use lightkeeper_domain::light::LightPatch;
use lightkeeper_domain::owner::{Owner, OwnerPatch};
use lightkeeper_domain::timeout::TimeoutDuration;

use crate::ports::{LightRepository, OwnerRepository};
use crate::services::timeout_service::TimeoutService;

/// Application service for owner-level settings.
pub struct SettingsService<OR, LR> {
    owners: Arc<OR>,
    lights: Arc<LR>,
    timeouts: TimeoutService<OR, LR>,
}

impl<OR, LR> Clone for SettingsService<OR, LR> {
    fn clone(&self) -> Self {
        Self {
            owners: Arc::clone(&self.owners),
            lights: Arc::clone(&self.lights),
            timeouts: self.timeouts.clone(),
        }
    }
}

impl<OR: OwnerRepository, LR: LightRepository> SettingsService<OR, LR> {
    pub fn new(owners: Arc<OR>, lights: Arc<LR>, timeouts: TimeoutService<OR, LR>) -> Self {
        Self {
            owners,
            lights,
            timeouts,
        }
    }

    /// Create a new owner after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, owner), fields(owner = %owner.id))]
    pub async fn create_owner(&self, owner: Owner) -> Result<Owner, LightkeeperError> {
        owner.validate()?;
        self.owners.create(owner).await
    }

    /// Look up an owner by id.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] when no owner with `id` exists,
    /// or a storage error from the repository.
    pub async fn get_owner(&self, id: OwnerId) -> Result<Owner, LightkeeperError> {
        self.owners.get(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Owner",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Set the auto-off timer from clock-style components.
    ///
    /// Setting a timer always enables the policy. Every ON light is re-armed
    /// against the new duration, or switched off if already past it.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::Validation`] for out-of-range components
    /// or a zero total, [`LightkeeperError::NotFound`] for an unknown owner,
    /// or a storage error from the owner write.
    #[tracing::instrument(skip(self))]
    pub async fn handle_timeout_change(
        &self,
        owner: OwnerId,
        hours: u32,
        minutes: u32,
        seconds: u32,
    ) -> Result<Owner, LightkeeperError> {
        let timeout = TimeoutDuration::from_hms(hours, minutes, seconds)?;
        self.get_owner(owner).await?;
        let updated = self
            .owners
            .update(owner, OwnerPatch::timeout(timeout))
            .await?;
        let rearmed = self
            .timeouts
            .on_timeout_duration_changed(owner, timeout)
            .await;
        tracing::info!(timeout_secs = timeout.as_secs(), rearmed, "auto-off timer updated");
        Ok(updated)
    }

    /// Enable or disable the auto-timeout policy.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unknown owner, or a
    /// storage error from the owner write.
    #[tracing::instrument(skip(self))]
    pub async fn handle_policy_toggle(
        &self,
        owner: OwnerId,
        enabled: bool,
    ) -> Result<Owner, LightkeeperError> {
        self.get_owner(owner).await?;
        let updated = self
            .owners
            .update(owner, OwnerPatch::policy_enabled(enabled))
            .await?;
        let affected = self.timeouts.on_policy_toggled(owner, updated.policy).await;
        tracing::info!(enabled, affected, "auto-timeout policy toggled");
        Ok(updated)
    }

    /// Set the "on too long" notification window on every light of the owner.
    ///
    /// Returns the number of lights updated.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroNotifyDuration`] for zero,
    /// [`LightkeeperError::NotFound`] when the owner is unknown or has no
    /// lights, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_notify_duration(
        &self,
        owner: OwnerId,
        secs: u32,
    ) -> Result<usize, LightkeeperError> {
        if secs == 0 {
            return Err(ValidationError::ZeroNotifyDuration.into());
        }
        self.get_owner(owner).await?;
        let lights = self.lights.list_by_owner(owner).await?;
        if lights.is_empty() {
            return Err(NotFoundError {
                entity: "Lights of owner",
                id: owner.to_string(),
            }
            .into());
        }
        for light in &lights {
            self.lights
                .write(owner, &light.id, LightPatch::notify_after(Some(secs)))
                .await?;
        }
        Ok(lights.len())
    }

    /// Current notification window: the first light's override, else the
    /// owner default.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] for an unknown owner, or a
    /// storage error from the repository.
    pub async fn notify_duration(&self, owner: OwnerId) -> Result<u32, LightkeeperError> {
        let found = self.get_owner(owner).await?;
        let lights = self.lights.list_by_owner(owner).await?;
        Ok(lights
            .first()
            .and_then(|light| light.notify_after_secs)
            .unwrap_or(found.policy.notify_before_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, InMemoryLightRepo, InMemoryOwnerRepo, light_id};
    use chrono::TimeDelta;
    use lightkeeper_domain::light::LightStatus;
    use lightkeeper_domain::owner::TimeoutPolicy;
    use std::time::Duration;

    fn service(h: &Harness) -> SettingsService<InMemoryOwnerRepo, InMemoryLightRepo> {
        SettingsService::new(
            Arc::clone(&h.owners),
            Arc::clone(&h.lights),
            h.timeouts.clone(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_owner_with_invalid_email() {
        let h = Harness::new();
        let mut owner = Owner::builder().email("ana@example.com").build().unwrap();
        owner.email = "nope".into();

        let result = service(&h).create_owner(owner).await;

        assert!(matches!(
            result,
            Err(LightkeeperError::Validation(ValidationError::InvalidEmail(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_out_of_range_timer_components() {
        let h = Harness::new();
        let owner = h.owner(TimeoutPolicy::default()).await;
        let svc = service(&h);

        assert!(matches!(
            svc.handle_timeout_change(owner.id, 0, 0, 0).await,
            Err(LightkeeperError::Validation(ValidationError::ZeroTimeout))
        ));
        assert!(matches!(
            svc.handle_timeout_change(owner.id, 0, 61, 0).await,
            Err(LightkeeperError::Validation(ValidationError::MinutesOutOfRange(61)))
        ));
        assert_eq!(svc.get_owner(owner.id).await.unwrap().policy.timeout.as_secs(), 600);
    }

    #[tokio::test(start_paused = true)]
    async fn should_enable_policy_and_rearm_when_timer_changes() {
        let h = Harness::new();
        let owner = h
            .owner(TimeoutPolicy {
                enabled: false,
                ..TimeoutPolicy::default()
            })
            .await;
        h.light_on_since(owner.id, "main", h.now() - TimeDelta::seconds(30));
        let svc = service(&h);

        let updated = svc.handle_timeout_change(owner.id, 0, 2, 0).await.unwrap();

        assert!(updated.policy.enabled);
        assert_eq!(updated.policy.timeout.as_secs(), 120);
        assert_eq!(
            h.registry.remaining(owner.id, &light_id("main")),
            Some(Duration::from_secs(90))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_return_not_found_when_changing_timer_of_unknown_owner() {
        let h = Harness::new();

        let result = service(&h)
            .handle_timeout_change(OwnerId::new(), 0, 5, 0)
            .await;

        assert!(matches!(result, Err(LightkeeperError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn should_disable_policy_and_cancel_everything() {
        let h = Harness::new();
        let owner = h.owner(TimeoutPolicy::default()).await;
        h.light_on_since(owner.id, "main", h.now());
        h.timeouts
            .on_light_turned_on(&owner, &light_id("main"), h.now())
            .await;

        let updated = service(&h)
            .handle_policy_toggle(owner.id, false)
            .await
            .unwrap();

        assert!(!updated.policy.enabled);
        assert!(h.registry.is_empty());
        tokio::time::sleep(Duration::from_secs(700)).await;
        assert_eq!(h.light(owner.id, "main").status, LightStatus::On);
    }

    #[tokio::test(start_paused = true)]
    async fn should_write_notify_duration_to_every_light() {
        let h = Harness::new();
        let owner = h.owner(TimeoutPolicy::default()).await;
        h.light_on_since(owner.id, "main", h.now());
        h.light_on_since(owner.id, "desk", h.now());
        let svc = service(&h);

        assert_eq!(svc.notify_duration(owner.id).await.unwrap(), 300);
        assert_eq!(svc.set_notify_duration(owner.id, 1200).await.unwrap(), 2);

        assert_eq!(h.light(owner.id, "main").notify_after_secs, Some(1200));
        assert_eq!(h.light(owner.id, "desk").notify_after_secs, Some(1200));
        assert_eq!(svc.notify_duration(owner.id).await.unwrap(), 1200);
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_notify_duration_without_lights_or_zero() {
        let h = Harness::new();
        let owner = h.owner(TimeoutPolicy::default()).await;
        let svc = service(&h);

        assert!(matches!(
            svc.set_notify_duration(owner.id, 60).await,
            Err(LightkeeperError::NotFound(_))
        ));
        assert!(matches!(
            svc.set_notify_duration(owner.id, 0).await,
            Err(LightkeeperError::Validation(ValidationError::ZeroNotifyDuration))
        ));
    }
}
