//! Scheduling facade — the business rules of *when* to arm or cancel an
//! auto-off.
//!
//! Request handlers, the routine runner and the reconciliation sweep all go
//! through [`TimeoutService`]; nothing else talks to the
//! [`TimeoutRegistry`] directly. Store failures while persisting a deadline
//! hint are logged and never undo the in-memory schedule.

use std::future::Future;
use std::sync::Arc;

use chrono::TimeDelta;
use lightkeeper_domain::error::LightkeeperError;
use lightkeeper_domain::id::{LightId, OwnerId};
use lightkeeper_domain::light::LightPatch;
use lightkeeper_domain::owner::{Owner, TimeoutPolicy};
use lightkeeper_domain::time::Timestamp;
use lightkeeper_domain::timeout::TimeoutDuration;

use crate::clock::Clock;
use crate::ports::{LightRepository, OwnerRepository};
use crate::timeout_registry::TimeoutRegistry;

/// Facade over the [`TimeoutRegistry`] and the light store.
pub struct TimeoutService<OR, LR> {
    owners: Arc<OR>,
    lights: Arc<LR>,
    registry: Arc<TimeoutRegistry>,
    clock: Arc<dyn Clock>,
}

impl<OR, LR> Clone for TimeoutService<OR, LR> {
    fn clone(&self) -> Self {
        Self {
            owners: Arc::clone(&self.owners),
            lights: Arc::clone(&self.lights),
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<OR: OwnerRepository, LR: LightRepository> TimeoutService<OR, LR> {
    pub fn new(
        owners: Arc<OR>,
        lights: Arc<LR>,
        registry: Arc<TimeoutRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            owners,
            lights,
            registry,
            clock,
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TimeoutRegistry> {
        &self.registry
    }

    /// A light was switched ON at `at`: arm the full timeout when the
    /// owner's policy is enabled. Returns whether an auto-off was armed.
    #[tracing::instrument(skip(self, owner), fields(owner = %owner.id))]
    pub async fn on_light_turned_on(&self, owner: &Owner, light: &LightId, at: Timestamp) -> bool {
        if !owner.policy.enabled {
            tracing::debug!("auto-timeout disabled, light stays on");
            return false;
        }
        let timeout = owner.policy.timeout.as_time_delta();
        let remaining = at + timeout - self.clock.now();
        self.arm(owner.id, light, remaining, Some(at + timeout)).await
    }

    /// A light was switched OFF: cancel whatever was pending, regardless of
    /// policy.
    pub fn on_light_turned_off(&self, owner: OwnerId, light: &LightId) -> bool {
        self.registry.cancel(owner, light)
    }

    /// Re-arm every ON light of `owner` against a new timeout. Lights already
    /// past the new deadline are switched off right away.
    ///
    /// Returns how many lights were armed or expired.
    #[tracing::instrument(skip(self))]
    pub async fn on_timeout_duration_changed(
        &self,
        owner: OwnerId,
        timeout: TimeoutDuration,
    ) -> usize {
        self.registry.cancel_all(owner);
        let lights = match self.lights.list_by_owner(owner).await {
            Ok(lights) => lights,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list lights for rescheduling");
                return 0;
            }
        };

        let now = self.clock.now();
        let mut handled = 0;
        for light in lights.iter().filter(|light| light.status.is_on()) {
            let Some(since) = light.last_transition else {
                tracing::debug!(light = %light.id, "light on without transition time, left to the sweep");
                continue;
            };
            let deadline = since + timeout.as_time_delta();
            let remaining = deadline - now;
            if remaining <= TimeDelta::zero() {
                match self.expire(owner, &light.id).await {
                    Ok(_) => handled += 1,
                    Err(err) => {
                        tracing::warn!(light = %light.id, error = %err, "failed to expire light");
                    }
                }
            } else if self.arm(owner, &light.id, remaining, Some(deadline)).await {
                handled += 1;
            }
        }
        handled
    }

    /// Apply a freshly persisted policy. Disabling cancels everything and
    /// clears the deadline hints; enabling re-arms with the current timeout.
    #[tracing::instrument(skip(self))]
    pub async fn on_policy_toggled(&self, owner: OwnerId, policy: TimeoutPolicy) -> usize {
        if policy.enabled {
            return self.on_timeout_duration_changed(owner, policy.timeout).await;
        }

        let cancelled = self.registry.cancel_all(owner);
        match self.lights.list_by_owner(owner).await {
            Ok(lights) => {
                for light in lights.iter().filter(|light| light.timeout_deadline.is_some()) {
                    self.persist_hint(owner, &light.id, None).await;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to list lights for clearing deadline hints");
            }
        }
        cancelled
    }

    /// Schedule an auto-off in `remaining` and, when `hint` is given, persist
    /// it as the light's deadline hint. Returns whether the registry accepted
    /// the delay.
    pub async fn arm(
        &self,
        owner: OwnerId,
        light: &LightId,
        remaining: TimeDelta,
        hint: Option<Timestamp>,
    ) -> bool {
        let armed =
            self.registry
                .schedule(owner, light.clone(), remaining, self.turn_off_action(owner, light));
        if armed && hint.is_some() {
            self.persist_hint(owner, light, hint).await;
        }
        armed
    }

    /// Turn a light off on behalf of the timeout engine.
    ///
    /// Re-reads the light and writes only if it is still ON, so a concurrent
    /// manual OFF is never clobbered and repeated calls are no-ops. Returns
    /// whether a write happened.
    ///
    /// # Errors
    ///
    /// Returns the storage error of the read or the write.
    pub async fn expire(&self, owner: OwnerId, light: &LightId) -> Result<bool, LightkeeperError> {
        let Some(current) = self.lights.get(owner, light).await? else {
            tracing::debug!(%owner, %light, "light vanished before auto-off");
            return Ok(false);
        };
        if !current.status.is_on() {
            tracing::debug!(%owner, %light, "light already off");
            return Ok(false);
        }
        self.lights
            .write(owner, light, LightPatch::auto_off(self.clock.now()))
            .await?;
        tracing::info!(%owner, %light, "light turned off automatically");
        Ok(true)
    }

    /// Cancel anything pending for the light, then [`expire`](Self::expire) it.
    ///
    /// # Errors
    ///
    /// Returns the storage error of the read or the write.
    pub async fn expire_now(
        &self,
        owner: OwnerId,
        light: &LightId,
    ) -> Result<bool, LightkeeperError> {
        self.registry.cancel(owner, light);
        self.expire(owner, light).await
    }

    /// Look up the owner's current policy; used by the pending action so it
    /// honours a policy disabled after it was armed.
    async fn policy_enabled(&self, owner: OwnerId) -> bool {
        match self.owners.get(owner).await {
            Ok(Some(owner)) => owner.policy.enabled,
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(%owner, error = %err, "failed to read owner policy, expiring anyway");
                true
            }
        }
    }

    fn turn_off_action(
        &self,
        owner: OwnerId,
        light: &LightId,
    ) -> impl Future<Output = ()> + Send + use<OR, LR> {
        let service = self.clone();
        let light = light.clone();
        async move {
            if !service.policy_enabled(owner).await {
                tracing::debug!(%owner, %light, "policy disabled since arming, skipping auto-off");
                return;
            }
            if let Err(err) = service.expire(owner, &light).await {
                tracing::warn!(%owner, %light, error = %err, "auto-off failed, the sweep will retry");
            }
        }
    }

    async fn persist_hint(&self, owner: OwnerId, light: &LightId, hint: Option<Timestamp>) {
        if let Err(err) = self
            .lights
            .write(owner, light, LightPatch::deadline(hint))
            .await
        {
            tracing::warn!(%owner, %light, error = %err, "failed to persist deadline hint");
        }
    }
}
