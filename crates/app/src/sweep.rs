//! Reconciliation sweep — periodic full scan bringing the registry in line
//! with persisted light state.
//!
//! A cycle reads the clock once and, for every ON light of every owner whose
//! policy is enabled, either expires the light, re-arms it with its remaining
//! time, or (when due) sends the one "on too long" notice. It is what turns
//! lights off after a restart and what repairs drift or failed writes.
//!
//! Failures are contained per owner and per light: they are logged, counted
//! in the [`SweepReport`], and the cycle carries on.

use std::sync::Arc;

use chrono::TimeDelta;
use lightkeeper_domain::error::LightkeeperError;
use lightkeeper_domain::light::{Light, LightPatch};
use lightkeeper_domain::owner::Owner;
use lightkeeper_domain::time::Timestamp;

use crate::ports::{LightOnNotice, LightRepository, Notifier, OwnerRepository};
use crate::services::timeout_service::TimeoutService;

/// Deadline hints closer than this to the computed deadline are left alone.
const HINT_DRIFT_TOLERANCE_MS: i64 = 1_000;

/// What one sweep cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub owners_scanned: usize,
    pub lights_scanned: usize,
    pub expired: usize,
    pub scheduled: usize,
    pub notified: usize,
    pub markers_cleared: usize,
    pub errors: usize,
}

pub struct ReconciliationSweep<OR, LR, N> {
    owners: Arc<OR>,
    lights: Arc<LR>,
    notifier: Arc<N>,
    timeouts: TimeoutService<OR, LR>,
}

impl<OR, LR, N> Clone for ReconciliationSweep<OR, LR, N> {
    fn clone(&self) -> Self {
        Self {
            owners: Arc::clone(&self.owners),
            lights: Arc::clone(&self.lights),
            notifier: Arc::clone(&self.notifier),
            timeouts: self.timeouts.clone(),
        }
    }
}

impl<OR, LR, N> ReconciliationSweep<OR, LR, N>
where
    OR: OwnerRepository,
    LR: LightRepository,
    N: Notifier,
{
    pub fn new(
        owners: Arc<OR>,
        lights: Arc<LR>,
        notifier: Arc<N>,
        timeouts: TimeoutService<OR, LR>,
    ) -> Self {
        Self {
            owners,
            lights,
            notifier,
            timeouts,
        }
    }

    /// Run one full cycle. Never fails; problems end up in the report.
    pub async fn run_cycle(&self) -> SweepReport {
        let now = self.timeouts.clock().now();
        let mut report = SweepReport::default();

        let owners = match self.owners.list().await {
            Ok(owners) => owners,
            Err(err) => {
                tracing::error!(error = %err, "sweep could not list owners");
                report.errors += 1;
                return report;
            }
        };

        for owner in owners.iter().filter(|owner| owner.policy.enabled) {
            report.owners_scanned += 1;
            let lights = match self.lights.list_by_owner(owner.id).await {
                Ok(lights) => lights,
                Err(err) => {
                    tracing::warn!(owner = %owner.id, error = %err, "sweep could not list lights");
                    report.errors += 1;
                    continue;
                }
            };
            for light in lights.iter().filter(|light| light.status.is_on()) {
                report.lights_scanned += 1;
                if let Err(err) = self.reconcile(owner, light, now, &mut report).await {
                    tracing::warn!(owner = %owner.id, light = %light.id, error = %err, "sweep failed for light");
                    report.errors += 1;
                }
            }
        }

        if report.expired + report.notified + report.errors > 0 {
            tracing::info!(?report, "sweep cycle finished");
        } else {
            tracing::debug!(?report, "sweep cycle finished");
        }
        report
    }

    async fn reconcile(
        &self,
        owner: &Owner,
        light: &Light,
        now: Timestamp,
        report: &mut SweepReport,
    ) -> Result<(), LightkeeperError> {
        if light.manually_turned_off {
            match self
                .lights
                .write(owner.id, &light.id, LightPatch::clear_manual_marker())
                .await
            {
                Ok(_) => report.markers_cleared += 1,
                Err(err) => {
                    tracing::warn!(owner = %owner.id, light = %light.id, error = %err, "failed to clear stray manual-off marker");
                    report.errors += 1;
                }
            }
        }

        let Some(since) = light.last_transition else {
            return self.reconcile_from_hint(owner, light, now, report).await;
        };

        let timeout = owner.policy.timeout.as_time_delta();
        let elapsed = now - since;
        if elapsed >= timeout {
            if self.timeouts.expire_now(owner.id, &light.id).await? {
                report.expired += 1;
            }
            return Ok(());
        }

        let deadline = since + timeout;
        let hint = light
            .timeout_deadline
            .is_none_or(|hint| (hint - deadline).num_milliseconds().abs() >= HINT_DRIFT_TOLERANCE_MS)
            .then_some(deadline);
        if self
            .timeouts
            .arm(owner.id, &light.id, timeout - elapsed, hint)
            .await
        {
            report.scheduled += 1;
        }

        let notify_after = TimeDelta::seconds(i64::from(light.effective_notify_after(&owner.policy)));
        if !light.notification_sent && elapsed >= notify_after {
            self.send_notice(owner, light, since, elapsed, now).await?;
            report.notified += 1;
        }
        Ok(())
    }

    /// ON light without a transition time: fall back to the deadline hint.
    async fn reconcile_from_hint(
        &self,
        owner: &Owner,
        light: &Light,
        now: Timestamp,
        report: &mut SweepReport,
    ) -> Result<(), LightkeeperError> {
        let Some(deadline) = light.timeout_deadline else {
            tracing::debug!(owner = %owner.id, light = %light.id, "on light has neither transition time nor hint");
            return Ok(());
        };
        let remaining = deadline - now;
        if remaining <= TimeDelta::zero() {
            if self.timeouts.expire_now(owner.id, &light.id).await? {
                report.expired += 1;
            }
        } else if self.timeouts.arm(owner.id, &light.id, remaining, None).await {
            report.scheduled += 1;
        }
        Ok(())
    }

    /// Dispatch the notice, then mark the light notified. A failed dispatch
    /// is logged and still marks the light.
    async fn send_notice(
        &self,
        owner: &Owner,
        light: &Light,
        since: Timestamp,
        elapsed: TimeDelta,
        now: Timestamp,
    ) -> Result<(), LightkeeperError> {
        let notice = LightOnNotice {
            owner_id: owner.id,
            email: owner.email.clone(),
            display_name: owner.display_name().to_string(),
            light_id: light.id.clone(),
            light_name: light.name.clone(),
            turned_on_at: since,
            on_for_secs: u64::try_from(elapsed.num_seconds()).unwrap_or_default(),
        };
        match self.notifier.notify(notice).await {
            Ok(()) => {
                tracing::info!(owner = %owner.id, light = %light.id, on_for_secs = elapsed.num_seconds(), "on-too-long notice sent");
            }
            Err(err) => {
                tracing::warn!(owner = %owner.id, light = %light.id, error = %err, "failed to send on-too-long notice");
            }
        }
        self.lights
            .write(owner.id, &light.id, LightPatch::notified(now))
            .await?;
        Ok(())
    }
}
