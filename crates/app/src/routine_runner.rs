//! Routine runner — fires due wake/sleep triggers once per local day.
//!
//! Runs on its own [`PeriodicTask`](crate::periodic::PeriodicTask), about
//! once a minute. Wake-ups go through the regular ON handler so a routine ON
//! arms the auto-off exactly like a manual ON. Sleeps cancel the same way a
//! manual OFF does but are not recorded as manual.

use std::sync::Arc;

use lightkeeper_domain::error::LightkeeperError;
use lightkeeper_domain::owner::Owner;
use lightkeeper_domain::routine::{RoutineKind, WakeSleepRoutine};

use crate::ports::{LightRepository, OwnerRepository, RoutineRepository};
use crate::services::light_service::LightService;

/// What one routine cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutineReport {
    pub routines_checked: usize,
    pub fired: usize,
    pub errors: usize,
}

pub struct RoutineRunner<OR, LR, RR> {
    owners: Arc<OR>,
    routines: Arc<RR>,
    lights: LightService<OR, LR>,
}

impl<OR, LR, RR> Clone for RoutineRunner<OR, LR, RR> {
    fn clone(&self) -> Self {
        Self {
            owners: Arc::clone(&self.owners),
            routines: Arc::clone(&self.routines),
            lights: self.lights.clone(),
        }
    }
}

impl<OR, LR, RR> RoutineRunner<OR, LR, RR>
where
    OR: OwnerRepository,
    LR: LightRepository,
    RR: RoutineRepository,
{
    pub fn new(owners: Arc<OR>, routines: Arc<RR>, lights: LightService<OR, LR>) -> Self {
        Self {
            owners,
            routines,
            lights,
        }
    }

    /// Check every routine against the owner's local time. Never fails.
    pub async fn run_cycle(&self) -> RoutineReport {
        let mut report = RoutineReport::default();
        let routines = match self.routines.list().await {
            Ok(routines) => routines,
            Err(err) => {
                tracing::error!(error = %err, "routine runner could not list routines");
                report.errors += 1;
                return report;
            }
        };

        for routine in &routines {
            report.routines_checked += 1;
            let owner = match self.owners.get(routine.owner_id).await {
                Ok(Some(owner)) => owner,
                Ok(None) => {
                    tracing::warn!(owner = %routine.owner_id, "routine of unknown owner skipped");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(owner = %routine.owner_id, error = %err, "failed to load routine owner");
                    report.errors += 1;
                    continue;
                }
            };
            for kind in [RoutineKind::WakeUp, RoutineKind::Sleep] {
                match self.fire_if_due(&owner, routine, kind).await {
                    Ok(true) => report.fired += 1,
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(owner = %owner.id, %kind, error = %err, "routine failed, retrying next cycle");
                        report.errors += 1;
                    }
                }
            }
        }
        report
    }

    async fn fire_if_due(
        &self,
        owner: &Owner,
        routine: &WakeSleepRoutine,
        kind: RoutineKind,
    ) -> Result<bool, LightkeeperError> {
        let local_now = self.lights.clock().now().with_timezone(&owner.timezone);
        let Some(trigger) = routine.due(kind, &local_now) else {
            return Ok(false);
        };
        match kind {
            RoutineKind::WakeUp => {
                self.lights.handle_light_on(owner.id, &trigger.light_id).await?;
            }
            RoutineKind::Sleep => {
                self.lights
                    .handle_scheduled_off(owner.id, &trigger.light_id)
                    .await?;
            }
        }
        self.routines
            .mark_fired(owner.id, kind, local_now.date_naive())
            .await?;
        tracing::info!(owner = %owner.id, light = %trigger.light_id, %kind, at = %trigger.at, "routine fired");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        Harness, InMemoryLightRepo, InMemoryOwnerRepo, InMemoryRoutineRepo, light_id,
    };
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;
    use lightkeeper_domain::light::LightStatus;
    use lightkeeper_domain::owner::{OwnerPatch, TimeoutPolicy};
    use lightkeeper_domain::routine::RoutineTrigger;
    use std::time::Duration;

    use crate::ports::{OwnerRepository, RoutineRepository};

    type Runner = RoutineRunner<InMemoryOwnerRepo, InMemoryLightRepo, InMemoryRoutineRepo>;

    /// Harness whose clock starts at 06:59 local time in Manila.
    fn manila_morning() -> (Harness, Runner) {
        let anchor = Tz::Asia__Manila
            .with_ymd_and_hms(2025, 6, 1, 6, 59, 0)
            .unwrap()
            .with_timezone(&Utc);
        let h = Harness::starting_at(anchor);
        let lights = LightService::new(
            Arc::clone(&h.owners),
            Arc::clone(&h.lights),
            h.timeouts.clone(),
        );
        let runner = RoutineRunner::new(Arc::clone(&h.owners), Arc::clone(&h.routines), lights);
        (h, runner)
    }

    async fn manila_owner(h: &Harness) -> Owner {
        let owner = h.owner(TimeoutPolicy::default()).await;
        let patch = OwnerPatch {
            timezone: Some(Tz::Asia__Manila),
            ..OwnerPatch::default()
        };
        h.owners.update(owner.id, patch).await.unwrap()
    }

    fn trigger(at: &str, light: &str) -> Option<RoutineTrigger> {
        Some(RoutineTrigger {
            at: at.parse().unwrap(),
            light_id: light_id(light),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_wake_up_once_per_day() {
        let (h, runner) = manila_morning();
        let owner = manila_owner(&h).await;
        let routine = WakeSleepRoutine::new(owner.id, trigger("07:00", "main"), None).unwrap();
        h.routines.save(routine).await.unwrap();

        let first = runner.run_cycle().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        let second = runner.run_cycle().await;

        assert_eq!(first.fired, 1);
        assert_eq!(second.fired, 0);
        assert_eq!(h.light(owner.id, "main").status, LightStatus::On);
        assert!(h.registry.is_pending(owner.id, &light_id("main")));
        let stored = h.routines.get(owner.id).await.unwrap().unwrap();
        assert_eq!(
            stored.wake_up_last_fired,
            Some(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_fire_outside_tolerance() {
        let (h, runner) = manila_morning();
        let owner = manila_owner(&h).await;
        let routine = WakeSleepRoutine::new(owner.id, trigger("07:30", "main"), None).unwrap();
        h.routines.save(routine).await.unwrap();

        let report = runner.run_cycle().await;

        assert_eq!(report.routines_checked, 1);
        assert_eq!(report.fired, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_turn_light_off_and_cancel_on_sleep() {
        let (h, runner) = manila_morning();
        let owner = manila_owner(&h).await;
        h.light_on_since(owner.id, "bedroom", h.now());
        h.timeouts
            .on_light_turned_on(&owner, &light_id("bedroom"), h.now())
            .await;
        let routine = WakeSleepRoutine::new(owner.id, None, trigger("07:01", "bedroom")).unwrap();
        h.routines.save(routine).await.unwrap();

        let report = runner.run_cycle().await;

        assert_eq!(report.fired, 1);
        let light = h.light(owner.id, "bedroom");
        assert_eq!(light.status, LightStatus::Off);
        assert!(!light.manually_turned_off);
        assert!(!light.auto_turned_off);
        assert!(h.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_skip_routine_of_unknown_owner() {
        let (h, runner) = manila_morning();
        let routine = WakeSleepRoutine::new(
            lightkeeper_domain::id::OwnerId::new(),
            trigger("07:00", "main"),
            None,
        )
        .unwrap();
        h.routines.save(routine).await.unwrap();

        let report = runner.run_cycle().await;

        assert_eq!(report.fired, 0);
        assert_eq!(report.errors, 0);
    }
}
