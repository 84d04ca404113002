//! End-to-end timelines over the in-memory ports: request handlers, the
//! registry and the sweep cooperating on paused tokio time.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use lightkeeper_domain::light::LightStatus;
use lightkeeper_domain::owner::TimeoutPolicy;
use lightkeeper_domain::timeout::TimeoutDuration;
use tokio::time::Instant;

use crate::periodic::PeriodicTask;
use crate::services::light_service::LightService;
use crate::services::settings_service::SettingsService;
use crate::sweep::ReconciliationSweep;
use crate::testing::{
    Harness, InMemoryLightRepo, InMemoryOwnerRepo, SpyNotifier, epoch, light_id,
};

struct World {
    t0: Instant,
    h: Harness,
    lights: LightService<InMemoryOwnerRepo, InMemoryLightRepo>,
    settings: SettingsService<InMemoryOwnerRepo, InMemoryLightRepo>,
    sweep: ReconciliationSweep<InMemoryOwnerRepo, InMemoryLightRepo, SpyNotifier>,
}

impl World {
    fn new() -> Self {
        let h = Harness::new();
        let lights = LightService::new(
            Arc::clone(&h.owners),
            Arc::clone(&h.lights),
            h.timeouts.clone(),
        );
        let settings = SettingsService::new(
            Arc::clone(&h.owners),
            Arc::clone(&h.lights),
            h.timeouts.clone(),
        );
        let sweep = ReconciliationSweep::new(
            Arc::clone(&h.owners),
            Arc::clone(&h.lights),
            Arc::clone(&h.notifier),
            h.timeouts.clone(),
        );
        Self {
            t0: Instant::now(),
            h,
            lights,
            settings,
            sweep,
        }
    }

    /// Sleep until `secs` seconds after the start of the timeline.
    async fn at(&self, secs: u64) {
        tokio::time::sleep_until(self.t0 + Duration::from_secs(secs)).await;
    }
}

fn ten_minutes_notify_at_five() -> TimeoutPolicy {
    TimeoutPolicy {
        enabled: true,
        timeout: TimeoutDuration::from_secs(600).unwrap(),
        notify_before_secs: 300,
    }
}

#[tokio::test(start_paused = true)]
async fn should_notify_at_window_then_turn_off_at_timeout() {
    let w = World::new();
    let owner = w.h.owner(ten_minutes_notify_at_five()).await;
    let main = light_id("main");

    w.lights.handle_light_on(owner.id, &main).await.unwrap();

    w.at(300).await;
    let report = w.sweep.run_cycle().await;
    assert_eq!(report.notified, 1);
    assert_eq!(w.h.notifier.sent().len(), 1);
    assert!(w.h.light(owner.id, "main").notification_sent);

    w.at(601).await;
    let light = w.h.light(owner.id, "main");
    assert_eq!(light.status, LightStatus::Off);
    assert!(light.auto_turned_off);
    assert!(!light.notification_sent);
    assert!(!w.h.registry.is_pending(owner.id, &main));
    assert_eq!(w.h.notifier.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn should_keep_light_on_after_policy_disabled() {
    let w = World::new();
    let owner = w.h.owner(ten_minutes_notify_at_five()).await;
    let main = light_id("main");
    w.lights.handle_light_on(owner.id, &main).await.unwrap();

    w.at(100).await;
    w.settings
        .handle_policy_toggle(owner.id, false)
        .await
        .unwrap();
    assert!(w.h.registry.is_empty());

    w.at(700).await;
    w.sweep.run_cycle().await;
    let light = w.h.light(owner.id, "main");
    assert_eq!(light.status, LightStatus::On);
    assert!(!light.auto_turned_off);
    assert!(light.timeout_deadline.is_none());
}

#[tokio::test(start_paused = true)]
async fn should_cancel_auto_off_on_manual_off() {
    let w = World::new();
    let owner = w.h.owner(ten_minutes_notify_at_five()).await;
    let main = light_id("main");
    w.lights.handle_light_on(owner.id, &main).await.unwrap();

    w.at(50).await;
    w.lights.handle_light_off(owner.id, &main).await.unwrap();
    assert!(w.h.registry.is_empty());
    let writes = w.h.lights.writes();

    w.at(650).await;
    let light = w.h.light(owner.id, "main");
    assert_eq!(light.status, LightStatus::Off);
    assert!(light.manually_turned_off);
    assert!(!light.auto_turned_off);
    assert!(!light.notification_sent);
    assert_eq!(light.turned_off_at, Some(epoch() + TimeDelta::seconds(50)));
    assert_eq!(w.h.lights.writes(), writes);
}

#[tokio::test(start_paused = true)]
async fn should_turn_off_after_restart_through_periodic_sweep() {
    let w = World::new();
    let owner = w.h.owner(ten_minutes_notify_at_five()).await;
    // persisted state from before a restart: ON for 590 s, nothing armed
    w.h.light_on_since(owner.id, "main", w.h.now() - TimeDelta::seconds(590));

    let sweep = w.sweep.clone();
    let task = PeriodicTask::spawn("sweep", Duration::from_secs(30), move || {
        let sweep = sweep.clone();
        async move {
            sweep.run_cycle().await;
        }
    });

    w.at(5).await;
    assert_eq!(w.h.notifier.sent().len(), 1);
    assert!(w.h.registry.is_pending(owner.id, &light_id("main")));

    w.at(11).await;
    assert_eq!(w.h.light(owner.id, "main").status, LightStatus::Off);

    task.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_rearm_lights_when_timer_shortened() {
    let w = World::new();
    let owner = w.h.owner(ten_minutes_notify_at_five()).await;
    w.lights
        .handle_light_on(owner.id, &light_id("main"))
        .await
        .unwrap();

    w.at(60).await;
    w.settings
        .handle_timeout_change(owner.id, 0, 2, 0)
        .await
        .unwrap();

    w.at(119).await;
    assert_eq!(w.h.light(owner.id, "main").status, LightStatus::On);
    w.at(121).await;
    assert_eq!(w.h.light(owner.id, "main").status, LightStatus::Off);
}
