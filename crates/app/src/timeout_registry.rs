//! Timeout registry — at most one pending auto-off action per light.
//!
//! Every pending action is a tracked tokio task waiting on a sleep that can
//! be cancelled through its own [`CancellationToken`]. The map from
//! `(owner, light)` to the live action is guarded by a single mutex that is
//! only held for the map mutation itself, never across an `.await`.
//!
//! Each installed action carries a generation number. The task removes its
//! own entry when it exits (fired, cancelled or panicked), but only while the
//! entry still carries its generation, so a task that lost a replace race can
//! never evict its successor.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use lightkeeper_domain::id::{LightId, OwnerId};
use lightkeeper_domain::timeout::MAX_SCHEDULE_DELAY_SECS;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

type PendingMap = HashMap<OwnerId, HashMap<LightId, PendingAction>>;

struct PendingAction {
    generation: u64,
    token: CancellationToken,
    fires_at: Instant,
}

/// Owner of every pending auto-off action in the process.
pub struct TimeoutRegistry {
    pending: Arc<Mutex<PendingMap>>,
    next_generation: AtomicU64,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Default for TimeoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Run `action` for `(owner, light)` once `delay` has elapsed, replacing
    /// whatever was pending for that light.
    ///
    /// Delays outside `(0, 24h]` are ignored and `false` is returned; the
    /// registry is left untouched in that case. Scheduling after
    /// [`shutdown`](Self::shutdown) is ignored as well.
    pub fn schedule<F>(&self, owner: OwnerId, light: LightId, delay: TimeDelta, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(wait) = schedulable(delay) else {
            tracing::debug!(%owner, %light, delay_ms = delay.num_milliseconds(), "delay out of range, not scheduling");
            return false;
        };
        if self.tracker.is_closed() {
            tracing::debug!(%owner, %light, "registry shut down, not scheduling");
            return false;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        let replaced = {
            let mut pending = lock(&self.pending);
            pending.entry(owner).or_default().insert(
                light.clone(),
                PendingAction {
                    generation,
                    token: token.clone(),
                    fires_at: Instant::now() + wait,
                },
            )
        };
        let replaced = replaced.map(|previous| previous.token.cancel()).is_some();
        tracing::debug!(%owner, %light, delay_secs = wait.as_secs(), replaced, "auto-off scheduled");

        let guard = EntryGuard {
            pending: Arc::clone(&self.pending),
            owner,
            light,
            generation,
        };
        self.tracker.spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::trace!(owner = %guard.owner, light = %guard.light, "pending auto-off cancelled");
                }
                () = tokio::time::sleep(wait) => action.await,
            }
            drop(guard);
        });
        true
    }

    /// Cancel the pending action of one light. Returns whether one existed.
    pub fn cancel(&self, owner: OwnerId, light: &LightId) -> bool {
        let removed = {
            let mut pending = lock(&self.pending);
            let removed = pending
                .get_mut(&owner)
                .and_then(|lights| lights.remove(light));
            if pending.get(&owner).is_some_and(HashMap::is_empty) {
                pending.remove(&owner);
            }
            removed
        };
        match removed {
            Some(action) => {
                action.token.cancel();
                tracing::debug!(%owner, %light, "pending auto-off cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending action of an owner. Returns how many were cancelled.
    pub fn cancel_all(&self, owner: OwnerId) -> usize {
        let removed = lock(&self.pending).remove(&owner).unwrap_or_default();
        for action in removed.values() {
            action.token.cancel();
        }
        if !removed.is_empty() {
            tracing::debug!(%owner, count = removed.len(), "all pending auto-offs cancelled");
        }
        removed.len()
    }

    #[must_use]
    pub fn is_pending(&self, owner: OwnerId, light: &LightId) -> bool {
        lock(&self.pending)
            .get(&owner)
            .is_some_and(|lights| lights.contains_key(light))
    }

    /// Time left before the pending action of a light fires.
    #[must_use]
    pub fn remaining(&self, owner: OwnerId, light: &LightId) -> Option<Duration> {
        lock(&self.pending)
            .get(&owner)
            .and_then(|lights| lights.get(light))
            .map(|action| action.fires_at.saturating_duration_since(Instant::now()))
    }

    /// Lights of `owner` with a pending action, sorted by id.
    #[must_use]
    pub fn pending_for(&self, owner: OwnerId) -> Vec<LightId> {
        let mut lights: Vec<LightId> = lock(&self.pending)
            .get(&owner)
            .map(|lights| lights.keys().cloned().collect())
            .unwrap_or_default();
        lights.sort();
        lights
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.pending).values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel everything, refuse new work and wait for all tasks to exit.
    ///
    /// Actions that already started running are allowed to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.shutdown.cancel();
        let cancelled: usize = {
            let mut pending = lock(&self.pending);
            let count = pending.values().map(HashMap::len).sum();
            pending.clear();
            count
        };
        tracing::info!(cancelled, "timeout registry shutting down");
        self.tracker.wait().await;
    }
}

/// Removes the entry of one task from the map when the task ends, on every
/// exit path, provided the entry still belongs to that task.
struct EntryGuard {
    pending: Arc<Mutex<PendingMap>>,
    owner: OwnerId,
    light: LightId,
    generation: u64,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        let mut pending = lock(&self.pending);
        let Some(lights) = pending.get_mut(&self.owner) else {
            return;
        };
        if lights
            .get(&self.light)
            .is_some_and(|action| action.generation == self.generation)
        {
            lights.remove(&self.light);
        }
        if lights.is_empty() {
            pending.remove(&self.owner);
        }
    }
}

fn schedulable(delay: TimeDelta) -> Option<Duration> {
    if delay <= TimeDelta::zero() || delay > TimeDelta::seconds(i64::from(MAX_SCHEDULE_DELAY_SECS)) {
        return None;
    }
    delay.to_std().ok()
}

fn lock(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
