//! Routine service — wake/sleep schedule configuration.

use std::sync::Arc;

use lightkeeper_domain::error::{LightkeeperError, NotFoundError};
use lightkeeper_domain::id::OwnerId;
use lightkeeper_domain::routine::{RoutineTrigger, WakeSleepRoutine};

use crate::ports::{OwnerRepository, RoutineRepository};

/// Application service for wake/sleep routines.
pub struct RoutineService<OR, RR> {
    owners: Arc<OR>,
    routines: Arc<RR>,
}

impl<OR, RR> Clone for RoutineService<OR, RR> {
    fn clone(&self) -> Self {
        Self {
            owners: Arc::clone(&self.owners),
            routines: Arc::clone(&self.routines),
        }
    }
}

impl<OR: OwnerRepository, RR: RoutineRepository> RoutineService<OR, RR> {
    pub fn new(owners: Arc<OR>, routines: Arc<RR>) -> Self {
        Self { owners, routines }
    }

    /// Replace the wake/sleep triggers of an owner.
    ///
    /// The per-day fired markers survive the update so that saving the same
    /// schedule twice on one day cannot fire a routine twice.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::Validation`] when both triggers are
    /// absent, [`LightkeeperError::NotFound`] for an unknown owner, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_schedule(
        &self,
        owner: OwnerId,
        wake_up: Option<RoutineTrigger>,
        sleep: Option<RoutineTrigger>,
    ) -> Result<WakeSleepRoutine, LightkeeperError> {
        let mut routine = WakeSleepRoutine::new(owner, wake_up, sleep)?;
        if self.owners.get(owner).await?.is_none() {
            return Err(NotFoundError {
                entity: "Owner",
                id: owner.to_string(),
            }
            .into());
        }
        if let Some(existing) = self.routines.get(owner).await? {
            routine.wake_up_last_fired = existing.wake_up_last_fired;
            routine.sleep_last_fired = existing.sleep_last_fired;
        }
        self.routines.save(routine).await
    }

    /// Get the routine of an owner.
    ///
    /// # Errors
    ///
    /// Returns [`LightkeeperError::NotFound`] when no routine is configured,
    /// or a storage error from the repository.
    pub async fn get_schedule(&self, owner: OwnerId) -> Result<WakeSleepRoutine, LightkeeperError> {
        self.routines.get(owner).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Schedule",
                id: owner.to_string(),
            }
            .into()
        })
    }
}
