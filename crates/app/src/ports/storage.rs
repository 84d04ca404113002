//! Storage port — repository traits for persistence.
//!
//! Writes are merge-style: callers describe *what changes* with a patch and
//! the adapter applies it to whatever is currently stored.

use std::future::Future;

use chrono::NaiveDate;
use lightkeeper_domain::error::LightkeeperError;
use lightkeeper_domain::energy::EnergyReading;
use lightkeeper_domain::id::{DeviceId, LightId, OwnerId};
use lightkeeper_domain::light::{Light, LightPatch};
use lightkeeper_domain::owner::{Owner, OwnerPatch};
use lightkeeper_domain::routine::{RoutineKind, WakeSleepRoutine};

/// Repository for [`Owner`] accounts.
pub trait OwnerRepository: Send + Sync + 'static {
    /// Persist a new owner.
    fn create(&self, owner: Owner) -> impl Future<Output = Result<Owner, LightkeeperError>> + Send;

    /// Get an owner by id.
    fn get(
        &self,
        id: OwnerId,
    ) -> impl Future<Output = Result<Option<Owner>, LightkeeperError>> + Send;

    /// Get the owner registered with this contact address.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Owner>, LightkeeperError>> + Send;

    /// Get the owner a device is currently paired with.
    fn find_by_device(
        &self,
        device: &DeviceId,
    ) -> impl Future<Output = Result<Option<Owner>, LightkeeperError>> + Send;

    /// Get every owner. Used by the sweep; a full scan is acceptable.
    fn list(&self) -> impl Future<Output = Result<Vec<Owner>, LightkeeperError>> + Send;

    /// Merge `patch` into an existing owner and return the result.
    ///
    /// Fails with [`LightkeeperError::NotFound`] when the owner is absent.
    fn update(
        &self,
        id: OwnerId,
        patch: OwnerPatch,
    ) -> impl Future<Output = Result<Owner, LightkeeperError>> + Send;
}

/// Repository for [`Light`]s, always addressed by `(owner, light)`.
pub trait LightRepository: Send + Sync + 'static {
    /// Persist a new light, replacing any light stored under the same key.
    fn create(&self, light: Light) -> impl Future<Output = Result<Light, LightkeeperError>> + Send;

    fn get(
        &self,
        owner: OwnerId,
        light: &LightId,
    ) -> impl Future<Output = Result<Option<Light>, LightkeeperError>> + Send;

    /// Every light of an owner, ordered by light id.
    fn list_by_owner(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Vec<Light>, LightkeeperError>> + Send;

    /// Merge `patch` into the stored light, creating an OFF light first when
    /// none exists, and return the merged state.
    fn write(
        &self,
        owner: OwnerId,
        light: &LightId,
        patch: LightPatch,
    ) -> impl Future<Output = Result<Light, LightkeeperError>> + Send;
}

/// Repository for per-owner [`WakeSleepRoutine`]s.
pub trait RoutineRepository: Send + Sync + 'static {
    fn get(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Option<WakeSleepRoutine>, LightkeeperError>> + Send;

    fn list(&self) -> impl Future<Output = Result<Vec<WakeSleepRoutine>, LightkeeperError>> + Send;

    /// Insert or replace the routine of `routine.owner_id`.
    fn save(
        &self,
        routine: WakeSleepRoutine,
    ) -> impl Future<Output = Result<WakeSleepRoutine, LightkeeperError>> + Send;

    /// Record that `kind` fired on the owner's local `date`.
    fn mark_fired(
        &self,
        owner: OwnerId,
        kind: RoutineKind,
        date: NaiveDate,
    ) -> impl Future<Output = Result<(), LightkeeperError>> + Send;
}

/// Append-only store of [`EnergyReading`]s.
pub trait EnergyRepository: Send + Sync + 'static {
    fn record(
        &self,
        reading: EnergyReading,
    ) -> impl Future<Output = Result<EnergyReading, LightkeeperError>> + Send;

    /// The latest `per_light` readings of every light of an owner, newest
    /// first within each light, lights ordered by id.
    fn recent_by_owner(
        &self,
        owner: OwnerId,
        per_light: u32,
    ) -> impl Future<Output = Result<Vec<EnergyReading>, LightkeeperError>> + Send;
}
