//! In-memory port doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use lightkeeper_domain::error::{LightkeeperError, NotFoundError};
use lightkeeper_domain::energy::EnergyReading;
use lightkeeper_domain::id::{DeviceId, LightId, OwnerId};
use lightkeeper_domain::light::{Light, LightPatch};
use lightkeeper_domain::owner::{Owner, OwnerPatch, TimeoutPolicy};
use lightkeeper_domain::routine::{RoutineKind, WakeSleepRoutine};
use lightkeeper_domain::time::Timestamp;

use crate::clock::{AnchoredClock, Clock};
use crate::ports::{
    EnergyRepository, LightOnNotice, LightRepository, Notifier, OwnerRepository,
    RoutineRepository,
};
use crate::services::timeout_service::TimeoutService;
use crate::timeout_registry::TimeoutRegistry;

fn storage_failure() -> LightkeeperError {
    LightkeeperError::Storage("simulated storage failure".into())
}

#[derive(Default)]
pub struct InMemoryOwnerRepo {
    store: Mutex<HashMap<OwnerId, Owner>>,
}

impl OwnerRepository for InMemoryOwnerRepo {
    fn create(&self, owner: Owner) -> impl Future<Output = Result<Owner, LightkeeperError>> + Send {
        self.store.lock().unwrap().insert(owner.id, owner.clone());
        async { Ok(owner) }
    }

    fn get(
        &self,
        id: OwnerId,
    ) -> impl Future<Output = Result<Option<Owner>, LightkeeperError>> + Send {
        let result = self.store.lock().unwrap().get(&id).cloned();
        async { Ok(result) }
    }

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Owner>, LightkeeperError>> + Send {
        let result = self
            .store
            .lock()
            .unwrap()
            .values()
            .find(|owner| owner.email == email)
            .cloned();
        async { Ok(result) }
    }

    fn find_by_device(
        &self,
        device: &DeviceId,
    ) -> impl Future<Output = Result<Option<Owner>, LightkeeperError>> + Send {
        let result = self
            .store
            .lock()
            .unwrap()
            .values()
            .find(|owner| owner.device_id.as_ref() == Some(device))
            .cloned();
        async { Ok(result) }
    }

    fn list(&self) -> impl Future<Output = Result<Vec<Owner>, LightkeeperError>> + Send {
        let result: Vec<Owner> = self.store.lock().unwrap().values().cloned().collect();
        async { Ok(result) }
    }

    fn update(
        &self,
        id: OwnerId,
        patch: OwnerPatch,
    ) -> impl Future<Output = Result<Owner, LightkeeperError>> + Send {
        let mut store = self.store.lock().unwrap();
        let result = match store.get_mut(&id) {
            Some(owner) => {
                owner.apply(&patch);
                Ok(owner.clone())
            }
            None => Err(NotFoundError {
                entity: "Owner",
                id: id.to_string(),
            }
            .into()),
        };
        async { result }
    }
}

#[derive(Default)]
pub struct InMemoryLightRepo {
    store: Mutex<HashMap<(OwnerId, LightId), Light>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_lists: AtomicBool,
}

impl InMemoryLightRepo {
    /// Number of successful `write` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    /// Store a light as is, bypassing the write counter.
    pub fn put(&self, light: Light) {
        self.store
            .lock()
            .unwrap()
            .insert((light.owner_id, light.id.clone()), light);
    }

    pub fn snapshot(&self, owner: OwnerId, light: &LightId) -> Light {
        self.store
            .lock()
            .unwrap()
            .get(&(owner, light.clone()))
            .cloned()
            .unwrap()
    }
}

impl LightRepository for InMemoryLightRepo {
    fn create(&self, light: Light) -> impl Future<Output = Result<Light, LightkeeperError>> + Send {
        self.put(light.clone());
        async { Ok(light) }
    }

    fn get(
        &self,
        owner: OwnerId,
        light: &LightId,
    ) -> impl Future<Output = Result<Option<Light>, LightkeeperError>> + Send {
        let result = self
            .store
            .lock()
            .unwrap()
            .get(&(owner, light.clone()))
            .cloned();
        async { Ok(result) }
    }

    fn list_by_owner(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Vec<Light>, LightkeeperError>> + Send {
        let result = if self.fail_lists.load(Ordering::SeqCst) {
            Err(storage_failure())
        } else {
            let mut lights: Vec<Light> = self
                .store
                .lock()
                .unwrap()
                .values()
                .filter(|light| light.owner_id == owner)
                .cloned()
                .collect();
            lights.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(lights)
        };
        async { result }
    }

    fn write(
        &self,
        owner: OwnerId,
        light: &LightId,
        patch: LightPatch,
    ) -> impl Future<Output = Result<Light, LightkeeperError>> + Send {
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(storage_failure())
        } else {
            let mut store = self.store.lock().unwrap();
            let entry = store
                .entry((owner, light.clone()))
                .or_insert_with(|| Light::new(owner, light.clone()));
            entry.apply(&patch);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(entry.clone())
        };
        async { result }
    }
}

#[derive(Default)]
pub struct InMemoryRoutineRepo {
    store: Mutex<HashMap<OwnerId, WakeSleepRoutine>>,
}

impl RoutineRepository for InMemoryRoutineRepo {
    fn get(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Option<WakeSleepRoutine>, LightkeeperError>> + Send {
        let result = self.store.lock().unwrap().get(&owner).cloned();
        async { Ok(result) }
    }

    fn list(&self) -> impl Future<Output = Result<Vec<WakeSleepRoutine>, LightkeeperError>> + Send {
        let result: Vec<WakeSleepRoutine> = self.store.lock().unwrap().values().cloned().collect();
        async { Ok(result) }
    }

    fn save(
        &self,
        routine: WakeSleepRoutine,
    ) -> impl Future<Output = Result<WakeSleepRoutine, LightkeeperError>> + Send {
        self.store
            .lock()
            .unwrap()
            .insert(routine.owner_id, routine.clone());
        async { Ok(routine) }
    }

    fn mark_fired(
        &self,
        owner: OwnerId,
        kind: RoutineKind,
        date: NaiveDate,
    ) -> impl Future<Output = Result<(), LightkeeperError>> + Send {
        if let Some(routine) = self.store.lock().unwrap().get_mut(&owner) {
            routine.mark_fired(kind, date);
        }
        async { Ok(()) }
    }
}

#[derive(Default)]
pub struct InMemoryEnergyRepo {
    store: Mutex<Vec<EnergyReading>>,
}

impl EnergyRepository for InMemoryEnergyRepo {
    fn record(
        &self,
        reading: EnergyReading,
    ) -> impl Future<Output = Result<EnergyReading, LightkeeperError>> + Send {
        self.store.lock().unwrap().push(reading.clone());
        async { Ok(reading) }
    }

    fn recent_by_owner(
        &self,
        owner: OwnerId,
        per_light: u32,
    ) -> impl Future<Output = Result<Vec<EnergyReading>, LightkeeperError>> + Send {
        let mut readings: Vec<EnergyReading> = self
            .store
            .lock()
            .unwrap()
            .iter()
            .filter(|reading| reading.owner_id == owner)
            .cloned()
            .collect();
        readings.sort_by(|a, b| {
            a.light_id
                .cmp(&b.light_id)
                .then(b.recorded_at.cmp(&a.recorded_at))
        });
        let mut kept: Vec<EnergyReading> = Vec::new();
        for reading in readings {
            let same_light = kept
                .iter()
                .filter(|k| k.light_id == reading.light_id)
                .count();
            if same_light < per_light as usize {
                kept.push(reading);
            }
        }
        async { Ok(kept) }
    }
}

/// Records every notice; can be told to fail.
#[derive(Default)]
pub struct SpyNotifier {
    sent: Mutex<Vec<LightOnNotice>>,
    fail: AtomicBool,
}

impl SpyNotifier {
    pub fn sent(&self) -> Vec<LightOnNotice> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Notifier for SpyNotifier {
    fn notify(
        &self,
        notice: LightOnNotice,
    ) -> impl Future<Output = Result<(), LightkeeperError>> + Send {
        let result = if self.fail.load(Ordering::SeqCst) {
            Err(LightkeeperError::Notification("mail server down".into()))
        } else {
            self.sent.lock().unwrap().push(notice);
            Ok(())
        };
        async { result }
    }
}

/// Start of every test timeline.
pub fn epoch() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

pub fn light_id(id: &str) -> LightId {
    LightId::new(id).unwrap()
}

/// Repositories, registry and facade wired together over an anchored clock.
pub struct Harness {
    pub owners: Arc<InMemoryOwnerRepo>,
    pub lights: Arc<InMemoryLightRepo>,
    pub routines: Arc<InMemoryRoutineRepo>,
    pub energy: Arc<InMemoryEnergyRepo>,
    pub notifier: Arc<SpyNotifier>,
    pub registry: Arc<TimeoutRegistry>,
    pub clock: Arc<dyn Clock>,
    pub timeouts: TimeoutService<InMemoryOwnerRepo, InMemoryLightRepo>,
}

impl Harness {
    pub fn new() -> Self {
        Self::starting_at(epoch())
    }

    pub fn starting_at(anchor: Timestamp) -> Self {
        let owners = Arc::new(InMemoryOwnerRepo::default());
        let lights = Arc::new(InMemoryLightRepo::default());
        let registry = Arc::new(TimeoutRegistry::new());
        let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(anchor));
        let timeouts = TimeoutService::new(
            Arc::clone(&owners),
            Arc::clone(&lights),
            Arc::clone(&registry),
            Arc::clone(&clock),
        );
        Self {
            owners,
            lights,
            routines: Arc::new(InMemoryRoutineRepo::default()),
            energy: Arc::new(InMemoryEnergyRepo::default()),
            notifier: Arc::new(SpyNotifier::default()),
            registry,
            clock,
            timeouts,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Insert an owner with the given policy and return it.
    pub async fn owner(&self, policy: TimeoutPolicy) -> Owner {
        let owner = Owner::builder()
            .email("ana@example.com")
            .username("Ana")
            .policy(policy)
            .created_at(epoch())
            .build()
            .unwrap();
        self.owners.create(owner).await.unwrap()
    }

    /// Insert a second owner under another address.
    pub async fn other_owner(&self, email: &str) -> Owner {
        let owner = Owner::builder()
            .email(email)
            .created_at(epoch())
            .build()
            .unwrap();
        self.owners.create(owner).await.unwrap()
    }

    /// Store a light that has been ON since `since`.
    pub fn light_on_since(&self, owner: OwnerId, id: &str, since: Timestamp) -> Light {
        let mut light = Light::new(owner, light_id(id));
        light.apply(&LightPatch::turn_on(since));
        self.lights.put(light.clone());
        light
    }

    pub fn light(&self, owner: OwnerId, id: &str) -> Light {
        self.lights.snapshot(owner, &light_id(id))
    }
}
