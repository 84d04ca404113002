//! `SQLite` implementation of [`OwnerRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use lightkeeper_app::ports::OwnerRepository;
use lightkeeper_domain::error::{LightkeeperError, NotFoundError};
use lightkeeper_domain::id::{DeviceId, OwnerId};
use lightkeeper_domain::owner::{Owner, OwnerPatch, TimeoutPolicy, parse_timezone};
use lightkeeper_domain::timeout::TimeoutDuration;

use crate::decode::{decode_err, encode, maybe_device, maybe_timestamp, timestamp};
use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Owner`].
struct Wrapper(Owner);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Owner> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let email: String = row.try_get("email")?;
        let username: Option<String> = row.try_get("username")?;
        let timezone: String = row.try_get("timezone")?;
        let enabled: bool = row.try_get("policy_enabled")?;
        let timeout_secs: u32 = row.try_get("timeout_secs")?;
        let notify_before_secs: u32 = row.try_get("notify_before_secs")?;
        let created_at: String = row.try_get("created_at")?;
        let device_id: Option<String> = row.try_get("device_id")?;
        let device_paired_at: Option<String> = row.try_get("device_paired_at")?;

        Ok(Self(Owner {
            id: OwnerId::from_str(&id).map_err(decode_err)?,
            email,
            username,
            timezone: parse_timezone(&timezone).map_err(decode_err)?,
            policy: TimeoutPolicy {
                enabled,
                timeout: TimeoutDuration::from_secs(timeout_secs).map_err(decode_err)?,
                notify_before_secs,
            },
            device_id: maybe_device(device_id)?,
            device_paired_at: maybe_timestamp(device_paired_at)?,
            created_at: timestamp(&created_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO owners (
        id, email, username, timezone, policy_enabled, timeout_secs, notify_before_secs,
        device_id, device_paired_at, created_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";
const SELECT_BY_ID: &str = "SELECT * FROM owners WHERE id = ?";
const SELECT_BY_EMAIL: &str =
    "SELECT * FROM owners WHERE email = ? ORDER BY created_at, id LIMIT 1";
const SELECT_BY_DEVICE: &str = "SELECT * FROM owners WHERE device_id = ?";
const SELECT_ALL: &str = "SELECT * FROM owners ORDER BY created_at, id";
const UPDATE: &str = r"
    UPDATE owners
    SET email = ?, username = ?, timezone = ?, policy_enabled = ?, timeout_secs = ?,
        notify_before_secs = ?, device_id = ?, device_paired_at = ?
    WHERE id = ?
";

/// `SQLite`-backed owner repository.
pub struct SqliteOwnerRepository {
    pool: SqlitePool,
}

impl SqliteOwnerRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl OwnerRepository for SqliteOwnerRepository {
    fn create(&self, owner: Owner) -> impl Future<Output = Result<Owner, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(owner.id.to_string())
                .bind(&owner.email)
                .bind(&owner.username)
                .bind(owner.timezone.name())
                .bind(owner.policy.enabled)
                .bind(owner.policy.timeout.as_secs())
                .bind(owner.policy.notify_before_secs)
                .bind(owner.device_id.as_ref().map(DeviceId::as_str))
                .bind(owner.device_paired_at.map(encode))
                .bind(encode(owner.created_at))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(owner)
        }
    }

    fn get(
        &self,
        id: OwnerId,
    ) -> impl Future<Output = Result<Option<Owner>, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Owner>, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        let email = email.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_EMAIL)
                .bind(email)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn find_by_device(
        &self,
        device: &DeviceId,
    ) -> impl Future<Output = Result<Option<Owner>, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        let device = device.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_DEVICE)
                .bind(device)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn list(&self) -> impl Future<Output = Result<Vec<Owner>, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn update(
        &self,
        id: OwnerId,
        patch: OwnerPatch,
    ) -> impl Future<Output = Result<Owner, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;

            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            let Some(Wrapper(mut owner)) = row else {
                return Err(NotFoundError {
                    entity: "Owner",
                    id: id.to_string(),
                }
                .into());
            };
            owner.apply(&patch);

            sqlx::query(UPDATE)
                .bind(&owner.email)
                .bind(&owner.username)
                .bind(owner.timezone.name())
                .bind(owner.policy.enabled)
                .bind(owner.policy.timeout.as_secs())
                .bind(owner.policy.notify_before_secs)
                .bind(owner.device_id.as_ref().map(DeviceId::as_str))
                .bind(owner.device_paired_at.map(encode))
                .bind(owner.id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            tx.commit().await.map_err(StorageError::from)?;

            Ok(owner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    async fn setup() -> SqliteOwnerRepository {
        let db = Config::memory().build().await.unwrap();
        SqliteOwnerRepository::new(db.pool().clone())
    }

    fn test_owner() -> Owner {
        Owner::builder()
            .email("ana@example.com")
            .username("Ana")
            .timezone(Tz::Asia__Manila)
            .created_at(Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_and_retrieve_owner_when_valid() {
        let repo = setup().await;
        let owner = test_owner();

        repo.create(owner.clone()).await.unwrap();

        let fetched = repo.get(owner.id).await.unwrap().unwrap();
        assert_eq!(fetched, owner);
    }

    #[tokio::test]
    async fn should_return_none_when_owner_not_found() {
        let repo = setup().await;
        let result = repo.get(OwnerId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_list_all_owners() {
        let repo = setup().await;
        repo.create(test_owner()).await.unwrap();
        repo.create(test_owner()).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn should_merge_patch_when_updating() {
        let repo = setup().await;
        let owner = repo.create(test_owner()).await.unwrap();
        let timeout = TimeoutDuration::from_secs(120).unwrap();

        let updated = repo
            .update(owner.id, OwnerPatch::timeout(timeout))
            .await
            .unwrap();

        assert_eq!(updated.policy.timeout, timeout);
        assert_eq!(updated.username.as_deref(), Some("Ana"));
        let fetched = repo.get(owner.id).await.unwrap().unwrap();
        assert_eq!(fetched.policy.timeout, timeout);
        assert_eq!(fetched.timezone, Tz::Asia__Manila);
    }

    #[tokio::test]
    async fn should_disable_policy_when_toggled_off() {
        let repo = setup().await;
        let owner = repo.create(test_owner()).await.unwrap();

        repo.update(owner.id, OwnerPatch::policy_enabled(false))
            .await
            .unwrap();

        let fetched = repo.get(owner.id).await.unwrap().unwrap();
        assert!(!fetched.policy.enabled);
    }

    #[tokio::test]
    async fn should_return_not_found_when_updating_missing_owner() {
        let repo = setup().await;

        let result = repo
            .update(OwnerId::new(), OwnerPatch::policy_enabled(false))
            .await;

        assert!(matches!(result, Err(LightkeeperError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_find_owner_by_email() {
        let repo = setup().await;
        let owner = repo.create(test_owner()).await.unwrap();

        let found = repo.find_by_email("ana@example.com").await.unwrap().unwrap();

        assert_eq!(found.id, owner.id);
        assert!(repo.find_by_email("ben@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_persist_device_pairing() {
        let repo = setup().await;
        let owner = repo.create(test_owner()).await.unwrap();
        let device = DeviceId::new("esp32-a1").unwrap();
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap();

        repo.update(owner.id, OwnerPatch::pair_device(device.clone(), at))
            .await
            .unwrap();

        let found = repo.find_by_device(&device).await.unwrap().unwrap();
        assert_eq!(found.id, owner.id);
        assert_eq!(found.device_paired_at, Some(at));

        repo.update(owner.id, OwnerPatch::unpair_device())
            .await
            .unwrap();
        assert!(repo.find_by_device(&device).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_refuse_pairing_one_device_with_two_owners() {
        let repo = setup().await;
        let first = repo.create(test_owner()).await.unwrap();
        let second = repo.create(test_owner()).await.unwrap();
        let device = DeviceId::new("esp32-a1").unwrap();
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap();
        repo.update(first.id, OwnerPatch::pair_device(device.clone(), at))
            .await
            .unwrap();

        let result = repo
            .update(second.id, OwnerPatch::pair_device(device, at))
            .await;

        assert!(matches!(result, Err(LightkeeperError::Storage(_))));
    }
}
