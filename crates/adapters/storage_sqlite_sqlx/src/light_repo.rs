//! `SQLite` implementation of [`LightRepository`].
//!
//! `write` reads the stored row, applies the patch and upserts the result in
//! one transaction, so concurrent patches never lose each other's fields.

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection, SqlitePool};

use lightkeeper_app::ports::LightRepository;
use lightkeeper_domain::error::LightkeeperError;
use lightkeeper_domain::id::{DeviceId, LightId, OwnerId};
use lightkeeper_domain::light::{Light, LightPatch, LightStatus};

use crate::decode::{decode_err, encode, maybe_device, maybe_timestamp};
use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Light`].
struct Wrapper(Light);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Light> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let owner_id: String = row.try_get("owner_id")?;
        let light_id: String = row.try_get("light_id")?;
        let status: String = row.try_get("status")?;

        Ok(Self(Light {
            owner_id: OwnerId::from_str(&owner_id).map_err(decode_err)?,
            id: LightId::new(light_id).map_err(decode_err)?,
            name: row.try_get("name")?,
            device_id: maybe_device(row.try_get("device_id")?)?,
            status: LightStatus::from_str(&status).map_err(decode_err)?,
            last_transition: maybe_timestamp(row.try_get("last_transition")?)?,
            notification_sent: row.try_get("notification_sent")?,
            manually_turned_off: row.try_get("manually_turned_off")?,
            auto_turned_off: row.try_get("auto_turned_off")?,
            turned_off_at: maybe_timestamp(row.try_get("turned_off_at")?)?,
            notify_after_secs: row.try_get("notify_after_secs")?,
            timeout_deadline: maybe_timestamp(row.try_get("timeout_deadline")?)?,
            last_notified_at: maybe_timestamp(row.try_get("last_notified_at")?)?,
        }))
    }
}

const SELECT_ONE: &str = "SELECT * FROM lights WHERE owner_id = ? AND light_id = ?";
const SELECT_BY_OWNER: &str = "SELECT * FROM lights WHERE owner_id = ? ORDER BY light_id";
const UPSERT: &str = r"
    INSERT INTO lights (
        owner_id, light_id, name, device_id, status, last_transition, notification_sent,
        manually_turned_off, auto_turned_off, turned_off_at, notify_after_secs,
        timeout_deadline, last_notified_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (owner_id, light_id) DO UPDATE SET
        name = excluded.name,
        device_id = excluded.device_id,
        status = excluded.status,
        last_transition = excluded.last_transition,
        notification_sent = excluded.notification_sent,
        manually_turned_off = excluded.manually_turned_off,
        auto_turned_off = excluded.auto_turned_off,
        turned_off_at = excluded.turned_off_at,
        notify_after_secs = excluded.notify_after_secs,
        timeout_deadline = excluded.timeout_deadline,
        last_notified_at = excluded.last_notified_at
";

async fn upsert(conn: &mut SqliteConnection, light: &Light) -> Result<(), StorageError> {
    sqlx::query(UPSERT)
        .bind(light.owner_id.to_string())
        .bind(light.id.as_str())
        .bind(&light.name)
        .bind(light.device_id.as_ref().map(DeviceId::as_str))
        .bind(light.status.to_string())
        .bind(light.last_transition.map(encode))
        .bind(light.notification_sent)
        .bind(light.manually_turned_off)
        .bind(light.auto_turned_off)
        .bind(light.turned_off_at.map(encode))
        .bind(light.notify_after_secs)
        .bind(light.timeout_deadline.map(encode))
        .bind(light.last_notified_at.map(encode))
        .execute(conn)
        .await?;
    Ok(())
}

/// `SQLite`-backed light repository.
pub struct SqliteLightRepository {
    pool: SqlitePool,
}

impl SqliteLightRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl LightRepository for SqliteLightRepository {
    fn create(&self, light: Light) -> impl Future<Output = Result<Light, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut conn = pool.acquire().await.map_err(StorageError::from)?;
            upsert(&mut conn, &light).await?;
            Ok(light)
        }
    }

    fn get(
        &self,
        owner: OwnerId,
        light: &LightId,
    ) -> impl Future<Output = Result<Option<Light>, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        let light = light.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_ONE)
                .bind(owner.to_string())
                .bind(light.as_str())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn list_by_owner(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Vec<Light>, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_OWNER)
                .bind(owner.to_string())
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn write(
        &self,
        owner: OwnerId,
        light: &LightId,
        patch: LightPatch,
    ) -> impl Future<Output = Result<Light, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        let light = light.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;

            let row: Option<Wrapper> = sqlx::query_as(SELECT_ONE)
                .bind(owner.to_string())
                .bind(light.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            let mut current = Wrapper::maybe(row).unwrap_or_else(|| Light::new(owner, light));
            current.apply(&patch);

            upsert(&mut tx, &current).await?;
            tx.commit().await.map_err(StorageError::from)?;

            tracing::trace!(owner = %owner, light = %current.id, status = %current.status, "light written");
            Ok(current)
        }
    }
}
