//! `SQLite` implementation of [`EnergyRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use lightkeeper_app::ports::EnergyRepository;
use lightkeeper_domain::energy::EnergyReading;
use lightkeeper_domain::error::LightkeeperError;
use lightkeeper_domain::id::{LightId, OwnerId};

use crate::decode::{decode_err, encode, timestamp};
use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`EnergyReading`].
struct Wrapper(EnergyReading);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let owner_id: String = row.try_get("owner_id")?;
        let light_id: String = row.try_get("light_id")?;
        let recorded_at: String = row.try_get("recorded_at")?;

        Ok(Self(EnergyReading {
            owner_id: OwnerId::from_str(&owner_id).map_err(decode_err)?,
            light_id: LightId::new(light_id).map_err(decode_err)?,
            energy_wh: row.try_get("energy_wh")?,
            recorded_at: timestamp(&recorded_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO energy_readings (owner_id, light_id, energy_wh, recorded_at)
    VALUES (?, ?, ?, ?)
";
const SELECT_RECENT: &str = r"
    SELECT owner_id, light_id, energy_wh, recorded_at FROM (
        SELECT *, ROW_NUMBER() OVER (
            PARTITION BY light_id ORDER BY recorded_at DESC, id DESC
        ) AS position
        FROM energy_readings
        WHERE owner_id = ?
    )
    WHERE position <= ?
    ORDER BY light_id, recorded_at DESC, id DESC
";

/// `SQLite`-backed energy reading store.
pub struct SqliteEnergyRepository {
    pool: SqlitePool,
}

impl SqliteEnergyRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EnergyRepository for SqliteEnergyRepository {
    fn record(
        &self,
        reading: EnergyReading,
    ) -> impl Future<Output = Result<EnergyReading, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(reading.owner_id.to_string())
                .bind(reading.light_id.as_str())
                .bind(reading.energy_wh)
                .bind(encode(reading.recorded_at))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(reading)
        }
    }

    fn recent_by_owner(
        &self,
        owner: OwnerId,
        per_light: u32,
    ) -> impl Future<Output = Result<Vec<EnergyReading>, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
                .bind(owner.to_string())
                .bind(per_light)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }
}
