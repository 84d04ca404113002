//! `SQLite` implementation of [`RoutineRepository`].

use std::future::Future;
use std::str::FromStr;

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use lightkeeper_app::ports::RoutineRepository;
use lightkeeper_domain::error::LightkeeperError;
use lightkeeper_domain::id::{LightId, OwnerId};
use lightkeeper_domain::routine::{RoutineKind, RoutineTrigger, TimeOfDay, WakeSleepRoutine};

use crate::decode::{DATE_FORMAT, decode_err, maybe_date};
use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`WakeSleepRoutine`].
struct Wrapper(WakeSleepRoutine);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<WakeSleepRoutine> {
        value.map(|w| w.0)
    }
}

fn trigger(
    row: &SqliteRow,
    at_column: &str,
    light_column: &str,
) -> Result<Option<RoutineTrigger>, sqlx::Error> {
    let at: Option<String> = row.try_get(at_column)?;
    let light: Option<String> = row.try_get(light_column)?;
    match (at, light) {
        (Some(at), Some(light)) => Ok(Some(RoutineTrigger {
            at: TimeOfDay::from_str(&at).map_err(decode_err)?,
            light_id: LightId::new(light).map_err(decode_err)?,
        })),
        _ => Ok(None),
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let owner_id: String = row.try_get("owner_id")?;

        Ok(Self(WakeSleepRoutine {
            owner_id: OwnerId::from_str(&owner_id).map_err(decode_err)?,
            wake_up: trigger(row, "wake_up_at", "wake_up_light")?,
            sleep: trigger(row, "sleep_at", "sleep_light")?,
            wake_up_last_fired: maybe_date(row.try_get("wake_up_last_fired")?)?,
            sleep_last_fired: maybe_date(row.try_get("sleep_last_fired")?)?,
        }))
    }
}

const SELECT_BY_OWNER: &str = "SELECT * FROM routines WHERE owner_id = ?";
const SELECT_ALL: &str = "SELECT * FROM routines ORDER BY owner_id";
const UPSERT: &str = r"
    INSERT INTO routines (
        owner_id, wake_up_at, wake_up_light, sleep_at, sleep_light,
        wake_up_last_fired, sleep_last_fired
    )
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (owner_id) DO UPDATE SET
        wake_up_at = excluded.wake_up_at,
        wake_up_light = excluded.wake_up_light,
        sleep_at = excluded.sleep_at,
        sleep_light = excluded.sleep_light,
        wake_up_last_fired = excluded.wake_up_last_fired,
        sleep_last_fired = excluded.sleep_last_fired
";
const MARK_WAKE_UP: &str = "UPDATE routines SET wake_up_last_fired = ? WHERE owner_id = ?";
const MARK_SLEEP: &str = "UPDATE routines SET sleep_last_fired = ? WHERE owner_id = ?";

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `SQLite`-backed wake/sleep routine repository.
pub struct SqliteRoutineRepository {
    pool: SqlitePool,
}

impl SqliteRoutineRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RoutineRepository for SqliteRoutineRepository {
    fn get(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Option<WakeSleepRoutine>, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_OWNER)
                .bind(owner.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn list(&self) -> impl Future<Output = Result<Vec<WakeSleepRoutine>, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn save(
        &self,
        routine: WakeSleepRoutine,
    ) -> impl Future<Output = Result<WakeSleepRoutine, LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let wake_up = routine.wake_up.as_ref();
            let sleep = routine.sleep.as_ref();
            sqlx::query(UPSERT)
                .bind(routine.owner_id.to_string())
                .bind(wake_up.map(|t| t.at.to_string()))
                .bind(wake_up.map(|t| t.light_id.to_string()))
                .bind(sleep.map(|t| t.at.to_string()))
                .bind(sleep.map(|t| t.light_id.to_string()))
                .bind(routine.wake_up_last_fired.map(format_date))
                .bind(routine.sleep_last_fired.map(format_date))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(routine)
        }
    }

    fn mark_fired(
        &self,
        owner: OwnerId,
        kind: RoutineKind,
        date: NaiveDate,
    ) -> impl Future<Output = Result<(), LightkeeperError>> + Send {
        let pool = self.pool.clone();
        async move {
            let statement = match kind {
                RoutineKind::WakeUp => MARK_WAKE_UP,
                RoutineKind::Sleep => MARK_SLEEP,
            };
            sqlx::query(statement)
                .bind(format_date(date))
                .bind(owner.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}
