//! # lightkeeper-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `lightkeeper-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `lightkeeper-app` (for port traits) and `lightkeeper-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod energy_repo;
pub mod error;
pub mod light_repo;
pub mod owner_repo;
pub mod pool;
pub mod routine_repo;

mod decode;

pub use energy_repo::SqliteEnergyRepository;
pub use light_repo::SqliteLightRepository;
pub use owner_repo::SqliteOwnerRepository;
pub use pool::{Config, Database};
pub use routine_repo::SqliteRoutineRepository;
