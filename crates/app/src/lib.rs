//! # lightkeeper-app
//!
//! Application layer — use-cases, **port definitions** (traits) and the
//! in-process timeout engine.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `OwnerRepository`, `LightRepository`, `RoutineRepository`,
//!     `EnergyRepository` — persistence
//!   - `Notifier` — "light on too long" notices
//! - Own the **timeout registry**: at most one pending auto-off per light,
//!   with race-free replace and cancel
//! - Provide the **scheduling facade** (`TimeoutService`) that decides when to
//!   arm or cancel, and the request-level services built on it
//! - Pair light controllers, answer their status polls and record their
//!   energy readings
//! - Run the **reconciliation sweep** and the **routine runner** as
//!   cancellable periodic tasks
//!
//! ## Dependency rule
//! Depends on `lightkeeper-domain` only (plus `tokio` / `tokio-util` for
//! timers, tasks and cancellation, and `subtle` for the device token check).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod clock;
pub mod periodic;
pub mod ports;
pub mod routine_runner;
pub mod services;
pub mod sweep;
pub mod timeout_registry;

#[cfg(test)]
mod scenarios;
#[cfg(test)]
pub(crate) mod testing;
