//! # lightkeeper-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the JSON API under `/api/owners/{owner}/…` for lights, the
//!   auto-off timer, notification settings and the wake/sleep schedule
//! - Serve `/api/devices/…` for controller pairing, the status poll and
//!   token-guarded light registration, plus `/api/energy` readings
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map [`LightkeeperError`](lightkeeper_domain::error::LightkeeperError)
//!   into status codes
//!
//! ## Dependency rule
//! Depends on `lightkeeper-app` (for port traits and services) and
//! `lightkeeper-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
