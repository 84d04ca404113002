//! # lightkeeper-domain
//!
//! Pure domain model for the lightkeeper light-control backend.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Owners** (accounts carrying an auto-timeout policy)
//! - Define **Lights** (ON/OFF switches owned by exactly one owner) and the
//!   paired-field transitions that keep their flags consistent
//! - Define **Timeout durations** and their validation rules
//! - Define **Wake/sleep routines** (daily time-of-day triggers)
//! - Define **Energy readings** reported by paired controllers
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod energy;
pub mod light;
pub mod owner;
pub mod routine;
pub mod timeout;
