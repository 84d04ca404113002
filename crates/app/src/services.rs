//! Application services — use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.
//! Repositories are shared behind `Arc` because the scheduling facade hands
//! them to the auto-off tasks it spawns.

pub mod device_service;
pub mod energy_service;
pub mod light_service;
pub mod routine_service;
pub mod settings_service;
pub mod timeout_service;
