//! # lightkeeper-adapter-email-sendgrid
//!
//! Sends "light left ON" notices through the `SendGrid` v3 mail API.
//!
//! ## Responsibilities
//! - Implement [`Notifier`](lightkeeper_app::ports::Notifier)
//! - Render the plain-text message for a notice
//! - Map transport failures into [`NotifyError`](error::NotifyError)
//!
//! ## Dependency rule
//! Depends on `lightkeeper-app` (for the port trait) and `lightkeeper-domain`.

pub mod error;
pub mod message;
pub mod notifier;

pub use notifier::{Config, SendGridNotifier};
