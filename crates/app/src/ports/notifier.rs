//! Notification port — "your light has been on too long" messages.

use std::future::Future;

use lightkeeper_domain::error::LightkeeperError;
use lightkeeper_domain::id::{LightId, OwnerId};
use lightkeeper_domain::time::Timestamp;

/// Everything an adapter needs to tell an owner about a light left ON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightOnNotice {
    pub owner_id: OwnerId,
    pub email: String,
    pub display_name: String,
    pub light_id: LightId,
    pub light_name: Option<String>,
    pub turned_on_at: Timestamp,
    /// How long the light had been ON when the notice was built.
    pub on_for_secs: u64,
}

impl LightOnNotice {
    /// Human label of the light: its name when set, else its id.
    #[must_use]
    pub fn light_label(&self) -> &str {
        self.light_name.as_deref().unwrap_or(self.light_id.as_str())
    }
}

/// Outbound channel for notices.
///
/// Failures are returned to the caller, which logs them; they never abort
/// scheduling.
pub trait Notifier: Send + Sync + 'static {
    fn notify(
        &self,
        notice: LightOnNotice,
    ) -> impl Future<Output = Result<(), LightkeeperError>> + Send;
}
