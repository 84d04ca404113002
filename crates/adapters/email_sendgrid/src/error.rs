//! Email adapter error type.

use lightkeeper_domain::error::LightkeeperError;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// No API key was configured, so nothing can be sent.
    #[error("SendGrid API key is not configured")]
    NotConfigured,

    #[error("failed to reach SendGrid")]
    Transport(#[from] reqwest::Error),

    /// `SendGrid` answered with a non-success status.
    #[error("SendGrid rejected the message with status {status}")]
    Rejected { status: u16, body: String },
}

impl From<NotifyError> for LightkeeperError {
    fn from(err: NotifyError) -> Self {
        Self::Notification(Box::new(err))
    }
}
