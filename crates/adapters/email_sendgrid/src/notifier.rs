//! [`Notifier`] implementation backed by the `SendGrid` HTTP API.

use std::future::Future;
use std::time::Duration;

use lightkeeper_app::ports::{LightOnNotice, Notifier};
use lightkeeper_domain::error::LightkeeperError;

use crate::error::NotifyError;
use crate::message::MailRequest;

pub const DEFAULT_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";
pub const DEFAULT_FROM_EMAIL: &str = "noreply@example.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings of the `SendGrid` notifier.
#[derive(Debug, Clone)]
pub struct Config {
    /// Without a key every notice fails with [`NotifyError::NotConfigured`].
    pub api_key: Option<String>,
    pub from_email: String,
    pub endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

pub struct SendGridNotifier {
    client: reqwest::Client,
    config: Config,
}

impl SendGridNotifier {
    /// Build the notifier and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, NotifyError> {
        if config.api_key.is_none() {
            tracing::warn!("no SendGrid API key configured, notices will not be delivered");
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    /// Deliver one notice.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when no key is configured, the request fails,
    /// or `SendGrid` answers with a non-success status.
    #[tracing::instrument(skip(self, notice), fields(owner = %notice.owner_id, light = %notice.light_id))]
    pub async fn send(&self, notice: &LightOnNotice) -> Result<(), NotifyError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(NotifyError::NotConfigured)?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&MailRequest::new(&self.config.from_email, notice))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %notice.email, "notification email sent");
        Ok(())
    }
}

impl Notifier for SendGridNotifier {
    fn notify(
        &self,
        notice: LightOnNotice,
    ) -> impl Future<Output = Result<(), LightkeeperError>> + Send {
        async move { Ok(self.send(&notice).await?) }
    }
}
