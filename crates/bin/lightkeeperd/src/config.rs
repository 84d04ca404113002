//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `lightkeeper.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

const MAX_INTERVAL_SECS: u64 = 3_600;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Reconciliation sweep cadence.
    pub sweep: SweepConfig,
    /// Wake/sleep routine cadence.
    pub routines: RoutinesConfig,
    /// Outbound email settings.
    pub email: EmailConfig,
    /// Paired controller settings.
    pub devices: DevicesConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Reconciliation sweep settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RoutinesConfig {
    pub interval_secs: u64,
}

/// `SendGrid` settings; without an API key notices are only logged.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub from_email: String,
    pub endpoint: String,
}

/// Controllers may only register lights when a shared token is set.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    pub registration_token: Option<String>,
}

impl Config {
    /// Load configuration from `lightkeeper.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting values are out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("lightkeeper.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("LIGHTKEEPER_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("LIGHTKEEPER_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("LIGHTKEEPER_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("LIGHTKEEPER_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("LIGHTKEEPER_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("SENDGRID_API_KEY").filter(|key| !key.is_empty()) {
            self.email.api_key = Some(val);
        }
        if let Some(val) = var("NOTIFY_FROM_EMAIL") {
            self.email.from_email = val;
        }
        if let Some(val) = var("LIGHTKEEPER_DEVICE_TOKEN").filter(|token| !token.is_empty()) {
            self.devices.registration_token = Some(val);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        check_interval("sweep.interval_secs", self.sweep.interval_secs)?;
        check_interval("routines.interval_secs", self.routines.interval_secs)?;
        if self
            .devices
            .registration_token
            .as_deref()
            .is_some_and(|token| token.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "devices.registration_token must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep.interval_secs)
    }

    #[must_use]
    pub fn routine_interval(&self) -> Duration {
        Duration::from_secs(self.routines.interval_secs)
    }
}

fn check_interval(name: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 || secs > MAX_INTERVAL_SECS {
        return Err(ConfigError::Validation(format!(
            "{name} must be between 1 and {MAX_INTERVAL_SECS}, got {secs}"
        )));
    }
    Ok(())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:lightkeeper.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lightkeeperd=info,lightkeeper=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Default for RoutinesConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        let sendgrid = lightkeeper_adapter_email_sendgrid::Config::default();
        Self {
            api_key: sendgrid.api_key,
            from_email: sendgrid.from_email,
            endpoint: sendgrid.endpoint,
        }
    }
}

impl From<&EmailConfig> for lightkeeper_adapter_email_sendgrid::Config {
    fn from(email: &EmailConfig) -> Self {
        Self {
            api_key: email.api_key.clone(),
            from_email: email.from_email.clone(),
            endpoint: email.endpoint.clone(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, "sqlite:lightkeeper.db?mode=rwc");
        assert_eq!(config.sweep.interval_secs, 30);
        assert_eq!(config.routines.interval_secs, 60);
        assert!(config.email.api_key.is_none());
        assert_eq!(config.email.from_email, "noreply@example.com");
        assert!(config.devices.registration_token.is_none());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [sweep]
            interval_secs = 10

            [routines]
            interval_secs = 120

            [email]
            api_key = 'SG.key'
            from_email = 'lights@example.com'

            [devices]
            registration_token = 'wiring'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.sweep_interval(), Duration::from_secs(10));
        assert_eq!(config.routine_interval(), Duration::from_secs(120));
        assert_eq!(config.email.api_key.as_deref(), Some("SG.key"));
        assert_eq!(config.email.from_email, "lights@example.com");
        assert_eq!(
            config.email.endpoint,
            "https://api.sendgrid.com/v3/mail/send"
        );
        assert_eq!(config.devices.registration_token.as_deref(), Some("wiring"));
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_let_environment_win_over_file() {
        let mut config = Config::default();

        config.apply_overrides(env(&[
            ("LIGHTKEEPER_BIND", "127.0.0.1:8080"),
            ("LIGHTKEEPER_DATABASE_URL", "sqlite::memory:"),
            ("LIGHTKEEPER_LOG", "warn"),
            ("SENDGRID_API_KEY", "SG.env"),
            ("NOTIFY_FROM_EMAIL", "home@example.com"),
        ]));

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.logging.filter, "warn");
        assert_eq!(config.email.api_key.as_deref(), Some("SG.env"));
        assert_eq!(config.email.from_email, "home@example.com");
    }

    #[test]
    fn should_prefer_rust_log_over_own_log_variable() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("LIGHTKEEPER_LOG", "warn"), ("RUST_LOG", "trace")]));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_ignore_unparsable_port_and_empty_api_key() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("LIGHTKEEPER_PORT", "http"), ("SENDGRID_API_KEY", "")]));
        assert_eq!(config.server.port, 3000);
        assert!(config.email.api_key.is_none());
    }

    #[test]
    fn should_take_device_token_from_environment_unless_empty() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("LIGHTKEEPER_DEVICE_TOKEN", "")]));
        assert!(config.devices.registration_token.is_none());

        config.apply_overrides(env(&[("LIGHTKEEPER_DEVICE_TOKEN", "s3cret")]));
        assert_eq!(config.devices.registration_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn should_reject_blank_device_token() {
        let mut config = Config::default();
        config.devices.registration_token = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_out_of_range_intervals() {
        let mut config = Config::default();
        config.sweep.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.routines.interval_secs = 3_601;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_convert_email_section_to_notifier_config() {
        let config = Config::default();
        let sendgrid = lightkeeper_adapter_email_sendgrid::Config::from(&config.email);
        assert_eq!(sendgrid.endpoint, config.email.endpoint);
    }
}
