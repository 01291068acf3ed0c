//! Application configuration management.
//!
//! Configuration is read from environment variables with the `envy` crate,
//! after an optional `.env` file has been loaded by `dotenvy`.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `RECURRING_ENABLED` (optional): run the recurring-transaction job, defaults to true
/// - `RECURRING_INTERVAL_SECS` (optional): seconds between job runs, defaults to one day
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_recurring_enabled")]
    pub recurring_enabled: bool,

    #[serde(default = "default_recurring_interval_secs")]
    pub recurring_interval_secs: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_recurring_enabled() -> bool {
    true
}

fn default_recurring_interval_secs() -> u64 {
    24 * 60 * 60
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a value cannot be
    /// parsed into its expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        // Missing .env is fine
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// Interval between recurring-transaction runs. Never shorter than a minute.
    pub fn recurring_interval(&self) -> Duration {
        Duration::from_secs(self.recurring_interval_secs.max(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = from_pairs(&[("DATABASE_URL", "postgres://localhost/np")]).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.database_max_connections, 5);
        assert!(config.recurring_enabled);
        assert_eq!(config.recurring_interval(), Duration::from_secs(86_400));
    }

    #[test]
    fn database_url_is_required() {
        assert!(from_pairs(&[("SERVER_PORT", "8080")]).is_err());
    }

    #[test]
    fn recurring_interval_has_a_floor() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/np"),
            ("RECURRING_INTERVAL_SECS", "5"),
            ("RECURRING_ENABLED", "false"),
        ])
        .unwrap();
        assert!(!config.recurring_enabled);
        assert_eq!(config.recurring_interval(), Duration::from_secs(60));
    }
}
