//! # citadel-config
//!
//! Layered settings for the Citadel server: built-in defaults, then an optional
//! `citadel.toml`, then `CITADEL_*` environment variables (a `.env` file is
//! loaded into the environment first).

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

const ENV_PREFIX: &str = "CITADEL";
const DEFAULT_FILE: &str = "citadel";
const DEFAULT_ANONYMOUS_SECRET: &str = "anon_secret_key";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Shape of the merged sources before validation.
#[derive(Debug, Deserialize)]
struct RawSettings {
    host: String,
    port: u16,
    database_url: String,
    allowed_origins: Vec<String>,
    log_filter: String,
    log_json: bool,
    anonymous_secret: String,
}

#[derive(Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Origins allowed by the CORS policy
    pub allowed_origins: Vec<String>,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit structured JSON log lines instead of human-readable ones
    pub log_json: bool,
    /// Internal credential of the shared Anonymous identity
    pub anonymous_secret: SecretString,
}

impl Settings {
    /// Loads `.env`, `citadel.toml` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(Some(DEFAULT_FILE), None)
    }

    /// Merges the layers. `env_override` replaces the process environment,
    /// which keeps tests independent of each other.
    pub fn build(
        file: Option<&str>,
        env_override: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("database_url", "sqlite:citadel.db")?
            .set_default(
                "allowed_origins",
                vec!["http://localhost:5173", "http://127.0.0.1:5173"],
            )?
            .set_default("log_filter", "info")?
            .set_default("log_json", false)?
            .set_default("anonymous_secret", DEFAULT_ANONYMOUS_SECRET)?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("allowed_origins")
                .source(env_override),
        );

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        Self::validate(raw)
    }

    fn validate(raw: RawSettings) -> Result<Self, ConfigError> {
        if raw.port == 0 {
            return Err(ConfigError::Invalid("port must be nonzero".into()));
        }
        if raw.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid("database_url must not be empty".into()));
        }
        Ok(Self {
            host: raw.host,
            port: raw.port,
            database_url: raw.database_url,
            allowed_origins: raw
                .allowed_origins
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            log_filter: raw.log_filter,
            log_json: raw.log_json,
            anonymous_secret: SecretString::from(raw.anonymous_secret),
        })
    }

    /// True when the Anonymous credential was never configured.
    pub fn uses_default_anonymous_secret(&self) -> bool {
        self.anonymous_secret.expose_secret() == DEFAULT_ANONYMOUS_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_apply_without_sources() {
        let settings = Settings::build(None, env(&[])).unwrap();
        assert_eq!((settings.host.as_str(), settings.port), ("127.0.0.1", 8080));
        assert_eq!(settings.database_url, "sqlite:citadel.db");
        assert_eq!(settings.allowed_origins.len(), 2);
        assert!(settings.uses_default_anonymous_secret());
        assert!(!settings.log_json);
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let settings = Settings::build(
            None,
            env(&[
                ("CITADEL_PORT", "9090"),
                ("CITADEL_DATABASE_URL", "sqlite::memory:"),
                ("CITADEL_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
                ("CITADEL_ANONYMOUS_SECRET", "s3cret"),
                ("CITADEL_LOG_JSON", "true"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.port, 9090);
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(
            settings.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(settings.anonymous_secret.expose_secret(), "s3cret");
        assert!(settings.log_json);
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let err = Settings::build(None, env(&[("CITADEL_PORT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_secret_is_redacted_in_debug_output() {
        let settings =
            Settings::build(None, env(&[("CITADEL_ANONYMOUS_SECRET", "s3cret")])).unwrap();
        assert!(!format!("{settings:?}").contains("s3cret"));
    }
}
