//! Environment configuration
//!
//! Backend endpoints and credentials come from the environment (optionally
//! through a `.env` file). Required credentials fail fast with the name of
//! the missing variable instead of silently doing nothing.

use std::env;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default local REST endpoint.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingVar(&'static str),
}

/// Backend endpoints recognized by the engine.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub api_base_url: String,
    pub tunnel_base_url: Option<String>,
    pub hosted_db_url: Option<String>,
    pub hosted_db_key: Option<String>,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl BackendConfig {
    /// Read configuration from the environment, loading `.env` first.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            api_base_url: non_empty_var("CENTRE_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            tunnel_base_url: non_empty_var("CENTRE_TUNNEL_URL"),
            hosted_db_url: non_empty_var("HOSTED_DB_URL"),
            hosted_db_key: non_empty_var("HOSTED_DB_KEY"),
        }
    }

    /// Tunneled endpoint, required when that backend is selected.
    pub fn tunnel(&self) -> Result<&str, ConfigError> {
        self.tunnel_base_url
            .as_deref()
            .ok_or(ConfigError::MissingVar("CENTRE_TUNNEL_URL"))
    }

    /// Hosted database credentials; either piece missing is a hard error.
    pub fn hosted_db(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .hosted_db_url
            .as_deref()
            .ok_or(ConfigError::MissingVar("HOSTED_DB_URL"))?;
        let key = self
            .hosted_db_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("HOSTED_DB_KEY"))?;
        Ok((url, key))
    }
}

/// Install a tracing subscriber honoring `RUST_LOG`. Safe to call more than
/// once; later calls are no-ops.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .try_init()
        .ok();
}
