use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::relay::session::{DEFAULT_MODEL, DEFAULT_UPSTREAM_URL};
use crate::relay::RelaySettings;

/// Default location of the optional config file (any extension `config` understands)
pub const DEFAULT_CONFIG_PATH: &str = "config/voice-relay";

/// Environment variable holding the upstream bearer credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct UpstreamConfig {
    pub url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub turn_timeout_secs: u64,
    pub close_grace_ms: u64,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("turn_timeout_secs", &self.turn_timeout_secs)
            .field("close_grace_ms", &self.close_grace_ms)
            .finish()
    }
}

impl Config {
    /// Layer defaults, the optional config file, `VOICE_RELAY_*` variables
    /// and finally `OPENAI_API_KEY`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "voice-relay")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 3000)?
            .set_default("upstream.url", DEFAULT_UPSTREAM_URL)?
            .set_default("upstream.model", DEFAULT_MODEL)?
            .set_default("upstream.turn_timeout_secs", 10)?
            .set_default("upstream.close_grace_ms", 2000)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("VOICE_RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("upstream.api_key", std::env::var(API_KEY_ENV).ok())?
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }

    /// Upstream settings for the relay. Fails when no credential is configured.
    pub fn relay_settings(&self) -> Result<RelaySettings> {
        let api_key = self
            .upstream
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .with_context(|| format!("{} is not set", API_KEY_ENV))?;

        Ok(RelaySettings {
            url: self.upstream.url.clone(),
            model: self.upstream.model.clone(),
            api_key,
            turn_timeout: Duration::from_secs(self.upstream.turn_timeout_secs),
            close_grace: Duration::from_millis(self.upstream.close_grace_ms),
        })
    }
}
