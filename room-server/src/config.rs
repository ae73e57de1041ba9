//! Runtime configuration, loaded from `server.toml` at startup. Generalizes
//! the reference server's `GameConfig.json` hot-reload pattern (a JSON file
//! parsed into a typed struct with `serde(default)` field handling) to this
//! server's single configuration document.

use serde::Deserialize;

fn default_listen_addr() -> String {
    "0.0.0.0:12346".to_string()
}

fn default_identity_base_url() -> String {
    "https://phira.5wyxi.com/".to_string()
}

fn default_security_store_path() -> String {
    "security.json".to_string()
}

fn default_monitors_path() -> String {
    "monitors.txt".to_string()
}

fn default_outbound_queue_high_water_mark() -> usize {
    256
}

fn default_writer_drain_timeout_ms() -> u64 {
    2_000
}

fn default_identity_retry_attempts() -> u32 {
    5
}

fn default_identity_retry_wait_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub identity_base_url: String,
    pub security_store_path: String,
    pub monitors_path: String,
    pub outbound_queue_high_water_mark: usize,
    pub writer_drain_timeout_ms: u64,
    pub identity_retry_attempts: u32,
    pub identity_retry_wait_ms: u64,
    pub admin_listen_addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            identity_base_url: default_identity_base_url(),
            security_store_path: default_security_store_path(),
            monitors_path: default_monitors_path(),
            outbound_queue_high_water_mark: default_outbound_queue_high_water_mark(),
            writer_drain_timeout_ms: default_writer_drain_timeout_ms(),
            identity_retry_attempts: default_identity_retry_attempts(),
            identity_retry_wait_ms: default_identity_retry_wait_ms(),
            admin_listen_addr: None,
        }
    }
}

impl ServerConfig {
    /// Reads `server.toml`, falling back to defaults (with a warning) if the
    /// file is missing. A malformed file that does exist is a startup error.
    pub async fn load(path: &str) -> anyhow::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path, "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
