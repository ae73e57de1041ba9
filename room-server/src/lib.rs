pub mod admin;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod eventbus;
pub mod handler;
pub mod i10n;
pub mod identity;
pub mod room;
pub mod security;
pub mod server;
pub mod state;

use crate::config::ServerConfig;
use crate::identity::IdentityClient;
use crate::security::SecurityStore;
use crate::state::ServerState;

/// Loads `server.toml`, `security.json`, and `monitors.txt` and assembles
/// the shared `ServerState` the accept loop, admin router, and console all
/// run against. Split out of `main` so integration tests can build the same
/// state against a throwaway config instead of touching the real files.
pub async fn bootstrap(config: ServerConfig) -> ServerState {
    let security = SecurityStore::load(config.security_store_path.clone()).await;
    let monitors = state::load_monitors(&config.monitors_path).await;
    let identity = IdentityClient::new(
        config.identity_base_url.clone(),
        config.identity_retry_attempts,
        config.identity_retry_wait_ms,
    );
    ServerState::new(config, security, monitors, identity)
}
