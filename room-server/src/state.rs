//! The server's shared mutable state, bundled into one `Arc`-able struct so
//! the accept loop, the packet handler, the admin HTTP router, and the
//! stdin console can all hold a cheap clone of the same handle. Grounded on
//! the reference relay server's `AppState` (an `Arc<Mutex<Rooms>>` plus a
//! `Config` shared the same way across its axum handlers and watchdog task).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::eventbus::EventBus;
use crate::identity::IdentityClient;
use crate::room::RoomsTable;
use crate::security::SecurityStore;

/// `ServerState` is itself the `Arc`: cloning it clones a handle, not the
/// data. Every field with interior mutability is locked independently, so a
/// lookup in the online table never waits on a rooms-table mutation.
#[derive(Clone)]
pub struct ServerState(Arc<Inner>);

struct Inner {
    pub rooms: AsyncMutex<RoomsTable>,
    pub online: AsyncMutex<std::collections::HashMap<i32, Connection>>,
    pub security: AsyncMutex<SecurityStore>,
    pub monitors: HashSet<i32>,
    pub config: ServerConfig,
    pub events: EventBus,
    pub identity: IdentityClient,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        security: SecurityStore,
        monitors: HashSet<i32>,
        identity: IdentityClient,
    ) -> Self {
        ServerState(Arc::new(Inner {
            rooms: AsyncMutex::new(RoomsTable::new()),
            online: AsyncMutex::new(std::collections::HashMap::new()),
            security: AsyncMutex::new(security),
            monitors,
            config,
            events: EventBus::new(),
            identity,
        }))
    }

    pub fn rooms(&self) -> &AsyncMutex<RoomsTable> {
        &self.0.rooms
    }

    pub fn online(&self) -> &AsyncMutex<std::collections::HashMap<i32, Connection>> {
        &self.0.online
    }

    pub fn security(&self) -> &AsyncMutex<SecurityStore> {
        &self.0.security
    }

    pub fn is_monitor(&self, user_id: i32) -> bool {
        self.0.monitors.contains(&user_id)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.0.config
    }

    pub fn events(&self) -> &EventBus {
        &self.0.events
    }

    pub fn identity(&self) -> &IdentityClient {
        &self.0.identity
    }
}

/// Reads a newline-separated list of monitor user ids, one per line,
/// blank lines and `#`-prefixed comments ignored. Matches
/// `original_source`'s `monitors.txt` loader in `main.py`.
pub async fn load_monitors(path: &str) -> HashSet<i32> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(_) => {
            tracing::warn!(path, "no monitors file found, starting with an empty set");
            return HashSet::new();
        }
    };
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.parse::<i32>().ok())
        .collect()
}
