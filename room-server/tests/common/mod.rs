//! Shared scaffolding for the integration tests below: a throwaway identity
//! backend standing in for the real phira identity service, and a real
//! `room-server` bound to an ephemeral port so tests drive it over actual
//! sockets rather than calling handler methods directly.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use protocol::{encode_frame, ClientBoundPacket, FrameDecoder, ServerBoundPacket, SUPPORTED_VERSION};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use room_server::config::ServerConfig;
use room_server::{bootstrap, server};

static SUFFIX: AtomicU64 = AtomicU64::new(0);

fn unique_path(label: &str) -> String {
    let n = SUFFIX.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!("room-server-it-{label}-{}-{n}", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

#[derive(Clone, Default)]
struct IdentityDirectory(Arc<Mutex<HashMap<String, (i32, String)>>>);

async fn me_handler(State(dir): State<IdentityDirectory>, headers: HeaderMap) -> impl IntoResponse {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(token) = token else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match dir.0.lock().await.get(token) {
        Some((id, name)) => Json(json!({ "id": id, "name": name })).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

/// A minimal stand-in for `phira.5wyxi.com/me`: registered bearer tokens
/// resolve to a fixed `{id, name}`, anything else is `401`.
pub struct MockIdentity {
    directory: IdentityDirectory,
    pub base_url: String,
}

impl MockIdentity {
    pub async fn spawn() -> Self {
        let directory = IdentityDirectory::default();
        let app = Router::new()
            .route("/me", get(me_handler))
            .with_state(directory.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock identity");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            directory,
            base_url: format!("http://{addr}/"),
        }
    }

    pub async fn register(&self, token: &str, user_id: i32, username: &str) {
        self.directory
            .0
            .lock()
            .await
            .insert(token.to_string(), (user_id, username.to_string()));
    }
}

/// A real `room-server` accept loop bound to `127.0.0.1:0`, running in a
/// background task for the lifetime of the test.
pub struct TestServer {
    pub addr: SocketAddr,
    pub identity: MockIdentity,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with_monitors(&[]).await
    }

    pub async fn spawn_with_monitors(monitor_ids: &[i32]) -> Self {
        let identity = MockIdentity::spawn().await;

        let monitors_path = unique_path("monitors");
        let monitors_text = monitor_ids.iter().map(i32::to_string).collect::<Vec<_>>().join("\n");
        tokio::fs::write(&monitors_path, monitors_text)
            .await
            .expect("write throwaway monitors file");

        let config = ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            identity_base_url: identity.base_url.clone(),
            security_store_path: unique_path("security.json"),
            monitors_path,
            identity_retry_attempts: 1,
            identity_retry_wait_ms: 1,
            ..ServerConfig::default()
        };

        let state = bootstrap(config).await;
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let _ = server::serve(state, listener, std::future::pending()).await;
        });

        Self { addr, identity }
    }

    pub async fn connect(&self) -> TestClient {
        TestClient::connect(self.addr).await
    }
}

/// A raw socket speaking this server's version-handshake + VarInt-framed
/// protocol, plus a small incoming-packet queue so tests can `send` then
/// `recv` without juggling partial reads themselves.
pub struct TestClient {
    stream: TcpStream,
    decoder: FrameDecoder,
    pending: VecDeque<ClientBoundPacket>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let mut stream = TcpStream::connect(addr).await.expect("connect to test server");
        stream.write_all(&[SUPPORTED_VERSION]).await.unwrap();
        let mut decoder = FrameDecoder::new();
        // The server never re-sends a handshake byte on its outbound half;
        // this decoder only ever needs to decode frames, so prime its
        // handshake state directly rather than feeding a synthetic byte.
        decoder.feed(&[SUPPORTED_VERSION]);
        Self {
            stream,
            decoder,
            pending: VecDeque::new(),
        }
    }

    pub async fn send(&mut self, packet: &ServerBoundPacket) {
        let frame = encode_frame(&packet.encode());
        self.stream.write_all(&frame).await.expect("write to test server");
    }

    /// Waits up to five seconds for the next packet, panicking on timeout.
    pub async fn recv(&mut self) -> ClientBoundPacket {
        self.recv_within(Duration::from_secs(5))
            .await
            .expect("timed out waiting for a packet")
    }

    pub async fn recv_within(&mut self, timeout: Duration) -> Option<ClientBoundPacket> {
        if let Some(packet) = self.pending.pop_front() {
            return Some(packet);
        }
        tokio::time::timeout(timeout, self.fill_pending()).await.ok()?;
        self.pending.pop_front()
    }

    /// Reads until at least one frame decodes, or the peer closes the
    /// connection (in which case `pending` is simply left empty).
    async fn fill_pending(&mut self) {
        let mut buf = [0u8; 4096];
        loop {
            let n = self.stream.read(&mut buf).await.expect("read from test server");
            if n == 0 {
                return;
            }
            self.decoder.feed(&buf[..n]);
            let frames = self.decoder.decode_frames().expect("framing error from test server");
            if frames.is_empty() {
                continue;
            }
            for mut frame in frames {
                self.pending
                    .push_back(ClientBoundPacket::decode(&mut frame).expect("malformed packet from test server"));
            }
            return;
        }
    }

    /// Asserts no packet arrives within `timeout` — used to confirm a
    /// non-host's action was silently rejected rather than broadcast.
    pub async fn assert_silent(&mut self, timeout: Duration) {
        if let Some(packet) = self.recv_within(timeout).await {
            panic!("expected silence, got {packet:?}");
        }
    }
}
