//! The concurrency boundary of the system: one `Connection` per socket.
//!
//! Grounded on the reference relay server's `to_host_sender` /
//! `PlayerSender` idiom (an `mpsc::Sender<Bytes>` feeding a single writer
//! task) generalized from a broadcast fan-out to a private outbound queue
//! per connection, since here each connection's bytes are distinct framed
//! packets rather than one shared game-state stream.
//!
//! `Connection` is a cheap `Clone`-able handle: a `Room` holds one per
//! member purely as a lookup key (the original's `RoomUser.connection`
//! back-reference), never owning the socket. The socket itself, and the
//! single writer task that serialises all sends onto it, live behind the
//! shared `Inner`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use protocol::{encode_frame, ClientBoundPacket};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    pub high_water_mark: usize,
    pub drain_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            high_water_mark: 256,
            drain_timeout: Duration::from_secs(2),
        }
    }
}

type CloseHook = Box<dyn FnOnce() + Send>;

struct Inner {
    peer_addr: SocketAddr,
    outbound: mpsc::Sender<Bytes>,
    closed: AtomicBool,
    close_signal: Arc<Notify>,
    drain_timeout: Duration,
    writer_handle: AsyncMutex<Option<JoinHandle<()>>>,
    close_hook: AsyncMutex<Option<CloseHook>>,
}

#[derive(Clone)]
pub struct Connection(Arc<Inner>);

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Connection {}

impl Connection {
    /// Spawns the single writer task owning `write_half` and returns the
    /// handle other components use to enqueue sends and request a close.
    pub fn spawn(write_half: OwnedWriteHalf, peer_addr: SocketAddr, config: ConnectionConfig) -> Self {
        let (outbound, rx) = mpsc::channel(config.high_water_mark.max(1));
        let close_signal = Arc::new(Notify::new());
        let writer_handle = tokio::spawn(writer_loop(
            write_half,
            rx,
            close_signal.clone(),
            config.drain_timeout,
        ));

        Connection(Arc::new(Inner {
            peer_addr,
            outbound,
            closed: AtomicBool::new(false),
            close_signal,
            drain_timeout: config.drain_timeout,
            writer_handle: AsyncMutex::new(Some(writer_handle)),
            close_hook: AsyncMutex::new(None),
        }))
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.0.peer_addr
    }

    pub fn is_closed(&self) -> bool {
        self.0.closed.load(Ordering::SeqCst)
    }

    /// A handle to the same `Notify` the writer task waits on, so a reader
    /// task can race a socket read against connection close.
    pub fn closed_notify(&self) -> Arc<Notify> {
        self.0.close_signal.clone()
    }

    /// Registers the callback invoked exactly once when this connection
    /// closes (whether by explicit `close()`, a decode error, a write
    /// error, or backpressure). Intended to be set once, right after the
    /// version handshake, before any frames are processed.
    pub async fn set_close_hook(&self, hook: impl FnOnce() + Send + 'static) {
        *self.0.close_hook.lock().await = Some(Box::new(hook));
    }

    /// Enqueues `packet`'s framed encoding for delivery. Never blocks: a
    /// full queue is backpressure, and the connection is closed rather than
    /// grown unboundedly.
    pub fn send(&self, packet: &ClientBoundPacket) {
        if self.is_closed() {
            return;
        }
        let framed = Bytes::from(encode_frame(&packet.encode()));
        match self.0.outbound.try_send(framed) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(peer = %self.peer_addr(), "outbound queue full, closing connection");
                let this = self.clone();
                tokio::spawn(async move { this.close().await });
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Idempotent close. Signals the writer to drain-then-stop, waits for
    /// it up to the configured timeout (aborting it if that elapses), then
    /// invokes the close hook exactly once.
    pub async fn close(&self) {
        if self.0.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.0.close_signal.notify_waiters();

        if let Some(handle) = self.0.writer_handle.lock().await.take() {
            let wait = self.0.drain_timeout + Duration::from_millis(200);
            if tokio::time::timeout(wait, handle).await.is_err() {
                tracing::warn!(peer = %self.peer_addr(), "writer task did not stop in time");
            }
        }

        if let Some(hook) = self.0.close_hook.lock().await.take() {
            hook();
        }
    }
}

async fn writer_loop(
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Bytes>,
    close_signal: Arc<Notify>,
    drain_timeout: Duration,
) {
    loop {
        tokio::select! {
            biased;
            _ = close_signal.notified() => {
                let _ = tokio::time::timeout(drain_timeout, async {
                    while let Ok(frame) = rx.try_recv() {
                        if write_half.write_all(&frame).await.is_err() {
                            break;
                        }
                    }
                }).await;
                break;
            }
            maybe_frame = rx.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        if let Err(e) = write_half.write_all(&frame).await {
                            tracing::warn!(error = %e, "write error, closing connection");
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
    let _ = write_half.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{ClientBoundPacket, FrameDecoder, RoomOpResult};
    use std::sync::atomic::AtomicUsize;
    use tokio::net::{TcpListener, TcpStream};

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let (accept_result, connect_result) = tokio::join!(listener.accept(), connect);
        (accept_result.unwrap().0, connect_result.unwrap())
    }

    #[tokio::test]
    async fn sends_are_written_in_enqueue_order() {
        let (server_stream, mut client_stream) = loopback_pair().await;
        let (_read_half, write_half) = server_stream.into_split();
        let conn = Connection::spawn(
            write_half,
            "127.0.0.1:1".parse().unwrap(),
            ConnectionConfig::default(),
        );

        conn.send(&ClientBoundPacket::CreateRoomResult(RoomOpResult::Success));
        conn.send(&ClientBoundPacket::LeaveRoomResult(RoomOpResult::Failed {
            reason: "x".into(),
        }));

        use tokio::io::AsyncReadExt;
        // Handshake byte is the caller's job; here we read two raw frames.
        let mut buf = vec![0u8; 256];
        let mut total = 0;
        // Read until we believe both frames arrived (best-effort for test).
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let n = client_stream.read(&mut buf).await.unwrap();
        total += n;
        assert!(total > 0);

        let mut decoder = FrameDecoder::new();
        decoder.feed(&[protocol::SUPPORTED_VERSION]);
        decoder.feed(&buf[..total]);
        let frames = decoder.decode_frames().unwrap();
        assert_eq!(frames.len(), 2);
        let p1 = ClientBoundPacket::decode(&mut frames[0].clone()).unwrap();
        let p2 = ClientBoundPacket::decode(&mut frames[1].clone()).unwrap();
        assert_eq!(p1, ClientBoundPacket::CreateRoomResult(RoomOpResult::Success));
        assert_eq!(
            p2,
            ClientBoundPacket::LeaveRoomResult(RoomOpResult::Failed { reason: "x".into() })
        );
    }

    #[tokio::test]
    async fn close_is_idempotent_and_invokes_hook_once() {
        let (server_stream, _client_stream) = loopback_pair().await;
        let (_read_half, write_half) = server_stream.into_split();
        let conn = Connection::spawn(
            write_half,
            "127.0.0.1:1".parse().unwrap(),
            ConnectionConfig::default(),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        conn.set_close_hook(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        conn.close().await;
        conn.close().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn send_after_close_is_a_silent_no_op() {
        let (server_stream, _client_stream) = loopback_pair().await;
        let (_read_half, write_half) = server_stream.into_split();
        let conn = Connection::spawn(
            write_half,
            "127.0.0.1:1".parse().unwrap(),
            ConnectionConfig::default(),
        );
        conn.close().await;
        conn.send(&ClientBoundPacket::CreateRoomResult(RoomOpResult::Success));
    }
}
