//! The TCP accept loop. Grounded on the reference relay server's axum `/ws`
//! upgrade handler — same shape (accept, handshake, split into two tasks,
//! run a receive loop until EOF/error) generalized from a WebSocket upgrade
//! to a raw TCP socket doing its own version handshake and framing.

use std::time::Duration;

use protocol::{FrameDecoder, ServerBoundPacket};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use crate::connection::{Connection, ConnectionConfig};
use crate::handler::Handler;
use crate::security::BanType;
use crate::state::ServerState;

/// Binds `state.config().listen_addr` and accepts connections until
/// `shutdown` resolves. Each connection is handled on its own task; this
/// function returns once the listener itself is torn down.
pub async fn run(state: ServerState, shutdown: impl std::future::Future<Output = ()>) -> std::io::Result<()> {
    let listener = TcpListener::bind(&state.config().listen_addr).await?;
    tracing::info!(addr = %state.config().listen_addr, "listening");
    serve(state, listener, shutdown).await
}

/// Same as [`run`], but over an already-bound listener — lets a caller (the
/// test harness) bind to an ephemeral port and read back the real address
/// before the accept loop starts.
pub async fn serve(
    state: ServerState,
    listener: TcpListener,
    shutdown: impl std::future::Future<Output = ()>,
) -> std::io::Result<()> {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(state, stream, peer_addr).await {
                                tracing::debug!(%peer_addr, error = %e, "connection ended with an error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
    Ok(())
}

async fn handle_connection(
    state: ServerState,
    stream: TcpStream,
    peer_addr: std::net::SocketAddr,
) -> std::io::Result<()> {
    let ip = peer_addr.ip().to_string();
    {
        let mut security = state.security().lock().await;
        if security.is_blacklisted_ip(&ip) || security.is_banned(BanType::Ip, &ip).is_some() {
            tracing::info!(%peer_addr, "rejecting connection from blacklisted/banned ip");
            return Ok(());
        }
    }

    let (mut read_half, write_half) = stream.into_split();
    let conn = Connection::spawn(
        write_half,
        peer_addr,
        ConnectionConfig {
            high_water_mark: state.config().outbound_queue_high_water_mark,
            drain_timeout: Duration::from_millis(state.config().writer_drain_timeout_ms),
        },
    );

    let mut handler = Handler::new(state, conn.clone());
    let mut decoder = FrameDecoder::new();
    let mut read_buf = [0u8; 4096];
    let closed = conn.closed_notify();

    loop {
        if conn.is_closed() {
            break;
        }
        tokio::select! {
            _ = closed.notified() => break,
            read_result = read_half.read(&mut read_buf) => {
                match read_result {
                    Ok(0) => break,
                    Ok(n) => {
                        decoder.feed(&read_buf[..n]);
                        match decoder.decode_frames() {
                            Ok(frames) => {
                                for mut frame in frames {
                                    match ServerBoundPacket::decode(&mut frame) {
                                        Ok(packet) => {
                                            if !handler.handle(packet).await {
                                                conn.close().await;
                                                handler.on_disconnect().await;
                                                return Ok(());
                                            }
                                        }
                                        Err(e) => {
                                            tracing::debug!(%peer_addr, error = %e, "malformed packet, closing");
                                            conn.close().await;
                                            handler.on_disconnect().await;
                                            return Ok(());
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::debug!(%peer_addr, error = %e, "framing error, closing");
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::debug!(%peer_addr, error = %e, "read error, closing");
                        break;
                    }
                }
            }
        }
    }

    conn.close().await;
    handler.on_disconnect().await;
    Ok(())
}

/// Resolves once an OS shutdown signal (Ctrl-C, or SIGTERM on unix) arrives.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
