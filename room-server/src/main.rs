use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use room_server::config::ServerConfig;
use room_server::{admin, bootstrap, console, server};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "fatal startup error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ServerConfig::load("server.toml").await?;
    let admin_listen_addr = config.admin_listen_addr.clone();
    let server_state = bootstrap(config).await;

    if let Some(admin_addr) = admin_listen_addr {
        let admin_state = server_state.clone();
        let listener = tokio::net::TcpListener::bind(&admin_addr).await?;
        tracing::info!(addr = %admin_addr, "admin http surface listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, admin::router(admin_state)).await {
                tracing::error!(error = %e, "admin http server exited");
            }
        });
    }

    tokio::spawn(console::run(server_state.clone()));

    server::run(server_state, server::shutdown_signal()).await?;
    tracing::info!("server shut down cleanly");
    Ok(())
}
