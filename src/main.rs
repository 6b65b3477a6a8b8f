//! HTTP server for the capture-the-flag match.
//!
//! Configuration comes from the environment (see [`ServerConfig::from_env`]);
//! logging from `RUST_LOG` (default `info`).

use ctf_coordinator::{api, config, ServerConfig};
use log::info;
use std::net::SocketAddr;
use tokio::net::TcpListener;

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
    let config = ServerConfig::from_env();
    let app = api::create_router(&config);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(
        "listening on http://{} hostname={} event_log_capacity={} trust_forwarded_for={}",
        addr,
        config::hostname(),
        config.event_log_capacity,
        config.trust_forwarded_for
    );
    if let Some(ip) = config::lan_ipv4() {
        info!("players on the local network can join at http://{}:{}", ip, config.port);
    }
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
}
