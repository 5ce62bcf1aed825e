// src/main.rs
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use attendance_poll_backend::{build_state, create_routes, Config};
use axum_server::Handle;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), io::Error> {
    dotenvy::dotenv().ok(); // Load environment variables from .env file

    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::parse();
    let address = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = build_state(config).await.map_err(io::Error::other)?;
    let app = create_routes(state);

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    info!(%address, "attendance service listening");
    axum_server::bind(address)
        .handle(handle)
        .serve(app.into_make_service())
        .await
}

async fn shutdown_signal(handle: Handle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested, draining connections");
        handle.graceful_shutdown(Some(Duration::from_secs(10)));
    }
}
