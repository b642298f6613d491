use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

fn setup_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gpm=info,tower_http=info")),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();

    let state = gpm::initialize_state().await?;
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, state.config.port));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, name = %state.config.name, "server listening");

    axum::serve(listener, gpm::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
