use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use tracing::{error, info};
use wavy::common::types::AnyResult;
use wavy::server::{AppState, InstanceGuard};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = wavy::configs::Config::load()?;

    let _log_guard = wavy::common::logger::init(&config);

    wavy::common::banner::print_banner(&wavy::common::banner::BannerInfo::default());

    info!("Wavy Server starting...");

    let state = Arc::new(AppState::new(config.clone())?);

    // One server per storage root; held until exit.
    let _instance_guard = InstanceGuard::acquire(state.layout.storage_root())?;

    let usage = wavy::storage::rebuild_index(&state.layout, &state.index)?;
    for owner_usage in &usage {
        state.metrics.seed_owner(
            &owner_usage.owner,
            owner_usage.songs as i64,
            owner_usage.storage_bytes as i64,
        );
    }

    let app = wavy::server::routes::router(state.clone());

    let ip: std::net::IpAddr = config.server.host.parse()?;
    let address = SocketAddr::from((ip, config.server.port));

    let tls = RustlsConfig::from_pem_file(&config.server.cert, &config.server.key).await?;

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    let grace = Duration::from_secs(config.server.shutdown_grace_sec);
    tokio::spawn(async move {
        match wavy::server::shutdown::wait_for_signal().await {
            Ok(signal) => {
                info!(signal, "termination signal received, draining connections");
                shutdown_handle.graceful_shutdown(Some(grace));
            }
            Err(err) => error!(error = %err, "signal handler failed"),
        }
    });

    info!("Wavy Server listening on {}", address);

    axum_server::bind_rustls(address, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    info!("Shutdown complete");
    Ok(())
}
