use std::process::ExitCode;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cloudcharge_web::api::{ApiClient, ApiError};
use cloudcharge_web::config::{AppConfig, ConfigError};
use cloudcharge_web::feed::StationFeed;
use cloudcharge_web::session::{SessionHandle, SessionStore};
use cloudcharge_web::web::{AppState, create_router};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("backend client: {0}")]
    Api(#[from] ApiError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cloudcharge_web=info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "cloudcharge-web failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    info!(api = %config.api_base_url, "using CloudCharge backend");

    let api = ApiClient::new(config.api_config())?;
    let session = SessionHandle::load(SessionStore::new(&config.session_file));

    // The first tick fetches immediately, so pages usually find stations ready.
    let feed = StationFeed::new(api.clone());
    let supervisor = feed.spawn(config.poll_interval);

    let state = AppState::new(
        api,
        session,
        feed,
        config.tariff,
        config.geolocation_timeout,
    );
    let app = create_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("CloudCharge listening on http://{}", config.bind);
    info!("Open http://{} in your browser.", config.bind);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    supervisor.shutdown().await;

    served.map_err(StartupError::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
