use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use omnia_gateway::api::{self, ApiState};
use omnia_gateway::{GatewayConfig, ServiceGateway};
use omnia_quota_tracker::{QuotaTracker, QuotaTrackerConfig, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env().context("Failed to load gateway configuration")?;
    init_tracing(&config.log_level)?;

    let quota_config =
        QuotaTrackerConfig::from_env().context("Failed to load quota configuration")?;

    info!(
        addr = %config.listen_addr(),
        data_dir = %quota_config.data_dir.display(),
        store = ?quota_config.store,
        "starting omnia gateway"
    );

    for (variable, key) in [
        ("WEATHER_API_KEY", &config.weather_api_key),
        ("SEARCH_API_KEY", &config.search_api_key),
        ("ASSISTANT_API_KEY", &config.assistant_api_key),
    ] {
        if key.is_none() {
            warn!(variable, "credential not set; requests to this service will be refused");
        }
    }

    let tracker = Arc::new(QuotaTracker::new(
        quota_config.open_store()?,
        quota_config.limits(),
        Arc::new(SystemClock),
    ));

    match tracker.snapshot() {
        Ok(usage) => {
            for service in usage {
                info!(
                    service = %service.service_id,
                    used = service.used,
                    limit = service.limit,
                    "restored usage ledger"
                );
            }
        }
        Err(err) => warn!(error = %err, "failed to read usage ledger at startup"),
    }

    let gateway = Arc::new(ServiceGateway::new(&config, tracker)?);
    let state = Arc::new(ApiState::new(gateway, config.session_limits()));
    let router = api::create_router(state, config.request_timeout());

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("omnia gateway shutting down");
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
