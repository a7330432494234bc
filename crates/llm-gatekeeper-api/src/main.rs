//! LLM Gatekeeper server

use anyhow::Context;
use llm_gatekeeper_api::router::create_router;
use llm_gatekeeper_api::{telemetry, AppState, Settings};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let settings = Settings::load().context("failed to load configuration")?;
    info!(model = ?settings.model, policy = ?settings.decision.policy, "configuration loaded");

    let mut state = AppState::from_settings(&settings).context("failed to build gateway")?;
    if settings.metrics.enabled {
        let handle = telemetry::install_metrics_recorder()
            .context("failed to install metrics recorder")?;
        state = state.with_metrics(handle);
    }
    info!(
        inbound = ?state.gateway.inbound_scanners(),
        outbound = ?state.gateway.outbound_scanners(),
        policy = state.gateway.policy_name(),
        "gateway ready"
    );

    let app = create_router(state);

    // PORT env (if set) was already folded into bind_addr
    let addr = settings.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("LLM Gatekeeper listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}
