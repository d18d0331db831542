//! Dispenser gateway
//!
//! Single-binary HTTP service the chat transport calls to hand out pooled
//! account records:
//! 1. Resolves a command trigger to a pool and distribution policy
//! 2. Enforces the per-user cooldown
//! 3. Draws a record through the distribution engine
//! 4. Reports stock levels and pool health
//!
//! The gateway performs no chat-protocol work and no authorization; it
//! trusts the transport-supplied user identity.

mod config;
mod cooldown;
mod metrics;
mod registry;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dispenser::Engine;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::cooldown::CooldownMap;
use crate::registry::Registry;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    engine: Arc<Engine>,
    cooldowns: Arc<CooldownMap>,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/draw", post(draw_handler))
        .route("/stock/{pool}", get(stock_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting dispenser-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        data_dir = %config.server.data_dir.display(),
        pools = config.pools.len(),
        commands = config.commands.len(),
        "configuration loaded"
    );

    let state = AppState {
        registry: Arc::new(Registry::from_config(&config)),
        engine: Arc::new(Engine::new()),
        cooldowns: Arc::new(CooldownMap::new()),
        prometheus,
    };

    // Publish initial stock levels
    for (name, pool) in state.registry.pools() {
        let count = pool.size().await;
        info!(pool = %name, records = count, "pool registered");
        metrics::set_pool_records(name, count);
    }

    let app = build_router(state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

#[derive(Debug, Deserialize)]
struct DrawRequest {
    command: String,
    user: String,
}

/// Draw one record for a user.
///
/// The cooldown is armed only after a successful delivery, so an
/// out-of-stock or failed draw never burns the user's attempt.
async fn draw_handler(State(state): State<AppState>, Json(request): Json<DrawRequest>) -> Response {
    let request_id = format!("draw_{}", uuid::Uuid::new_v4().as_simple());
    let started = Instant::now();

    let Some(spec) = state.registry.command(&request.command) else {
        metrics::record_draw(
            &request.command,
            "unknown_command",
            started.elapsed().as_secs_f64(),
        );
        return error_response(
            StatusCode::NOT_FOUND,
            "unknown_command",
            format!("no command matches '{}'", request.command),
            &request_id,
        );
    };

    if let Some(remaining) = state.cooldowns.remaining(&request.user, &spec.trigger).await {
        let secs = remaining.as_secs();
        metrics::record_draw(&spec.trigger, "cooldown", started.elapsed().as_secs_f64());
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": {
                    "type": "cooldown",
                    "message": format!("wait {secs}s before using this command again"),
                    "retry_after_secs": secs,
                    "request_id": request_id,
                }
            })),
        )
            .into_response();
    }

    match state.engine.draw(&spec.pool, spec.policy).await {
        Ok(Some(record)) => {
            state
                .cooldowns
                .arm(&request.user, &spec.trigger, spec.cooldown)
                .await;

            let mut body = serde_json::json!({
                "command": spec.trigger,
                "record": record.into_string(),
            });
            if spec.announce_stock {
                let remaining = spec.pool.size().await;
                metrics::set_pool_records(&spec.pool_name, remaining);
                body["remaining"] = remaining.into();
            }

            info!(
                request_id,
                command = %spec.trigger,
                policy = spec.policy.label(),
                "record delivered"
            );
            metrics::record_draw(&spec.trigger, "delivered", started.elapsed().as_secs_f64());
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(None) => {
            // Normal outcome, not an error: the pool is simply empty
            info!(request_id, command = %spec.trigger, "pool out of stock");
            metrics::record_draw(&spec.trigger, "out_of_stock", started.elapsed().as_secs_f64());
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "out_of_stock",
                format!("no records available for '{}'", spec.trigger),
                &request_id,
            )
        }
        Err(e) => {
            error!(request_id, command = %spec.trigger, error = %e, "draw failed to persist");
            metrics::record_draw(&spec.trigger, "persist_error", started.elapsed().as_secs_f64());
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "persist_error",
                "delivery was not recorded, try again".into(),
                &request_id,
            )
        }
    }
}

/// Stock count for one pool. Best-effort snapshot taken without the draw
/// lock; it may race benignly with concurrent consume draws.
async fn stock_handler(State(state): State<AppState>, Path(pool_name): Path<String>) -> Response {
    let request_id = format!("stock_{}", uuid::Uuid::new_v4().as_simple());
    match state.registry.pool(&pool_name) {
        Some(pool) => {
            let count = pool.size().await;
            metrics::set_pool_records(&pool_name, count);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "pool": pool_name, "records": count })),
            )
                .into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            "unknown_pool",
            format!("no pool named '{pool_name}'"),
            &request_id,
        ),
    }
}

/// Pool health summary.
///
/// Status mapping: all pools stocked → healthy, some stocked → degraded,
/// none stocked (or no pools) → unhealthy with 503.
async fn health_handler(State(state): State<AppState>) -> Response {
    let mut pools = Vec::new();
    let mut total = 0usize;
    let mut stocked = 0usize;

    for (name, pool) in state.registry.pools() {
        let count = pool.size().await;
        total += 1;
        if count > 0 {
            stocked += 1;
        }
        pools.push(serde_json::json!({ "pool": name, "records": count }));
    }

    let status = if total > 0 && stocked == total {
        "healthy"
    } else if stocked > 0 {
        "degraded"
    } else {
        "unhealthy"
    };
    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "pools_total": total,
            "pools_stocked": stocked,
            "pools": pools,
        })),
    )
        .into_response()
}

/// Prometheus metrics endpoint, serving the text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

fn error_response(
    status: StatusCode,
    error_type: &str,
    message: String,
    request_id: &str,
) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": {
                "type": error_type,
                "message": message,
                "request_id": request_id,
            }
        })),
    )
        .into_response()
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
