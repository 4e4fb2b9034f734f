//! HTTP API consumed by the dashboard front-end.
//!
//! `GET /api/status` returns the monitor snapshot; two POST routes change the
//! transfer cap and the throttle at runtime.

use crate::monitor::{DynamicConfig, MonitorSnapshot, ProgressMonitor};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ThrottleRequest {
    pub enabled: bool,
    pub limit_mb: f64,
}

#[derive(Debug, Deserialize)]
pub struct ParallelRequest {
    pub max_parallel: usize,
}

pub fn router(monitor: Arc<ProgressMonitor>) -> Router {
    Router::new()
        .route("/api/status", get(api_status))
        .route("/api/config/throttle", post(set_throttle))
        .route("/api/config/parallel", post(set_parallel))
        .with_state(monitor)
}

async fn api_status(State(monitor): State<Arc<ProgressMonitor>>) -> Json<MonitorSnapshot> {
    Json(monitor.snapshot())
}

async fn set_throttle(
    State(monitor): State<Arc<ProgressMonitor>>,
    Json(req): Json<ThrottleRequest>,
) -> Result<Json<DynamicConfig>, StatusCode> {
    if !req.limit_mb.is_finite() || req.limit_mb < 0.0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    monitor.set_throttle(req.enabled, req.limit_mb);
    Ok(Json(monitor.dynamic_config()))
}

async fn set_parallel(
    State(monitor): State<Arc<ProgressMonitor>>,
    Json(req): Json<ParallelRequest>,
) -> Result<Json<DynamicConfig>, StatusCode> {
    if req.max_parallel == 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    monitor.set_max_parallel(req.max_parallel);
    Ok(Json(monitor.dynamic_config()))
}

/// Serves the API until the listener fails or the task is aborted.
pub async fn serve(listener: tokio::net::TcpListener, monitor: Arc<ProgressMonitor>) -> Result<()> {
    let addr = listener.local_addr().ok();
    tracing::info!("dashboard listening on {:?}", addr);
    axum::serve(listener, router(monitor))
        .await
        .context("dashboard server failed")
}

/// Fetches a snapshot from a running instance (`host:port` or a full base URL).
pub fn fetch_status(addr: &str) -> Result<MonitorSnapshot> {
    let base = if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", addr.replace("0.0.0.0", "127.0.0.1"))
    };
    let url = format!("{base}/api/status");

    let mut easy = curl::easy::Easy::new();
    easy.url(&url).context("invalid dashboard URL")?;
    easy.timeout(Duration::from_secs(10))?;
    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer
            .perform()
            .with_context(|| format!("GET {url} failed"))?;
    }
    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }
    serde_json::from_slice(&body).context("decode status snapshot")
}
