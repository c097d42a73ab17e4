// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Development diagnostics. Only built with the `dev-routes` feature.

use crate::perf::MetricStats;
use crate::services::SessionState;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/dev/diagnostics", get(diagnostics))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Error,
}

#[derive(Serialize)]
pub struct DiagnosticsResponse {
    pub connection: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_error: Option<String>,
    pub profiles: Option<u64>,
    pub badges: usize,
    pub session: SessionState,
    pub provider_configured: bool,
    pub metrics: HashMap<String, MetricStats>,
}

/// Provider connectivity, table sizes, store state and timing metrics.
async fn diagnostics(State(state): State<Arc<AppState>>) -> Json<DiagnosticsResponse> {
    let (count, badges) = tokio::join!(
        state.directory.total_profiles(),
        state.directory.badges()
    );

    let (connection, connection_error, profiles) = match count {
        Ok(n) => (ConnectionStatus::Connected, None, Some(n)),
        Err(e) => {
            tracing::warn!(error = %e, "Diagnostics connection check failed");
            (ConnectionStatus::Error, Some(e.to_string()), None)
        }
    };

    Json(DiagnosticsResponse {
        connection,
        connection_error,
        profiles,
        badges: badges.len(),
        session: state.session.snapshot().state,
        provider_configured: state.config.provider_credentials().is_ok(),
        metrics: state.monitor.snapshot(),
    })
}
