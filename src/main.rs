// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Yearbook API Server
//!
//! Serves the profile directory and account endpoints on top of a hosted
//! Supabase-compatible provider.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yearbook::{config::Config, provider::SupabaseClient, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        page_size = config.page_size,
        placeholders = config.placeholder_profiles,
        "Starting Yearbook API"
    );

    // A missing provider URL or key is not fatal: every provider-backed call
    // reports the configuration error instead.
    let provider = Arc::new(SupabaseClient::new(&config).expect("Failed to build HTTP client"));
    if !provider.is_configured() {
        tracing::warn!("Provider not configured; running in degraded mode");
    }

    let state = Arc::new(AppState::new(config.clone(), provider));

    // Restore the previous session in the background; guarded routes answer
    // "loading" until it resolves.
    let session = state.session.clone();
    tokio::spawn(async move { session.mount().await });

    // Sweep idle rate-limit entries once per window.
    let limiter_state = state.clone();
    tokio::spawn(async move {
        let limiter = &limiter_state.rate_limiter;
        let mut interval = tokio::time::interval(limiter.window());
        loop {
            interval.tick().await;
            limiter.prune();
        }
    });

    let app = yearbook::routes::create_router(state.clone());

    // Start server
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.session.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("yearbook=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
