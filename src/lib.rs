// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Yearbook: a profile directory with authentication, backed by a hosted
//! Supabase-compatible auth and data provider.
//!
//! The crate provides the session store, the paginated profile directory,
//! input validation and the JSON API that fronts them.

pub mod a11y;
pub mod boundary;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod perf;
pub mod provider;
pub mod routes;
pub mod services;
pub mod validation;

use config::Config;
use perf::PerformanceMonitor;
use provider::{AuthProvider, ProfileStore};
use services::{ProfileDirectory, SessionStore};
use std::sync::Arc;
use validation::RateLimiter;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: SessionStore,
    pub directory: Arc<ProfileDirectory>,
    pub rate_limiter: RateLimiter,
    pub monitor: Arc<PerformanceMonitor>,
}

impl AppState {
    /// Wire the store and directory to a provider. The session store is not
    /// mounted yet.
    pub fn new<P>(config: Config, provider: Arc<P>) -> Self
    where
        P: AuthProvider + ProfileStore + 'static,
    {
        let monitor = Arc::new(PerformanceMonitor::new());
        let session = SessionStore::new(provider.clone(), provider.clone(), &config);
        let directory = Arc::new(ProfileDirectory::new(provider, &config, monitor.clone()));
        Self {
            config,
            session,
            directory,
            rate_limiter: RateLimiter::default(),
            monitor,
        }
    }
}
