// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error boundary: run a fallible child and render a fallback instead of
//! letting an error or panic escape.

use crate::error::{AppError, Result};
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

/// Wraps a child computation. Errors and panics are logged and replaced by
/// whatever `fallback` renders for them.
pub struct ErrorBoundary<F> {
    name: &'static str,
    fallback: F,
}

impl<F> ErrorBoundary<F> {
    pub fn new(fallback: F) -> Self {
        Self {
            name: "boundary",
            fallback,
        }
    }

    /// Label used in log lines.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn render<T>(&self, child: impl FnOnce() -> Result<T>) -> T
    where
        F: Fn(AppError) -> T,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(child))
            .unwrap_or_else(|payload| Err(panicked(payload)));
        self.settle(outcome)
    }

    pub async fn render_async<T, Fut>(&self, child: Fut) -> T
    where
        F: Fn(AppError) -> T,
        Fut: Future<Output = Result<T>>,
    {
        let outcome = AssertUnwindSafe(child)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panicked(payload)));
        self.settle(outcome)
    }

    fn settle<T>(&self, outcome: Result<T>) -> T
    where
        F: Fn(AppError) -> T,
    {
        match outcome {
            Ok(value) => value,
            Err(e) => {
                if e.is_client_side() {
                    tracing::debug!(boundary = self.name, error = %e, "Rendering fallback");
                } else {
                    tracing::warn!(boundary = self.name, error = %e, kind = e.kind(), "Rendering fallback");
                }
                (self.fallback)(e)
            }
        }
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> AppError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    AppError::Internal(anyhow::anyhow!("Panicked: {}", message))
}

/// Boundary used by the HTTP handlers: errors become JSON error responses.
pub fn json_boundary() -> ErrorBoundary<fn(AppError) -> Response> {
    let fallback: fn(AppError) -> Response = <AppError as IntoResponse>::into_response;
    ErrorBoundary::new(fallback).named("http")
}
