// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use yearbook::error::AppError;

async fn body_json(err: AppError) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_status_mapping() {
    let cases = [
        (AppError::Validation("Email is required".into()), StatusCode::BAD_REQUEST),
        (AppError::Auth("Invalid login credentials".into()), StatusCode::UNAUTHORIZED),
        (AppError::NotAuthenticated, StatusCode::UNAUTHORIZED),
        (AppError::Fetch("timeout".into()), StatusCode::BAD_GATEWAY),
        (AppError::Configuration("missing URL".into()), StatusCode::SERVICE_UNAVAILABLE),
        (
            AppError::Internal(anyhow::anyhow!("boom")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, expected) in cases {
        let kind = err.kind();
        let (status, _, body) = body_json(err).await;
        assert_eq!(status, expected, "{kind}");
        assert_eq!(body["error"], kind);
    }
}

#[tokio::test]
async fn test_validation_details_are_the_message() {
    let (_, _, body) = body_json(AppError::Validation("Passwords do not match".into())).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"], "Passwords do not match");
}

#[tokio::test]
async fn test_internal_details_are_hidden() {
    let (_, _, body) = body_json(AppError::Internal(anyhow::anyhow!("db password is hunter2"))).await;
    assert!(body.get("details").map_or(true, |d| d.is_null()));
}

#[tokio::test]
async fn test_rate_limited_sets_retry_after() {
    let (status, headers, body) = body_json(AppError::RateLimited {
        retry_after_secs: 42,
    })
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "42");
    assert_eq!(body["error"], "rate_limited");
    assert_eq!(
        body["details"],
        "Rate limit exceeded. Try again in 42 seconds."
    );
}

#[test]
fn test_client_side_errors() {
    assert!(AppError::Validation("x".into()).is_client_side());
    assert!(AppError::NotAuthenticated.is_client_side());
    assert!(AppError::RateLimited { retry_after_secs: 1 }.is_client_side());
    assert!(!AppError::Auth("x".into()).is_client_side());
    assert!(!AppError::Fetch("x".into()).is_client_side());
}
