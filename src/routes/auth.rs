// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: sign-in, sign-up, sign-out and password reset.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::boundary::json_boundary;
use crate::error::AppError;
use crate::models::Session;
use crate::provider::{SignUpMetadata, SignUpOutcome};
use crate::services::SessionState;
use crate::validation::{validate_sign_up, SignUpForm};
use crate::AppState;

const SIGN_UP_PENDING: &str = "Account created! Please check your email to verify your account.";
const RESET_SENT: &str = "Password reset email sent! Check your inbox.";

/// Routes only available while signed out. The guard is applied in
/// routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth", get(auth_screen))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/reset-password", post(reset_password))
}

/// Sign-out works in any state.
pub fn sign_out_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/sign-out", post(sign_out))
}

#[derive(Serialize)]
pub struct AuthScreenResponse {
    pub state: SessionState,
    pub error: Option<String>,
}

async fn auth_screen(State(state): State<Arc<AppState>>) -> Json<AuthScreenResponse> {
    let snapshot = state.session.snapshot();
    Json(AuthScreenResponse {
        state: snapshot.state,
        error: snapshot.error,
    })
}

/// Public view of a session. Tokens never leave the server.
#[derive(Serialize)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            email: session.email.clone(),
            expires_at: session.token.expires_at,
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

/// Rate-limit key for a credential endpoint.
fn attempt_key(action: &str, email: &str) -> String {
    format!("{}:{}", action, email.trim().to_lowercase())
}

async fn sign_in(State(state): State<Arc<AppState>>, Json(body): Json<SignInRequest>) -> Response {
    json_boundary()
        .render_async(async move {
            let key = attempt_key("sign-in", &body.email);
            state.rate_limiter.check(&key).into_result()?;

            let session = state.session.sign_in(&body.email, &body.password).await?;
            state.rate_limiter.reset(&key);
            Ok::<_, AppError>(Json(SessionResponse::from(&session)).into_response())
        })
        .await
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpResponse {
    SignedIn { session: SessionResponse },
    ConfirmationPending { message: &'static str },
}

async fn sign_up(State(state): State<Arc<AppState>>, Json(form): Json<SignUpForm>) -> Response {
    json_boundary()
        .render_async(async move {
            validate_sign_up(&form)?;
            state
                .rate_limiter
                .check(&attempt_key("sign-up", &form.email))
                .into_result()?;

            let metadata = SignUpMetadata {
                display_name: Some(form.display_name.trim().to_string()),
                username: Some(form.username.clone()),
            };
            let outcome = state
                .session
                .sign_up(&form.email, &form.password, &metadata)
                .await?;

            let response = match outcome {
                SignUpOutcome::SignedIn(session) => (
                    StatusCode::CREATED,
                    Json(SignUpResponse::SignedIn {
                        session: SessionResponse::from(&session),
                    }),
                ),
                SignUpOutcome::ConfirmationPending => (
                    StatusCode::ACCEPTED,
                    Json(SignUpResponse::ConfirmationPending {
                        message: SIGN_UP_PENDING,
                    }),
                ),
            };
            Ok::<_, AppError>(response.into_response())
        })
        .await
}

async fn sign_out(State(state): State<Arc<AppState>>) -> Response {
    json_boundary()
        .render_async(async move {
            state.session.sign_out().await?;
            Ok::<_, AppError>(StatusCode::NO_CONTENT.into_response())
        })
        .await
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequest>,
) -> Response {
    json_boundary()
        .render_async(async move {
            state
                .rate_limiter
                .check(&attempt_key("reset", &body.email))
                .into_result()?;
            state.session.reset_password(&body.email).await?;
            Ok::<_, AppError>(Json(MessageResponse { message: RESET_SENT }).into_response())
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_key_normalizes_email() {
        assert_eq!(
            attempt_key("sign-in", "  Ada@Example.COM "),
            "sign-in:ada@example.com"
        );
    }

    #[test]
    fn test_sign_up_response_shape() {
        let body = serde_json::to_value(SignUpResponse::ConfirmationPending {
            message: SIGN_UP_PENDING,
        })
        .unwrap();
        assert_eq!(body["status"], "confirmation_pending");
        assert_eq!(body["message"], SIGN_UP_PENDING);
    }
}
