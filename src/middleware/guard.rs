// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guards driven by the session store snapshot.

use crate::services::SessionSnapshot;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Where anonymous users are sent from protected routes.
pub const SIGN_IN_PATH: &str = "/auth";
/// Where signed-in users are sent from public-only routes.
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Requires a session.
    Protected,
    /// Only for anonymous users (sign-in, sign-up).
    PublicOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Restore has not resolved; show the loading indicator.
    Loading,
    Render,
    Redirect(&'static str),
}

/// Decide what a route of `kind` shows for the given store state.
pub fn guard(snapshot: &SessionSnapshot, kind: RouteKind) -> GuardDecision {
    if snapshot.loading {
        return GuardDecision::Loading;
    }
    match (kind, snapshot.is_authenticated()) {
        (RouteKind::Protected, true) | (RouteKind::PublicOnly, false) => GuardDecision::Render,
        (RouteKind::Protected, false) => GuardDecision::Redirect(SIGN_IN_PATH),
        (RouteKind::PublicOnly, true) => GuardDecision::Redirect(HOME_PATH),
    }
}

/// Middleware for routes that need a signed-in user.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    apply(&state, RouteKind::Protected, request, next).await
}

/// Middleware for routes that only make sense while signed out.
pub async fn public_only(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    apply(&state, RouteKind::PublicOnly, request, next).await
}

async fn apply(state: &AppState, kind: RouteKind, request: Request, next: Next) -> Response {
    match guard(&state.session.snapshot(), kind) {
        GuardDecision::Render => next.run(request).await,
        GuardDecision::Loading => {
            tracing::debug!(path = %request.uri().path(), "Session still loading");
            let mut response = (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "loading" })),
            )
                .into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
            response
        }
        GuardDecision::Redirect(to) => {
            tracing::debug!(path = %request.uri().path(), to, "Guard redirect");
            Redirect::to(to).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderToken, Session};
    use crate::services::SessionState;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn snapshot(loading: bool, signed_in: bool) -> SessionSnapshot {
        let session = signed_in.then(|| Session {
            user_id: Uuid::new_v4(),
            email: Some("ada@example.com".to_string()),
            created_at: Utc::now(),
            token: ProviderToken {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
            },
        });
        SessionSnapshot {
            state: match (loading, signed_in) {
                (true, _) => SessionState::Initializing,
                (false, true) => SessionState::Authenticated,
                (false, false) => SessionState::Anonymous,
            },
            loading,
            session,
            profile: None,
            error: None,
        }
    }

    #[test]
    fn test_loading_wins_over_everything() {
        assert_eq!(
            guard(&snapshot(true, false), RouteKind::Protected),
            GuardDecision::Loading
        );
        assert_eq!(
            guard(&snapshot(true, false), RouteKind::PublicOnly),
            GuardDecision::Loading
        );
    }

    #[test]
    fn test_protected_route() {
        assert_eq!(
            guard(&snapshot(false, true), RouteKind::Protected),
            GuardDecision::Render
        );
        assert_eq!(
            guard(&snapshot(false, false), RouteKind::Protected),
            GuardDecision::Redirect("/auth")
        );
    }

    #[test]
    fn test_public_only_route() {
        assert_eq!(
            guard(&snapshot(false, false), RouteKind::PublicOnly),
            GuardDecision::Render
        );
        assert_eq!(
            guard(&snapshot(false, true), RouteKind::PublicOnly),
            GuardDecision::Redirect("/")
        );
    }
}
