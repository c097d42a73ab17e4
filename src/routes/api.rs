// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for signed-in users.

use crate::boundary::json_boundary;
use crate::error::AppError;
use crate::models::{Badge, Profile, ProfileUpdate};
use crate::provider::ProfileFilter;
use crate::services::{ProfilePage, SessionSnapshot};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use uuid::Uuid;

/// API routes (require a session).
/// The session guard is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/api/session", get(get_session))
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/password", put(update_password))
        .route("/api/profiles", get(list_profiles))
        .route("/api/badges", get(list_badges))
}

// ─── Session ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HomeResponse {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub profile_complete: bool,
}

async fn home(State(state): State<Arc<AppState>>) -> Json<HomeResponse> {
    let snapshot = state.session.snapshot();
    Json(HomeResponse {
        user_id: snapshot.user_id(),
        email: snapshot.session.as_ref().and_then(|s| s.email.clone()),
        profile_complete: state.session.has_completed_profile(),
    })
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: Option<Profile>,
    pub complete: bool,
}

impl From<Option<Profile>> for ProfileResponse {
    fn from(profile: Option<Profile>) -> Self {
        let complete = profile.as_ref().is_some_and(Profile::is_complete);
        Self { profile, complete }
    }
}

/// The signed-in user's profile, once the in-flight load (if any) finishes.
async fn get_profile(State(state): State<Arc<AppState>>) -> Json<ProfileResponse> {
    state.session.wait_for_profile().await;
    Json(ProfileResponse::from(state.session.snapshot().profile))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ProfileUpdate>,
) -> Response {
    json_boundary()
        .render_async(async move {
            if update.is_empty() {
                return Err(AppError::Validation("No profile fields to update".to_string()));
            }
            let profile = state.session.update_profile(update).await?;
            Ok::<_, AppError>(Json(ProfileResponse::from(Some(profile))).into_response())
        })
        .await
}

#[derive(Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

async fn update_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PasswordRequest>,
) -> Response {
    json_boundary()
        .render_async(async move {
            state.session.update_password(&body.password).await?;
            Ok::<_, AppError>(StatusCode::NO_CONTENT.into_response())
        })
        .await
}

// ─── Directory ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DirectoryParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl DirectoryParams {
    fn page(&self) -> Result<NonZeroU32, AppError> {
        match self.page {
            None => Ok(NonZeroU32::MIN),
            Some(n) => NonZeroU32::new(n)
                .ok_or_else(|| AppError::Validation("Page must be at least 1".to_string())),
        }
    }
}

#[derive(Serialize)]
pub struct DirectoryResponse {
    #[serde(flatten)]
    pub page: ProfilePage,
    pub summary: String,
    pub page_numbers: Vec<u32>,
    pub has_previous: bool,
    pub has_next: bool,
    pub show_pagination: bool,
}

impl From<ProfilePage> for DirectoryResponse {
    fn from(page: ProfilePage) -> Self {
        Self {
            summary: page.summary(),
            page_numbers: page.page_numbers(),
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            show_pagination: page.show_pagination(),
            page,
        }
    }
}

async fn list_profiles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DirectoryParams>,
) -> Response {
    json_boundary()
        .render_async(async move {
            let page = params.page()?;
            let filter = ProfileFilter {
                search: params.search,
                badge: params.badge,
            };
            let result = state.directory.query(&filter, page).await?;
            Ok::<_, AppError>(Json(DirectoryResponse::from(result)).into_response())
        })
        .await
}

async fn list_badges(State(state): State<Arc<AppState>>) -> Json<Vec<Badge>> {
    Json(state.directory.badges().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_param() {
        let params = |page| DirectoryParams {
            search: None,
            badge: None,
            page,
        };
        assert_eq!(params(None).page().unwrap().get(), 1);
        assert_eq!(params(Some(3)).page().unwrap().get(), 3);
        assert!(matches!(
            params(Some(0)).page(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_profile_response_complete_flag() {
        assert!(!ProfileResponse::from(None).complete);
    }
}
