// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase HTTP client: GoTrue auth under `/auth/v1` and PostgREST tables
//! under `/rest/v1`.
//!
//! Handles:
//! - Password sign-in, sign-up, sign-out, recovery and password change
//! - Session caching, optional persistence to disk, refresh before expiry
//! - Auth-change notifications for the session store
//! - Profile and badge table reads, counts and upserts

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Badge, Profile, ProfileListing, ProfileUpsert, ProviderToken, Session};
use crate::provider::{
    AuthChange, AuthEvents, AuthProvider, ProfileFilter, ProfileStore, SignUpMetadata,
    SignUpOutcome, Subscription,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

const PROFILES_TABLE: &str = "yearbook_profiles";
const BADGES_TABLE: &str = "yearbook_badges";

const LISTING_SELECT: &str = "*,yearbook_user_badges(yearbook_badges(name,icon,rarity))";
/// Inner joins so the badge filter drops profiles without the badge.
const LISTING_SELECT_BY_BADGE: &str =
    "*,yearbook_user_badges!inner(yearbook_badges!inner(name,icon,rarity))";
const COUNT_SELECT: &str = "id";
const COUNT_SELECT_BY_BADGE: &str = "id,yearbook_user_badges!inner(yearbook_badges!inner(name))";
const BADGE_NAME_COLUMN: &str = "yearbook_user_badges.yearbook_badges.name";

/// Refresh a stored session this long before it expires.
const REFRESH_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
struct Endpoint {
    base_url: String,
    anon_key: String,
}

/// Supabase client shared by the session store and the directory.
pub struct SupabaseClient {
    http: reqwest::Client,
    endpoint: Option<Endpoint>,
    session: RwLock<Option<Session>>,
    refresh_lock: Mutex<()>,
    session_file: Option<PathBuf>,
    events: AuthEvents,
}

impl SupabaseClient {
    /// Build a client from configuration.
    ///
    /// Missing credentials do not fail construction; every call then returns
    /// a configuration error instead.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed building provider HTTP client")?;

        let endpoint = match config.provider_credentials() {
            Ok((url, key)) => Some(Endpoint {
                base_url: url.to_string(),
                anon_key: key.to_string(),
            }),
            Err(_) => None,
        };

        if let Some(endpoint) = &endpoint {
            tracing::info!(base_url = %endpoint.base_url, "Initialized provider client");
        }

        Ok(Self {
            http,
            endpoint,
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            session_file: config.session_file.clone(),
            events: AuthEvents::new(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn events(&self) -> &AuthEvents {
        &self.events
    }

    fn endpoint(&self) -> Result<&Endpoint> {
        self.endpoint.as_ref().ok_or_else(|| {
            AppError::Configuration(
                "Provider URL and anon key must be set (SUPABASE_URL, SUPABASE_ANON_KEY)"
                    .to_string(),
            )
        })
    }

    fn auth_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let endpoint = self.endpoint()?;
        let url = format!("{}/auth/v1/{}", endpoint.base_url, path);
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &endpoint.anon_key))
    }

    async fn rest_request(&self, method: Method, table: &str) -> Result<RequestBuilder> {
        let endpoint = self.endpoint()?;
        let url = format!("{}/rest/v1/{}", endpoint.base_url, table);
        let token = self.access_token().await;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &endpoint.anon_key)
            .bearer_auth(token.unwrap_or_else(|| endpoint.anon_key.clone())))
    }

    /// Access token of the current session, refreshed if it is about to
    /// expire. `None` means requests go out with the anon key only.
    async fn access_token(&self) -> Option<String> {
        let session = self.session.read().await.clone()?;
        if !expiring(&session) {
            return Some(session.token.access_token);
        }

        match self.refresh(&session).await {
            Ok(fresh) => Some(fresh.token.access_token),
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed; falling back to anon key");
                None
            }
        }
    }

    /// Exchange the refresh token for a new session.
    async fn refresh(&self, stale: &Session) -> Result<Session> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(current) = self.session.read().await.as_ref() {
            if current.user_id == stale.user_id && !expiring(current) {
                return Ok(current.clone());
            }
        }

        tracing::debug!(user_id = %stale.user_id, "Refreshing provider session");

        let response = self
            .auth_request(Method::POST, "token")?
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": stale.token.refresh_token }))
            .send()
            .await?;

        let token: TokenResponse = check_auth_json(response, "Session refresh failed").await?;
        let session = token.into_session();
        self.store_session(Some(session.clone())).await;
        self.events
            .emit(AuthChange::TokenRefreshed, Some(session.clone()));

        tracing::info!(user_id = %session.user_id, "Provider session refreshed");
        Ok(session)
    }

    async fn store_session(&self, session: Option<Session>) {
        *self.session.write().await = session.clone();
        self.persist(session.as_ref()).await;
    }

    async fn persist(&self, session: Option<&Session>) {
        let Some(path) = &self.session_file else {
            return;
        };

        let result = match session {
            Some(session) => match serde_json::to_vec(&StoredSession::from(session)) {
                Ok(bytes) => tokio::fs::write(path, bytes).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode session");
                    return;
                }
            },
            None => match tokio::fs::remove_file(path).await {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };

        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to persist session");
        }
    }

    async fn load_persisted(&self) -> Option<Session> {
        let path = self.session_file.as_ref()?;
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read stored session");
                return None;
            }
        };

        match serde_json::from_slice::<StoredSession>(&bytes) {
            Ok(stored) => Some(stored.into()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt stored session");
                None
            }
        }
    }
}

fn expiring(session: &Session) -> bool {
    session
        .token
        .expires_within(Utc::now(), chrono::Duration::minutes(REFRESH_MARGIN_MINUTES))
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn current_session(&self) -> Result<Option<Session>> {
        self.endpoint()?;

        let cached = self.session.read().await.clone();
        let session = match cached {
            Some(session) => session,
            None => match self.load_persisted().await {
                Some(session) => session,
                None => return Ok(None),
            },
        };

        if !expiring(&session) {
            *self.session.write().await = Some(session.clone());
            return Ok(Some(session));
        }

        match self.refresh(&session).await {
            Ok(fresh) => Ok(Some(fresh)),
            Err(AppError::Auth(msg)) => {
                tracing::warn!(error = %msg, "Stored session rejected; starting signed out");
                self.store_session(None).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .auth_request(Method::POST, "token")?
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let token: TokenResponse = check_auth_json(response, "Failed to sign in").await?;
        let session = token.into_session();
        self.store_session(Some(session.clone())).await;
        self.events.emit(AuthChange::SignedIn, Some(session.clone()));

        tracing::info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome> {
        let response = self
            .auth_request(Method::POST, "signup")?
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await?;

        match check_auth_json(response, "Failed to create account").await? {
            SignUpResponse::Session(token) => {
                let session = token.into_session();
                self.store_session(Some(session.clone())).await;
                self.events.emit(AuthChange::SignedIn, Some(session.clone()));
                tracing::info!(user_id = %session.user_id, "Account created and signed in");
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Account created; email confirmation pending");
                Ok(SignUpOutcome::ConfirmationPending)
            }
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let sent = match self.auth_request(Method::POST, "logout") {
            Ok(request) => request
                .bearer_auth(&session.token.access_token)
                .send()
                .await
                .map_err(AppError::from),
            Err(e) => Err(e),
        };

        // Local state is dropped no matter what the provider says.
        self.store_session(None).await;
        self.events.emit(AuthChange::SignedOut, None);

        let response = sent?;
        match response.status() {
            // Already revoked or unknown: the session is gone either way.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => check_auth(response, "Failed to sign out").await,
        }
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<()> {
        let response = self
            .auth_request(Method::POST, "recover")?
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        check_auth(response, "Failed to send reset email").await
    }

    async fn update_password(&self, session: &Session, new_password: &str) -> Result<()> {
        let response = self
            .auth_request(Method::PUT, "user")?
            .bearer_auth(&session.token.access_token)
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await?;

        let user: UserResponse = check_auth_json(response, "Failed to update password").await?;

        let updated = {
            let mut guard = self.session.write().await;
            if let Some(current) = guard.as_mut().filter(|s| s.user_id == user.id) {
                current.email = user.email.clone();
            }
            guard.clone()
        };
        self.events.emit(AuthChange::UserUpdated, updated);

        tracing::info!(user_id = %user.id, "Password updated");
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}

#[async_trait]
impl ProfileStore for SupabaseClient {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let response = self
            .rest_request(Method::GET, PROFILES_TABLE)
            .await?
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        // An empty result means the user has not saved a profile yet.
        let rows: Vec<Profile> = check_rest_json(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_profile(&self, upsert: &ProfileUpsert) -> Result<Profile> {
        let response = self
            .rest_request(Method::POST, PROFILES_TABLE)
            .await?
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[upsert])
            .send()
            .await?;

        let rows: Vec<Profile> = check_rest_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Fetch("Profile upsert returned no row".to_string()))
    }

    async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        range: RangeInclusive<u64>,
    ) -> Result<Vec<ProfileListing>> {
        let select = if filter.badge.is_some() {
            LISTING_SELECT_BY_BADGE
        } else {
            LISTING_SELECT
        };

        let mut params = vec![
            ("select".to_string(), select.to_string()),
            ("order".to_string(), "created_at.desc".to_string()),
        ];
        params.extend(filter_params(filter));

        let response = self
            .rest_request(Method::GET, PROFILES_TABLE)
            .await?
            .query(&params)
            .header("Range-Unit", "items")
            .header("Range", format!("{}-{}", range.start(), range.end()))
            .send()
            .await?;

        // Asking for a page past the end is not an error, just an empty page.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Vec::new());
        }

        check_rest_json(response).await
    }

    async fn count_profiles(&self, filter: &ProfileFilter) -> Result<u64> {
        let select = if filter.badge.is_some() {
            COUNT_SELECT_BY_BADGE
        } else {
            COUNT_SELECT
        };

        let mut params = vec![("select".to_string(), select.to_string())];
        params.extend(filter_params(filter));

        let response = self
            .rest_request(Method::HEAD, PROFILES_TABLE)
            .await?
            .query(&params)
            .header("Prefer", "count=exact")
            .header("Range-Unit", "items")
            .header("Range", "0-0")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(AppError::Fetch(format!("Count query failed: HTTP {}", status)));
        }

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| AppError::Fetch("Count query returned no total".to_string()))
    }

    async fn list_badges(&self) -> Result<Vec<Badge>> {
        let response = self
            .rest_request(Method::GET, BADGES_TABLE)
            .await?
            .query(&[("select", "*"), ("order", "name.asc")])
            .send()
            .await?;

        check_rest_json(response).await
    }
}

/// PostgREST filter parameters shared by the page and count queries.
fn filter_params(filter: &ProfileFilter) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Some(search) = &filter.search {
        params.push(("or".to_string(), search_clause(search)));
    }
    if let Some(badge) = &filter.badge {
        params.push((BADGE_NAME_COLUMN.to_string(), format!("eq.{}", quote(badge))));
    }
    params
}

/// Case-insensitive substring match across username, display name and bio.
fn search_clause(term: &str) -> String {
    let pattern = quote(&format!("*{}*", like_escape(term)));
    format!(
        "(username.ilike.{p},display_name.ilike.{p},bio.ilike.{p})",
        p = pattern
    )
}

/// Escape LIKE metacharacters so the term matches literally.
fn like_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Double-quote a filter value so commas and parentheses stay literal.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Total from a `Content-Range` header such as `0-11/42` or `*/0`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// Error body shapes returned by GoTrue and PostgREST.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<serde_json::Value>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or_else(|| match self.error {
                Some(serde_json::Value::String(s)) => Some(s),
                _ => None,
            })
            .filter(|m| !m.is_empty())
    }
}

async fn error_message(response: reqwest::Response) -> (StatusCode, Option<String>) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::message);
    (status, message)
}

/// Auth endpoints: client errors are `Auth` with the provider's message.
async fn auth_error(response: reqwest::Response, fallback: &str) -> AppError {
    let (status, message) = error_message(response).await;
    tracing::warn!(status = %status, message = ?message, "Provider auth request failed");

    let message = message.unwrap_or_else(|| fallback.to_string());
    if status.is_client_error() {
        AppError::Auth(message)
    } else {
        AppError::Fetch(format!("HTTP {}: {}", status, message))
    }
}

async fn check_auth(response: reqwest::Response, fallback: &str) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(auth_error(response, fallback).await)
}

async fn check_auth_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    fallback: &str,
) -> Result<T> {
    if !response.status().is_success() {
        return Err(auth_error(response, fallback).await);
    }
    Ok(response.json().await?)
}

/// Table endpoints: every failure is a `Fetch` error.
async fn check_rest_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    if response.status().is_success() {
        return Ok(response.json().await?);
    }

    let (status, message) = error_message(response).await;
    tracing::warn!(status = %status, message = ?message, "Provider table request failed");
    Err(AppError::Fetch(format!(
        "HTTP {}: {}",
        status,
        message.unwrap_or_default()
    )))
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(self.expires_in));

        Session {
            user_id: self.user.id,
            email: self.user.email,
            created_at: self.user.created_at,
            token: ProviderToken {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at,
            },
        }
    }
}

/// Sign-up returns a session when the account is auto-confirmed and a bare
/// user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

/// On-disk session format.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    user_id: Uuid,
    email: Option<String>,
    created_at: DateTime<Utc>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            email: session.email.clone(),
            created_at: session.created_at,
            access_token: session.token.access_token.clone(),
            refresh_token: session.token.refresh_token.clone(),
            expires_at: session.token.expires_at,
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            user_id: stored.user_id,
            email: stored.email,
            created_at: stored.created_at,
            token: ProviderToken {
                access_token: stored.access_token,
                refresh_token: stored.refresh_token,
                expires_at: stored.expires_at,
            },
        }
    }
}
