// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;
use yearbook::config::Config;
use yearbook::error::{AppError, Result};
use yearbook::models::{
    Badge, BadgeAward, BadgeSummary, Profile, ProfileListing, ProfileUpsert, ProviderToken, Rarity,
    Session,
};
use yearbook::provider::{
    AuthChange, AuthEvents, AuthProvider, ProfileFilter, ProfileStore, SignUpMetadata,
    SignUpOutcome, Subscription,
};
use yearbook::routes::create_router;
use yearbook::AppState;

/// Password accepted by every fake account.
#[allow(dead_code)]
pub const GOOD_PASSWORD: &str = "Yearbook2024";

/// Build a session for `user_id` that expires in an hour.
#[allow(dead_code)]
pub fn session_for(user_id: Uuid, email: &str) -> Session {
    Session {
        user_id,
        email: Some(email.to_string()),
        created_at: Utc::now(),
        token: ProviderToken {
            access_token: format!("access-{}", user_id),
            refresh_token: format!("refresh-{}", user_id),
            expires_at: Utc::now() + Duration::hours(1),
        },
    }
}

#[allow(dead_code)]
pub fn profile_for(user_id: Uuid, username: &str, display_name: &str, bio: &str) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        user_id,
        username: Some(username.to_string()),
        display_name: Some(display_name.to_string()),
        bio: Some(bio.to_string()),
        avatar_url: None,
        favorite_crypto: None,
        crypto_quote: None,
        is_verified: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[allow(dead_code)]
pub fn listing(profile: Profile, badges: &[&str]) -> ProfileListing {
    ProfileListing {
        profile,
        awards: badges
            .iter()
            .map(|name| BadgeAward {
                badge: Some(BadgeSummary::new(name, "*", Rarity::Rare)),
            })
            .collect(),
    }
}

/// Three rows, newest first: satoshi_fan, cryptowhale, defi_farmer.
#[allow(dead_code)]
pub fn sample_rows() -> Vec<ProfileListing> {
    let at = |day: u32| -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap() };
    let row = |username: &str, display: &str, bio: &str, badges: &[&str], day: u32| {
        let mut profile = profile_for(Uuid::new_v4(), username, display, bio);
        profile.created_at = at(day);
        listing(profile, badges)
    };
    vec![
        row("satoshi_fan", "Satoshi Fan", "Running nodes since 2011", &["OG"], 3),
        row("cryptowhale", "Crypto Whale", "Moving markets", &["Whale", "OG"], 2),
        row("defi_farmer", "DeFi Farmer", "Yield everywhere", &["DeFi Farmer"], 1),
    ]
}

/// In-memory stand-in for the hosted provider.
///
/// Failure switches and gates let tests control ordering and errors.
#[derive(Default)]
pub struct FakeProvider {
    pub events: AuthEvents,
    /// Session returned by the startup restore.
    pub restored: Mutex<Option<Session>>,
    /// email -> (password, user id)
    pub accounts: Mutex<HashMap<String, (String, Uuid)>>,
    pub rows: Mutex<Vec<ProfileListing>>,
    pub badges: Mutex<Vec<Badge>>,
    pub fail_restore: AtomicBool,
    pub fail_sign_out: AtomicBool,
    pub fail_queries: AtomicBool,
    pub confirm_sign_ups: AtomicBool,
    /// When set, the startup restore waits for a permit before answering.
    pub restore_gate: Mutex<Option<Arc<Notify>>>,
    /// When set, profile fetches wait for a permit before answering.
    pub profile_gate: Mutex<Option<Arc<Notify>>>,
    /// When set, password sign-in waits for a permit before answering.
    pub sign_in_gate: Mutex<Option<Arc<Notify>>>,
    /// Sessions the provider was asked to end.
    pub signed_out: Mutex<Vec<Uuid>>,
    /// Number of provider calls made, for "no network call" checks.
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_account(self: &Arc<Self>, email: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (GOOD_PASSWORD.to_string(), user_id));
        user_id
    }

    pub fn add_row(&self, row: ProfileListing) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn set_rows(&self, rows: Vec<ProfileListing>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn restore_with(&self, session: Session) {
        *self.restored.lock().unwrap() = Some(session);
    }

    /// Hold the startup restore until the returned gate is notified.
    pub fn gate_restore(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.restore_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold profile fetches until the returned gate is notified.
    pub fn gate_profiles(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.profile_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold password sign-in until the returned gate is notified.
    pub fn gate_sign_in(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.sign_in_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn called(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn matching(&self, filter: &ProfileFilter) -> Result<Vec<ProfileListing>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(AppError::Fetch("connection reset".to_string()));
        }
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.profile.created_at.cmp(&a.profile.created_at));
        Ok(rows)
    }
}

#[async_trait]
impl AuthProvider for FakeProvider {
    async fn current_session(&self) -> Result<Option<Session>> {
        self.called();
        let gate = self.restore_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_restore.load(Ordering::SeqCst) {
            return Err(AppError::Fetch("provider unreachable".to_string()));
        }
        Ok(self.restored.lock().unwrap().clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.called();
        let gate = self.sign_in_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let account = self.accounts.lock().unwrap().get(email).cloned();
        match account {
            Some((expected, user_id)) if expected == password => {
                let session = session_for(user_id, email);
                self.events.emit(AuthChange::SignedIn, Some(session.clone()));
                Ok(session)
            }
            _ => Err(AppError::Auth("Invalid login credentials".to_string())),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome> {
        self.called();
        let user_id = Uuid::new_v4();
        {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(AppError::Auth("User already registered".to_string()));
            }
            accounts.insert(email.to_string(), (password.to_string(), user_id));
        }

        if self.confirm_sign_ups.load(Ordering::SeqCst) {
            return Ok(SignUpOutcome::ConfirmationPending);
        }
        let session = session_for(user_id, email);
        self.events.emit(AuthChange::SignedIn, Some(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        self.called();
        self.signed_out.lock().unwrap().push(session.user_id);
        self.events.emit(AuthChange::SignedOut, None);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AppError::Fetch("network down".to_string()));
        }
        Ok(())
    }

    async fn send_password_reset(&self, _email: &str, _redirect_to: &str) -> Result<()> {
        self.called();
        Ok(())
    }

    async fn update_password(&self, session: &Session, new_password: &str) -> Result<()> {
        self.called();
        let mut accounts = self.accounts.lock().unwrap();
        for (password, user_id) in accounts.values_mut() {
            if *user_id == session.user_id {
                *password = new_password.to_string();
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}

#[async_trait]
impl ProfileStore for FakeProvider {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.called();
        let gate = self.profile_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.profile.user_id == user_id)
            .map(|row| row.profile.clone()))
    }

    async fn upsert_profile(&self, upsert: &ProfileUpsert) -> Result<Profile> {
        self.called();
        let mut rows = self.rows.lock().unwrap();
        let index = match rows
            .iter()
            .position(|row| row.profile.user_id == upsert.user_id)
        {
            Some(index) => index,
            None => {
                let mut profile = profile_for(upsert.user_id, "", "", "");
                profile.username = None;
                profile.display_name = None;
                profile.bio = None;
                rows.push(listing(profile, &[]));
                rows.len() - 1
            }
        };

        let profile = &mut rows[index].profile;
        let fields = upsert.fields.clone();
        if fields.username.is_some() {
            profile.username = fields.username;
        }
        if fields.display_name.is_some() {
            profile.display_name = fields.display_name;
        }
        if fields.bio.is_some() {
            profile.bio = fields.bio;
        }
        if fields.avatar_url.is_some() {
            profile.avatar_url = fields.avatar_url;
        }
        if fields.favorite_crypto.is_some() {
            profile.favorite_crypto = fields.favorite_crypto;
        }
        if fields.crypto_quote.is_some() {
            profile.crypto_quote = fields.crypto_quote;
        }
        profile.updated_at = upsert.updated_at;
        Ok(profile.clone())
    }

    async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        range: RangeInclusive<u64>,
    ) -> Result<Vec<ProfileListing>> {
        self.called();
        let rows = self.matching(filter)?;
        let start = *range.start() as usize;
        let end = (*range.end() as usize + 1).min(rows.len());
        Ok(rows.get(start..end).map(<[_]>::to_vec).unwrap_or_default())
    }

    async fn count_profiles(&self, filter: &ProfileFilter) -> Result<u64> {
        self.called();
        Ok(self.matching(filter)?.len() as u64)
    }

    async fn list_badges(&self) -> Result<Vec<Badge>> {
        self.called();
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(AppError::Fetch("connection reset".to_string()));
        }
        let mut badges = self.badges.lock().unwrap().clone();
        badges.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(badges)
    }
}

/// Create a test app backed by a fresh fake provider. The session store is
/// not mounted.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<FakeProvider>) {
    create_test_app_with(Config::test_default(), FakeProvider::new())
}

#[allow(dead_code)]
pub fn create_test_app_with(
    config: Config,
    provider: Arc<FakeProvider>,
) -> (axum::Router, Arc<AppState>, Arc<FakeProvider>) {
    let state = Arc::new(AppState::new(config, provider.clone()));
    (create_router(state.clone()), state, provider)
}

/// Wait until the store publishes a snapshot satisfying `pred`.
#[allow(dead_code)]
pub async fn wait_for<F>(state: &AppState, pred: F)
where
    F: Fn(&yearbook::services::SessionSnapshot) -> bool,
{
    let mut rx = state.session.watch();
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            if pred(&rx.borrow_and_update()) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .expect("store did not reach expected state");
}
