// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: the single owner of the current session and profile.
//!
//! State transitions go through an explicit state machine:
//!
//! ```text
//! Initializing ──restore──► Anonymous | Authenticated
//! Anonymous ──submit──► Authenticating ──► Authenticated | Anonymous
//! Authenticated ──sign-out / external sign-out──► Anonymous
//! ```
//!
//! Every change is published as a [`SessionSnapshot`] on a watch channel.
//! Profile loads run in the background and are dropped if the session they
//! were started for is no longer current when they finish.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Profile, ProfileUpdate, ProfileUpsert, Session};
use crate::provider::{
    AuthEvent, AuthProvider, ProfileStore, Received, SignUpMetadata, SignUpOutcome, Subscription,
};
use crate::validation::{self, FieldError};
use chrono::Utc;
use rust_fsm::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

const RESTORE_FAILED: &str = "Failed to authenticate. Please try again.";
const SIGN_IN_CANCELLED: &str = "Sign-in was cancelled by sign-out";

state_machine! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub session_machine(Initializing)

    Initializing => {
        Restored => Authenticated,
        RestoredEmpty => Anonymous
    },
    Anonymous => {
        Submit => Authenticating,
        SessionStarted => Authenticated,
        SessionEnded => Anonymous,
        SignOut => Anonymous
    },
    Authenticating => {
        Succeeded => Authenticated,
        Declined => Anonymous,
        // Our own sign-in can be announced before its call returns.
        SessionStarted => Authenticated,
        SessionEnded => Authenticating,
        SignOut => Anonymous
    },
    Authenticated => {
        Succeeded => Authenticated,
        SessionStarted => Authenticated,
        SessionEnded => Anonymous,
        SignOut => Anonymous
    }
}

use session_machine::Input as MachineInput;
use session_machine::State as MachineState;
use session_machine::StateMachine as SessionMachine;

/// Externally visible store state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Restore has not resolved yet.
    Initializing,
    Anonymous,
    /// A sign-in or sign-up request is in flight.
    Authenticating,
    Authenticated,
}

impl From<&MachineState> for SessionState {
    fn from(state: &MachineState) -> Self {
        match state {
            MachineState::Initializing => SessionState::Initializing,
            MachineState::Anonymous => SessionState::Anonymous,
            MachineState::Authenticating => SessionState::Authenticating,
            MachineState::Authenticated => SessionState::Authenticated,
        }
    }
}

/// Point-in-time view of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// True until the startup restore has resolved.
    pub loading: bool,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub error: Option<String>,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            state: SessionState::Initializing,
            loading: true,
            session: None,
            profile: None,
            error: None,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

struct Listener {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct Inner {
    machine: SessionMachine,
    session: Option<Session>,
    profile: Option<Profile>,
    /// Bumped whenever the session identity changes.
    generation: u64,
    error: Option<String>,
    error_seq: u64,
    /// False before `mount` and after `shutdown`.
    mounted: bool,
    profile_task: Option<JoinHandle<()>>,
    listener: Option<Listener>,
    /// Current credential attempt. Sign-out bumps it so an in-flight
    /// attempt finishes as cancelled.
    attempt: u64,
    /// Cancelled attempts whose provider call has not returned yet. While
    /// any are outstanding, session events from the provider are ignored.
    abandoned: u32,
    /// Access token of the last session ended locally. Late events carrying
    /// it are stale.
    ended_token: Option<String>,
}

impl Inner {
    fn user_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.user_id)
    }

    fn state(&self) -> SessionState {
        SessionState::from(self.machine.state())
    }

    fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            state,
            loading: state == SessionState::Initializing,
            session: self.session.clone(),
            profile: self.profile.clone(),
            error: self.error.clone(),
        }
    }
}

struct Shared {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    error_display: Duration,
    reset_redirect: String,
    mount_started: AtomicBool,
    inner: Mutex<Inner>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

/// Session store. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<Shared>,
}

impl SessionStore {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        config: &Config,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::initial());
        Self {
            shared: Arc::new(Shared {
                auth,
                profiles,
                error_display: config.error_display,
                reset_redirect: config.reset_redirect_url(),
                mount_started: AtomicBool::new(false),
                inner: Mutex::new(Inner {
                    machine: SessionMachine::new(),
                    session: None,
                    profile: None,
                    generation: 0,
                    error: None,
                    error_seq: 0,
                    mounted: false,
                    profile_task: None,
                    listener: None,
                    attempt: 0,
                    abandoned: 0,
                    ended_token: None,
                }),
                snapshot_tx,
            }),
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Receiver that sees every published snapshot.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.shared.snapshot_tx.borrow().session.clone()
    }

    /// Restore the previous session and start listening for provider
    /// notifications. Only the first call does anything.
    pub async fn mount(&self) {
        if self.shared.mount_started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Session store already mounted");
            return;
        }

        // Subscribe before restoring so changes that arrive meanwhile are
        // queued and applied after the restore result.
        let subscription = self.shared.auth.subscribe();
        self.shared.inner.lock().await.mounted = true;

        let restored = self.shared.auth.current_session().await;

        let mut inner = self.shared.inner.lock().await;
        if !inner.mounted {
            tracing::debug!("Store shut down during restore");
            subscription.unsubscribe();
            return;
        }

        match restored {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user_id, "Restored session");
                self.transition(&mut inner, MachineInput::Restored);
                self.adopt(&mut inner, session);
            }
            Ok(None) => {
                tracing::info!("No session to restore");
                self.transition(&mut inner, MachineInput::RestoredEmpty);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session restore failed");
                self.transition(&mut inner, MachineInput::RestoredEmpty);
                let message = match &e {
                    AppError::Configuration(_) => e.to_string(),
                    _ => RESTORE_FAILED.to_string(),
                };
                self.set_error(&mut inner, message);
            }
        }

        let (stop, stop_rx) = oneshot::channel();
        let store = self.clone();
        let handle = tokio::spawn(async move { store.listen(subscription, stop_rx).await });
        inner.listener = Some(Listener { stop, handle });

        self.publish(&inner);
    }

    /// Stop listening for provider notifications. Background profile loads
    /// that finish afterwards are discarded.
    pub async fn shutdown(&self) {
        let listener = {
            let mut inner = self.shared.inner.lock().await;
            if !inner.mounted {
                return;
            }
            inner.mounted = false;
            inner.profile_task = None;
            inner.listener.take()
        };

        if let Some(listener) = listener {
            // The listener may already have exited on its own.
            let _ = listener.stop.send(());
            if let Err(e) = listener.handle.await {
                tracing::warn!(error = %e, "Auth listener task failed");
            }
        }
        tracing::info!("Session store shut down");
    }

    async fn listen(self, mut subscription: Subscription, mut stop: oneshot::Receiver<()>) {
        tracing::debug!(subscription = subscription.id(), "Listening for auth changes");
        loop {
            tokio::select! {
                _ = &mut stop => break,
                received = subscription.recv() => match received {
                    Received::Event(event) => self.apply_event(event).await,
                    Received::Lagged(missed) => {
                        tracing::warn!(missed, "Auth listener fell behind; resynchronizing");
                        self.resync().await;
                    }
                    Received::Closed => break,
                },
            }
        }
        subscription.unsubscribe();
    }

    async fn apply_event(&self, event: AuthEvent) {
        tracing::debug!(change = ?event.change, "Applying auth change");
        let mut inner = self.shared.inner.lock().await;
        if !inner.mounted {
            return;
        }
        self.apply_session(&mut inner, event.session);
        self.publish(&inner);
    }

    async fn resync(&self) {
        match self.shared.auth.current_session().await {
            Ok(session) => {
                let mut inner = self.shared.inner.lock().await;
                if inner.mounted {
                    self.apply_session(&mut inner, session);
                    self.publish(&inner);
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to resynchronize session"),
        }
    }

    fn apply_session(&self, inner: &mut Inner, session: Option<Session>) {
        match session {
            Some(session) if inner.abandoned > 0 => {
                tracing::debug!(user_id = %session.user_id, "Ignoring session from a cancelled sign-in");
            }
            Some(session)
                if inner.ended_token.as_deref() == Some(session.token.access_token.as_str()) =>
            {
                tracing::debug!(user_id = %session.user_id, "Ignoring stale session event");
            }
            Some(session) => {
                self.transition(inner, MachineInput::SessionStarted);
                self.adopt(inner, session);
            }
            None => {
                self.clear_identity(inner);
                self.transition(inner, MachineInput::SessionEnded);
            }
        }
    }

    /// Make `session` current. A new identity drops the old profile and
    /// starts loading the new one.
    fn adopt(&self, inner: &mut Inner, session: Session) {
        let same_user = inner.user_id() == Some(session.user_id);
        inner.session = Some(session);
        if !same_user {
            inner.generation += 1;
            inner.profile = None;
            self.spawn_profile_fetch(inner);
        }
    }

    fn clear_identity(&self, inner: &mut Inner) {
        if inner.session.take().is_some() {
            inner.generation += 1;
        }
        inner.profile = None;
    }

    /// Feed `input` to the state machine. Returns false if the current state
    /// does not accept it.
    fn transition(&self, inner: &mut Inner, input: MachineInput) -> bool {
        let from = inner.state();
        if inner.machine.consume(&input).is_err() {
            tracing::debug!(?from, ?input, "Ignoring impossible session transition");
            return false;
        }
        let to = inner.state();
        if from != to {
            tracing::debug!(?from, ?to, "Session state transition");
        }
        true
    }

    fn publish(&self, inner: &Inner) {
        self.shared.snapshot_tx.send_replace(inner.snapshot());
    }

    fn spawn_profile_fetch(&self, inner: &mut Inner) {
        let Some(user_id) = inner.user_id() else {
            return;
        };
        let generation = inner.generation;
        let store = self.clone();
        inner.profile_task = Some(tokio::spawn(async move {
            store.load_profile(generation, user_id).await;
        }));
    }

    async fn load_profile(&self, generation: u64, user_id: Uuid) {
        let result = self.shared.profiles.fetch_profile(user_id).await;

        let mut inner = self.shared.inner.lock().await;
        if !inner.mounted || inner.generation != generation || inner.user_id() != Some(user_id) {
            tracing::debug!(%user_id, generation, "Discarding stale profile response");
            return;
        }

        match result {
            Ok(profile) => {
                inner.profile = profile.filter(|p| p.user_id == user_id);
                tracing::debug!(%user_id, found = inner.profile.is_some(), "Profile loaded");
                self.publish(&inner);
            }
            // A missing profile is normal for new users, so this is not
            // surfaced in the error slot.
            Err(e) => tracing::warn!(%user_id, error = %e, "Failed to fetch profile"),
        }
    }

    /// Wait for the most recently started profile load to finish.
    pub async fn wait_for_profile(&self) {
        let task = self.shared.inner.lock().await.profile_task.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Profile load task failed");
            }
        }
    }

    // Error slot

    fn set_error(&self, inner: &mut Inner, message: String) {
        inner.error_seq += 1;
        inner.error = Some(message);

        let seq = inner.error_seq;
        let delay = self.shared.error_display;
        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = store.shared.inner.lock().await;
            if inner.error_seq == seq && inner.error.is_some() {
                inner.error = None;
                store.publish(&inner);
            }
        });
    }

    /// Clear the error slot.
    pub async fn clear_error(&self) {
        let mut inner = self.shared.inner.lock().await;
        inner.error_seq += 1;
        if inner.error.take().is_some() {
            self.publish(&inner);
        }
    }

    /// Start of an operation: stale errors go away immediately.
    async fn begin(&self) {
        self.clear_error().await;
    }

    /// Record `err` in the error slot and hand it back.
    async fn fail(&self, err: AppError, fallback: &str) -> AppError {
        let message = match &err {
            AppError::Internal(_) => fallback.to_string(),
            other => {
                let m = other.to_string();
                if m.is_empty() {
                    fallback.to_string()
                } else {
                    m
                }
            }
        };

        tracing::warn!(kind = err.kind(), error = %err, "Session operation failed");
        let mut inner = self.shared.inner.lock().await;
        self.set_error(&mut inner, message);
        self.publish(&inner);
        err
    }

    async fn check(
        &self,
        result: std::result::Result<(), FieldError>,
        fallback: &str,
    ) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e.into(), fallback).await),
        }
    }

    async fn require_session(&self, fallback: &str) -> Result<Session> {
        let session = self.shared.inner.lock().await.session.clone();
        match session {
            Some(session) => Ok(session),
            None => Err(self.fail(AppError::NotAuthenticated, fallback).await),
        }
    }

    // Authentication

    /// Start a credential attempt. Returns its id for `finish_authenticating`.
    async fn enter_authenticating(&self) -> Result<u64> {
        let mut inner = self.shared.inner.lock().await;
        let from = inner.state();
        if inner.machine.consume(&MachineInput::Submit).is_ok() {
            inner.attempt += 1;
            self.publish(&inner);
            return Ok(inner.attempt);
        }

        let message = match from {
            SessionState::Initializing => "Session is still loading",
            SessionState::Authenticating => "Another sign-in is already in progress",
            SessionState::Authenticated => "Already signed in",
            SessionState::Anonymous => "Cannot sign in right now",
        };
        drop(inner);
        Err(self.fail(AppError::Auth(message.to_string()), message).await)
    }

    /// Settle credential attempt `attempt`. A session from an attempt that
    /// was cancelled by sign-out is revoked instead of adopted.
    async fn finish_authenticating(&self, attempt: u64, session: Option<Session>) -> Result<()> {
        let rejected = {
            let mut inner = self.shared.inner.lock().await;
            if inner.attempt != attempt {
                inner.abandoned = inner.abandoned.saturating_sub(1);
                match session {
                    Some(session) => {
                        inner.ended_token = Some(session.token.access_token.clone());
                        Some(session)
                    }
                    None => return Ok(()),
                }
            } else {
                match session {
                    Some(session) => {
                        if self.transition(&mut inner, MachineInput::Succeeded) {
                            self.adopt(&mut inner, session);
                            self.publish(&inner);
                            return Ok(());
                        }
                        inner.ended_token = Some(session.token.access_token.clone());
                        Some(session)
                    }
                    None => {
                        self.transition(&mut inner, MachineInput::Declined);
                        self.publish(&inner);
                        return Ok(());
                    }
                }
            }
        };

        let Some(session) = rejected else {
            return Ok(());
        };
        tracing::info!(user_id = %session.user_id, "Sign-in finished after sign-out; revoking");
        if let Err(e) = self.shared.auth.sign_out(&session).await {
            tracing::warn!(error = %e, "Failed to revoke cancelled sign-in");
        }
        Err(AppError::Auth(SIGN_IN_CANCELLED.to_string()))
    }

    /// Create an account. The outcome tells whether a session is active or
    /// email confirmation is still pending.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome> {
        const FALLBACK: &str = "Failed to create account";
        self.begin().await;
        self.check(validation::validate_email(email), FALLBACK).await?;
        self.check(validation::validate_password(password), FALLBACK)
            .await?;
        let attempt = self.enter_authenticating().await?;

        match self.shared.auth.sign_up(email, password, metadata).await {
            Ok(SignUpOutcome::SignedIn(session)) => {
                self.finish_authenticating(attempt, Some(session.clone()))
                    .await?;
                Ok(SignUpOutcome::SignedIn(session))
            }
            Ok(SignUpOutcome::ConfirmationPending) => {
                self.finish_authenticating(attempt, None).await?;
                Ok(SignUpOutcome::ConfirmationPending)
            }
            Err(e) => {
                self.finish_authenticating(attempt, None).await?;
                Err(self.fail(e, FALLBACK).await)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        const FALLBACK: &str = "Failed to sign in";
        self.begin().await;
        self.check(validation::validate_email(email), FALLBACK).await?;
        if password.is_empty() {
            let err = AppError::Validation("Password is required".to_string());
            return Err(self.fail(err, FALLBACK).await);
        }
        let attempt = self.enter_authenticating().await?;

        match self.shared.auth.sign_in_with_password(email, password).await {
            Ok(session) => {
                self.finish_authenticating(attempt, Some(session.clone()))
                    .await?;
                tracing::info!(user_id = %session.user_id, "Sign-in succeeded");
                Ok(session)
            }
            Err(e) => {
                self.finish_authenticating(attempt, None).await?;
                Err(self.fail(e, FALLBACK).await)
            }
        }
    }

    /// Sign out. Local state is cleared before the provider is contacted, so
    /// a provider failure still leaves the store signed out.
    pub async fn sign_out(&self) -> Result<()> {
        self.begin().await;

        let session = {
            let mut inner = self.shared.inner.lock().await;
            if inner.state() == SessionState::Authenticating {
                inner.attempt += 1;
                inner.abandoned += 1;
            }
            let session = inner.session.clone();
            if let Some(session) = &session {
                inner.ended_token = Some(session.token.access_token.clone());
            }
            self.clear_identity(&mut inner);
            self.transition(&mut inner, MachineInput::SignOut);
            self.publish(&inner);
            session
        };

        let Some(session) = session else {
            return Ok(());
        };

        tracing::info!(user_id = %session.user_id, "Signing out");
        match self.shared.auth.sign_out(&session).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e, "Failed to sign out").await),
        }
    }

    /// Ask the provider to send a reset email. The result does not depend on
    /// whether the account exists.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        const FALLBACK: &str = "Failed to send reset email";
        self.begin().await;
        self.check(validation::validate_email(email), FALLBACK).await?;

        match self
            .shared
            .auth
            .send_password_reset(email, &self.shared.reset_redirect)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e, FALLBACK).await),
        }
    }

    pub async fn update_password(&self, new_password: &str) -> Result<()> {
        const FALLBACK: &str = "Failed to update password";
        self.begin().await;
        let session = self.require_session(FALLBACK).await?;
        self.check(validation::validate_password(new_password), FALLBACK)
            .await?;

        match self.shared.auth.update_password(&session, new_password).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e, FALLBACK).await),
        }
    }

    // Profile

    /// Save profile fields for the signed-in user.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile> {
        const FALLBACK: &str = "Failed to update profile";
        self.begin().await;
        let session = self.require_session(FALLBACK).await?;
        self.check(validation::validate_profile_update(&update), FALLBACK)
            .await?;

        let upsert = ProfileUpsert {
            user_id: session.user_id,
            fields: validation::sanitize_profile_update(update),
            updated_at: Utc::now(),
        };

        let profile = match self.shared.profiles.upsert_profile(&upsert).await {
            Ok(profile) => profile,
            Err(e) => return Err(self.fail(e, FALLBACK).await),
        };

        let mut inner = self.shared.inner.lock().await;
        if inner.mounted && inner.user_id() == Some(session.user_id) {
            inner.profile = Some(profile.clone());
            self.publish(&inner);
        } else {
            tracing::debug!(user_id = %session.user_id, "Session changed during profile save");
        }

        tracing::info!(user_id = %session.user_id, "Profile saved");
        Ok(profile)
    }

    /// Reload the signed-in user's profile and wait for the result.
    pub async fn refresh_profile(&self) -> Result<Option<Profile>> {
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.session.is_none() {
                drop(inner);
                return Err(self
                    .fail(AppError::NotAuthenticated, "Failed to load profile")
                    .await);
            }
            self.spawn_profile_fetch(&mut inner);
        }

        self.wait_for_profile().await;
        Ok(self.snapshot().profile)
    }

    /// True once the profile has both a username and a display name.
    pub fn has_completed_profile(&self) -> bool {
        self.snapshot()
            .profile
            .is_some_and(|profile| profile.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(inputs: &[MachineInput]) -> SessionState {
        let mut machine = SessionMachine::new();
        for input in inputs {
            machine.consume(input).expect("transition should be allowed");
        }
        SessionState::from(machine.state())
    }

    #[test]
    fn test_restore_paths() {
        assert_eq!(run(&[MachineInput::Restored]), SessionState::Authenticated);
        assert_eq!(run(&[MachineInput::RestoredEmpty]), SessionState::Anonymous);
    }

    #[test]
    fn test_sign_in_paths() {
        use MachineInput::*;
        assert_eq!(
            run(&[RestoredEmpty, Submit, Succeeded]),
            SessionState::Authenticated
        );
        assert_eq!(run(&[RestoredEmpty, Submit, Declined]), SessionState::Anonymous);
        assert_eq!(
            run(&[RestoredEmpty, Submit, SessionStarted, Succeeded]),
            SessionState::Authenticated
        );
        assert_eq!(run(&[Restored, SessionEnded]), SessionState::Anonymous);
        assert_eq!(run(&[Restored, SignOut]), SessionState::Anonymous);
    }

    #[test]
    fn test_nothing_skips_initializing() {
        for input in [
            MachineInput::Submit,
            MachineInput::Succeeded,
            MachineInput::SessionStarted,
            MachineInput::SessionEnded,
            MachineInput::SignOut,
        ] {
            let mut machine = SessionMachine::new();
            assert!(machine.consume(&input).is_err(), "{input:?} left Initializing");
        }
    }

    #[test]
    fn test_submit_only_from_anonymous() {
        let mut machine = SessionMachine::new();
        machine.consume(&MachineInput::Restored).unwrap();
        assert!(machine.consume(&MachineInput::Submit).is_err());
    }

    #[test]
    fn test_initial_snapshot_is_loading() {
        let snapshot = SessionSnapshot::initial();
        assert!(snapshot.loading);
        assert_eq!(snapshot.state, SessionState::Initializing);
        assert!(!snapshot.is_authenticated());
    }
}
