// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth-change notifications pushed by the provider.

use crate::models::Session;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 32;

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A session change and the session that is current after it.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub change: AuthChange,
    pub session: Option<Session>,
}

/// Fan-out hub for auth events.
#[derive(Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
    next_id: Arc<AtomicU64>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn emit(&self, change: AuthChange, session: Option<Session>) {
        let user_id = session.as_ref().map(|s| s.user_id);
        // No receivers is fine; nobody is listening yet.
        let delivered = self.tx.send(AuthEvent { change, session }).unwrap_or(0);
        tracing::debug!(?change, ?user_id, delivered, "Auth state changed");
    }

    /// Register a listener. Events emitted after this call are queued until
    /// the subscription reads them.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(subscription = id, "Auth subscription opened");
        Subscription {
            id,
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Outcome of waiting on a subscription.
#[derive(Debug)]
pub enum Received {
    Event(AuthEvent),
    /// Events were dropped because the listener fell behind. The listener
    /// should re-read the current session.
    Lagged(u64),
    Closed,
}

/// Handle to a registered listener. Dropping it, or calling `unsubscribe`,
/// releases the registration; `unsubscribe` consumes the handle so it can
/// only happen once.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: broadcast::Receiver<AuthEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Received {
        match self.rx.recv().await {
            Ok(event) => Received::Event(event),
            Err(broadcast::error::RecvError::Lagged(n)) => Received::Lagged(n),
            Err(broadcast::error::RecvError::Closed) => Received::Closed,
        }
    }

    pub fn unsubscribe(self) {
        tracing::debug!(subscription = self.id, "Auth subscription released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_queue_until_read() {
        let hub = AuthEvents::new();
        let mut sub = hub.subscribe();

        hub.emit(AuthChange::SignedOut, None);
        hub.emit(AuthChange::TokenRefreshed, None);

        match sub.recv().await {
            Received::Event(e) => assert_eq!(e.change, AuthChange::SignedOut),
            other => panic!("unexpected {other:?}"),
        }
        match sub.recv().await {
            Received::Event(e) => assert_eq!(e.change, AuthChange::TokenRefreshed),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unsubscribe_releases_receiver() {
        let hub = AuthEvents::new();
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_ne!(a.id(), b.id());
        assert_eq!(hub.subscriber_count(), 2);

        a.unsubscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(b);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
