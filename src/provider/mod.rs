// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Capability interface to the hosted auth + data provider.
//!
//! The session store and the directory only talk to the provider through
//! these traits. `supabase` is the HTTP implementation; tests supply fakes.

pub mod events;
pub mod supabase;

pub use events::{AuthChange, AuthEvent, AuthEvents, Received, Subscription};
pub use supabase::SupabaseClient;

use crate::error::Result;
use crate::models::{Badge, Profile, ProfileListing, ProfileUpsert, Session};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use uuid::Uuid;

/// Extra fields stored with a new account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignUpMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The provider auto-confirmed the account and issued a session.
    SignedIn(Session),
    /// The account exists but must be confirmed by email before sign-in.
    ConfirmationPending,
}

/// Authentication operations.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Restore the session left by a previous run, if any.
    async fn current_session(&self) -> Result<Option<Session>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome>;

    /// Revoke `session` remotely and forget it locally.
    async fn sign_out(&self, session: &Session) -> Result<()>;

    /// Request a password-reset email. Succeeds whether or not the account
    /// exists.
    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<()>;

    async fn update_password(&self, session: &Session, new_password: &str) -> Result<()>;

    /// Subscribe to out-of-band session changes.
    fn subscribe(&self) -> Subscription;
}

/// Search and badge filter for the profile directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
}

impl ProfileFilter {
    /// Trim both fields and drop the ones left empty.
    pub fn normalized(&self) -> Self {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            search: clean(&self.search),
            badge: clean(&self.badge),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.badge.is_none()
    }

    /// Local predicate: case-insensitive search over username, display name
    /// and bio, plus an exact badge-name match.
    pub fn matches(&self, listing: &ProfileListing) -> bool {
        let search_ok = self
            .search
            .as_deref()
            .map_or(true, |s| listing.profile.matches_search(&s.to_lowercase()));
        let badge_ok = self.badge.as_deref().map_or(true, |b| listing.has_badge(b));
        search_ok && badge_ok
    }
}

/// Table operations on profiles and badges.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The profile owned by `user_id`, or `None` if none was saved yet.
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>>;

    /// Insert or merge the caller's profile row, keyed by `user_id`.
    async fn upsert_profile(&self, upsert: &ProfileUpsert) -> Result<Profile>;

    /// One page of profiles, newest first, with embedded badge awards.
    async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        range: RangeInclusive<u64>,
    ) -> Result<Vec<ProfileListing>>;

    /// Number of profiles matching `filter`.
    async fn count_profiles(&self, filter: &ProfileFilter) -> Result<u64>;

    /// Badge reference list, ordered by name.
    async fn list_badges(&self) -> Result<Vec<Badge>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BadgeAward, BadgeSummary, Rarity};
    use chrono::Utc;

    fn listing(username: &str, bio: &str, badge: Option<&str>) -> ProfileListing {
        ProfileListing {
            profile: Profile {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                username: Some(username.to_string()),
                display_name: None,
                bio: Some(bio.to_string()),
                avatar_url: None,
                favorite_crypto: None,
                crypto_quote: None,
                is_verified: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            awards: badge
                .map(|name| BadgeAward {
                    badge: Some(BadgeSummary::new(name, "*", Rarity::Common)),
                })
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn test_normalized_drops_blank_fields() {
        let filter = ProfileFilter {
            search: Some("  whale ".to_string()),
            badge: Some("   ".to_string()),
        }
        .normalized();
        assert_eq!(filter.search.as_deref(), Some("whale"));
        assert_eq!(filter.badge, None);
    }

    #[test]
    fn test_matches_search_and_badge() {
        let row = listing("cryptowhale", "Diamond hands", Some("Whale"));

        let by_search = ProfileFilter {
            search: Some("WHALE".to_string()),
            badge: None,
        };
        assert!(by_search.matches(&row));

        let by_badge = ProfileFilter {
            search: None,
            badge: Some("Whale".to_string()),
        };
        assert!(by_badge.matches(&row));

        let wrong_badge = ProfileFilter {
            search: Some("whale".to_string()),
            badge: Some("DeFi Farmer".to_string()),
        };
        assert!(!wrong_badge.matches(&row));
        assert!(ProfileFilter::default().matches(&row));
    }
}
