// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Yearbook profile model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::badge::BadgeSummary;

/// Profile row stored in `yearbook_profiles`.
///
/// One row per user, owned by the session whose `user_id` matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Owning user (unique, upsert key)
    pub user_id: Uuid,
    /// Public handle; unset until the user picks one
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub favorite_crypto: Option<String>,
    #[serde(default)]
    pub crypto_quote: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A profile is complete once it has both a username and a display name.
    pub fn is_complete(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.username) && set(&self.display_name)
    }

    /// Case-insensitive substring match over username, display name and bio.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        [&self.username, &self.display_name, &self.bio]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// One badge award embedded in a listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeAward {
    #[serde(rename = "yearbook_badges")]
    pub badge: Option<BadgeSummary>,
}

/// Profile row joined with its badge awards, as returned by the directory
/// query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileListing {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(default, rename = "yearbook_user_badges")]
    pub awards: Vec<BadgeAward>,
}

impl ProfileListing {
    /// Badges awarded to this profile, in award order.
    pub fn badges(&self) -> impl Iterator<Item = &BadgeSummary> {
        self.awards.iter().filter_map(|a| a.badge.as_ref())
    }

    /// Exact badge-name match.
    pub fn has_badge(&self, name: &str) -> bool {
        self.badges().any(|b| b.name == name)
    }
}

/// Partial profile sent by the owner. Unset fields are left untouched by the
/// upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_crypto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_quote: Option<String>,
}

impl ProfileUpdate {
    /// True if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &ProfileUpdate::default()
    }
}

/// Upsert body: the owner key, the changed fields and a fresh `updated_at`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpsert {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub fields: ProfileUpdate,
    pub updated_at: DateTime<Utc>,
}
