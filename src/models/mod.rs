// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models.

pub mod badge;
pub mod profile;
pub mod session;

pub use badge::{Badge, BadgeSummary, Rarity};
pub use profile::{BadgeAward, Profile, ProfileListing, ProfileUpdate, ProfileUpsert};
pub use session::{ProviderToken, Session};
