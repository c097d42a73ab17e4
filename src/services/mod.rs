// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session and directory logic.

pub mod directory;
pub mod session;

pub use directory::{placeholder_profiles, DirectoryView, ProfileDirectory, ProfilePage};
pub use session::{SessionSnapshot, SessionState, SessionStore};
