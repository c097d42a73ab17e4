// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (route guards, security headers).

pub mod guard;
pub mod security;

pub use guard::{guard, public_only, require_session, GuardDecision, RouteKind};
