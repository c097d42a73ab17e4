// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated session model.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// The authenticated identity for the current browser context.
///
/// At most one `Session` is active per session store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    /// Provider user ID (owner key for the profile row)
    pub user_id: Uuid,
    /// Account email, if the provider returned one
    pub email: Option<String>,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Opaque provider token material. Never serialized.
    #[serde(skip_serializing)]
    pub token: ProviderToken,
}

/// Token material issued by the provider.
#[derive(Clone, PartialEq)]
pub struct ProviderToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl ProviderToken {
    /// True if the token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }
}

impl std::fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderToken")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: DateTime<Utc>) -> ProviderToken {
        ProviderToken {
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", token(Utc::now()));
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn test_expires_within_margin() {
        let now = Utc::now();
        let t = token(now + Duration::minutes(3));
        assert!(t.expires_within(now, Duration::minutes(5)));
        assert!(!t.expires_within(now, Duration::minutes(1)));
    }

    #[test]
    fn test_session_serialization_skips_token() {
        let session = Session {
            user_id: Uuid::nil(),
            email: Some("user@example.com".to_string()),
            created_at: Utc::now(),
            token: token(Utc::now()),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["email"], "user@example.com");
    }
}
