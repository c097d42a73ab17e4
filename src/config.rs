// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Provider credentials are read once at startup. Missing credentials do not
//! abort startup: they are kept as `None` and surface as a
//! `ConfigurationError` from the first provider-backed call.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of profiles per directory page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider base URL (e.g. `https://project.supabase.co`)
    pub supabase_url: Option<String>,
    /// Provider public (anon) API key
    pub supabase_anon_key: Option<String>,
    /// Public URL of this site, used for password-reset redirects
    pub site_url: String,
    /// Local server port
    pub port: u16,
    /// Directory page size
    pub page_size: u32,
    /// Show the labeled placeholder profiles when the table is empty
    pub placeholder_profiles: bool,
    /// Timeout applied to every provider request
    pub request_timeout: Duration,
    /// How long an error stays in the session store's error slot
    pub error_display: Duration,
    /// File the provider session is persisted to between runs
    pub session_file: Option<PathBuf>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self::test_default()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let supabase_url = non_empty_var("SUPABASE_URL").map(|v| v.trim_end_matches('/').to_string());
        let supabase_anon_key = non_empty_var("SUPABASE_ANON_KEY");

        if supabase_url.is_none() || supabase_anon_key.is_none() {
            tracing::warn!(
                has_url = supabase_url.is_some(),
                has_key = supabase_anon_key.is_some(),
                "Provider credentials missing; auth and directory calls will report a configuration error"
            );
        }

        let page_size = match env::var("YEARBOOK_PAGE_SIZE") {
            Ok(raw) => {
                let parsed: u32 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("YEARBOOK_PAGE_SIZE"))?;
                if parsed == 0 {
                    return Err(ConfigError::Invalid("YEARBOOK_PAGE_SIZE"));
                }
                parsed
            }
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        let placeholder_profiles = match env::var("YEARBOOK_PLACEHOLDER_PROFILES") {
            Ok(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid("YEARBOOK_PLACEHOLDER_PROFILES"))?,
            // Placeholder rows never ship in release builds unless asked for.
            Err(_) => cfg!(debug_assertions),
        };

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            site_url: env::var("SITE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            page_size,
            placeholder_profiles,
            request_timeout: Duration::from_secs(secs_var("YEARBOOK_REQUEST_TIMEOUT_SECS", 10)?),
            error_display: Duration::from_secs(secs_var("YEARBOOK_ERROR_DISPLAY_SECS", 5)?),
            session_file: non_empty_var("YEARBOOK_SESSION_FILE").map(PathBuf::from),
        })
    }

    /// Config for tests: points at a local provider and keeps placeholders on.
    pub fn test_default() -> Self {
        Self {
            supabase_url: Some("http://127.0.0.1:54321".to_string()),
            supabase_anon_key: Some("test-anon-key".to_string()),
            site_url: "http://localhost:5173".to_string(),
            port: 8080,
            page_size: DEFAULT_PAGE_SIZE,
            placeholder_profiles: true,
            request_timeout: Duration::from_secs(10),
            error_display: Duration::from_secs(5),
            session_file: None,
        }
    }

    /// Provider credentials, or a configuration error naming what is missing.
    pub fn provider_credentials(&self) -> crate::error::Result<(&str, &str)> {
        let url = self.supabase_url.as_deref().ok_or_else(|| {
            crate::error::AppError::Configuration("SUPABASE_URL is not set".to_string())
        })?;
        let key = self.supabase_anon_key.as_deref().ok_or_else(|| {
            crate::error::AppError::Configuration("SUPABASE_ANON_KEY is not set".to_string())
        })?;
        Ok((url, key))
    }

    /// Where password-reset emails send the user back to.
    pub fn reset_redirect_url(&self) -> String {
        format!("{}/reset-password", self.site_url)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secs_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
