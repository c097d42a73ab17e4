// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side input validation.
//!
//! Every check here runs before any provider call. A failed check never
//! reaches the network layer.

pub mod rate_limit;
pub mod rules;
pub mod sanitize;

pub use rate_limit::{RateDecision, RateLimiter};
pub use rules::{validate_form, FormReport, FormRules, Rule};
pub use sanitize::sanitize_html;

use crate::error::AppError;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use validator::ValidateEmail;

const EMAIL_MAX_LENGTH: usize = 254;
const PASSWORD_MIN_LENGTH: usize = 8;
const PASSWORD_MAX_LENGTH: usize = 128;
const USERNAME_MIN_LENGTH: usize = 3;
const USERNAME_MAX_LENGTH: usize = 30;
const DISPLAY_NAME_MIN_LENGTH: usize = 2;
const DISPLAY_NAME_MAX_LENGTH: usize = 50;
const BIO_MAX_LENGTH: usize = 500;
const BIO_MAX_LINE_BREAKS: usize = 5;
const FAVORITE_CRYPTO_MAX_LENGTH: usize = 50;
const CRYPTO_QUOTE_MAX_LENGTH: usize = 200;
const URL_MAX_LENGTH: usize = 2048;

const COMMON_PASSWORDS: &[&str] = &["password", "12345678", "qwerty123", "admin123", "Password1"];

const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "root",
    "api",
    "www",
    "mail",
    "support",
    "help",
    "test",
    "user",
    "null",
    "undefined",
];

static USERNAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("static regex"));

static DISPLAY_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-']+$").expect("static regex"));

/// A single failed check, carrying the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FieldError(pub String);

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::Validation(err.0)
    }
}

/// Outcome of a single field check.
pub type Check = std::result::Result<(), FieldError>;

fn fail(message: &str) -> Check {
    Err(FieldError::new(message))
}

pub fn validate_email(email: &str) -> Check {
    if email.is_empty() {
        return fail("Email is required");
    }
    if email.len() > EMAIL_MAX_LENGTH {
        return fail("Email is too long");
    }
    if !email.validate_email() {
        return fail("Please enter a valid email address");
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Check {
    if password.is_empty() {
        return fail("Password is required");
    }

    let length = password.chars().count();
    if length < PASSWORD_MIN_LENGTH {
        return fail("Password must be at least 8 characters long");
    }
    if length > PASSWORD_MAX_LENGTH {
        return fail("Password is too long (max 128 characters)");
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return fail(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        );
    }

    if COMMON_PASSWORDS.contains(&password) {
        return fail("This password is too common. Please choose a stronger password.");
    }

    Ok(())
}

pub fn validate_username(username: &str) -> Check {
    if username.is_empty() {
        return fail("Username is required");
    }

    let length = username.chars().count();
    if length < USERNAME_MIN_LENGTH {
        return fail("Username must be at least 3 characters long");
    }
    if length > USERNAME_MAX_LENGTH {
        return fail("Username must be less than 30 characters");
    }
    if !USERNAME_CHARS.is_match(username) {
        return fail("Username can only contain letters, numbers, and underscores");
    }
    if !username.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return fail("Username must start with a letter");
    }
    if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
        return fail("This username is reserved. Please choose another.");
    }

    Ok(())
}

pub fn validate_display_name(name: &str) -> Check {
    let trimmed = name.trim();
    if name.is_empty() {
        return fail("Display name is required");
    }

    let length = trimmed.chars().count();
    if length < DISPLAY_NAME_MIN_LENGTH {
        return fail("Display name must be at least 2 characters long");
    }
    if length > DISPLAY_NAME_MAX_LENGTH {
        return fail("Display name must be less than 50 characters");
    }
    if !DISPLAY_NAME_CHARS.is_match(trimmed) {
        return fail(
            "Display name can only contain letters, numbers, spaces, hyphens, and apostrophes",
        );
    }

    Ok(())
}

/// Bio is optional; an empty bio is valid.
pub fn validate_bio(bio: &str) -> Check {
    if bio.chars().count() > BIO_MAX_LENGTH {
        return fail("Bio must be less than 500 characters");
    }
    if bio.matches('\n').count() > BIO_MAX_LINE_BREAKS {
        return fail("Bio can contain at most 5 line breaks");
    }
    Ok(())
}

pub fn validate_favorite_crypto(name: &str) -> Check {
    if name.chars().count() > FAVORITE_CRYPTO_MAX_LENGTH {
        return fail("Favorite crypto must be less than 50 characters");
    }
    if name.contains('\n') {
        return fail("Favorite crypto must be a single line");
    }
    Ok(())
}

pub fn validate_crypto_quote(quote: &str) -> Check {
    if quote.chars().count() > CRYPTO_QUOTE_MAX_LENGTH {
        return fail("Crypto quote must be less than 200 characters");
    }
    if quote.matches('\n').count() > BIO_MAX_LINE_BREAKS {
        return fail("Crypto quote can contain at most 5 line breaks");
    }
    Ok(())
}

/// URLs are optional; an empty URL is valid. Only http and https are accepted.
pub fn validate_url(raw: &str) -> Check {
    if raw.is_empty() {
        return Ok(());
    }

    let parsed = url::Url::parse(raw).map_err(|_| FieldError::new("Please enter a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return fail("URL must use http or https protocol");
    }
    if raw.len() > URL_MAX_LENGTH {
        return fail("URL is too long");
    }
    Ok(())
}

/// Metadata of a file selected for upload.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

/// Upload constraints. Defaults accept images up to 5 MB.
#[derive(Debug, Clone)]
pub struct FileRules {
    pub max_size: u64,
    pub allowed_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

impl Default for FileRules {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            max_size: 5 * 1024 * 1024,
            allowed_types: owned(&["image/jpeg", "image/png", "image/gif", "image/webp"]),
            allowed_extensions: owned(&[".jpg", ".jpeg", ".png", ".gif", ".webp"]),
        }
    }
}

pub fn validate_file(file: Option<&FileMeta>, rules: &FileRules) -> Check {
    let Some(file) = file else {
        return fail("No file selected");
    };

    if file.size > rules.max_size {
        let max_mb = (rules.max_size as f64 / (1024.0 * 1024.0)).round() as u64;
        return Err(FieldError(format!("File size must be less than {}MB", max_mb)));
    }
    if !rules.allowed_types.iter().any(|t| t == &file.content_type) {
        return fail("File type not allowed. Please use JPG, PNG, GIF, or WebP.");
    }

    let name = file.name.to_lowercase();
    if !rules.allowed_extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
        return fail("Invalid file extension");
    }

    Ok(())
}

/// Validate every set field of a profile update.
pub fn validate_profile_update(update: &crate::models::ProfileUpdate) -> Check {
    if let Some(username) = &update.username {
        validate_username(username)?;
    }
    if let Some(name) = &update.display_name {
        validate_display_name(name)?;
    }
    if let Some(bio) = &update.bio {
        validate_bio(bio)?;
    }
    if let Some(url) = &update.avatar_url {
        validate_url(url)?;
    }
    if let Some(crypto) = &update.favorite_crypto {
        validate_favorite_crypto(crypto)?;
    }
    if let Some(quote) = &update.crypto_quote {
        validate_crypto_quote(quote)?;
    }
    Ok(())
}

/// Clean the free-text fields of an already validated update. Limits apply
/// to what the user typed, not to the escaped form.
pub fn sanitize_profile_update(
    mut update: crate::models::ProfileUpdate,
) -> crate::models::ProfileUpdate {
    update.bio = update.bio.as_deref().map(sanitize_html);
    update.crypto_quote = update.crypto_quote.as_deref().map(sanitize_html);
    update
}

/// Sign-up form as submitted by the auth screen.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: String,
    pub username: String,
}

/// Validate a sign-up form, stopping at the first problem.
pub fn validate_sign_up(form: &SignUpForm) -> Check {
    validate_email(&form.email)?;
    validate_password(&form.password)?;
    if form.password != form.confirm_password {
        return fail("Passwords do not match");
    }
    validate_display_name(&form.display_name)?;
    validate_username(&form.username)?;
    Ok(())
}
