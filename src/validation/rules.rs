// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Composable rule builders for generic form validation.

use super::{Check, FieldError};
use regex::Regex;
use std::collections::BTreeMap;

/// A boxed field check.
pub type Rule = Box<dyn Fn(&str) -> Check + Send + Sync>;

/// Fails on empty or whitespace-only input.
pub fn required(message: Option<&str>) -> Rule {
    let message = message.unwrap_or("This field is required").to_string();
    Box::new(move |value| {
        if value.trim().is_empty() {
            Err(FieldError(message.clone()))
        } else {
            Ok(())
        }
    })
}

/// Fails on non-empty input shorter than `min` characters.
pub fn min_length(min: usize, message: Option<&str>) -> Rule {
    let message = message
        .map(str::to_string)
        .unwrap_or_else(|| format!("Must be at least {} characters", min));
    Box::new(move |value| {
        if !value.is_empty() && value.chars().count() < min {
            Err(FieldError(message.clone()))
        } else {
            Ok(())
        }
    })
}

/// Fails on input longer than `max` characters.
pub fn max_length(max: usize, message: Option<&str>) -> Rule {
    let message = message
        .map(str::to_string)
        .unwrap_or_else(|| format!("Must be less than {} characters", max));
    Box::new(move |value| {
        if value.chars().count() > max {
            Err(FieldError(message.clone()))
        } else {
            Ok(())
        }
    })
}

/// Fails on non-empty input that does not match `pattern`.
pub fn matches(pattern: Regex, message: &str) -> Rule {
    let message = message.to_string();
    Box::new(move |value| {
        if !value.is_empty() && !pattern.is_match(value) {
            Err(FieldError(message.clone()))
        } else {
            Ok(())
        }
    })
}

/// Wrap one of the named field validators (e.g. `validate_username`) as a rule.
pub fn from_fn(check: fn(&str) -> Check) -> Rule {
    Box::new(check)
}

/// Rules per field name, applied in insertion order.
#[derive(Default)]
pub struct FormRules {
    fields: BTreeMap<String, Vec<Rule>>,
}

impl FormRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule for `field`.
    pub fn rule(mut self, field: &str, rule: Rule) -> Self {
        self.fields.entry(field.to_string()).or_default().push(rule);
        self
    }

    fn for_field(&self, field: &str) -> &[Rule] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Per-field error messages from a form validation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormReport {
    pub errors: BTreeMap<String, String>,
}

impl FormReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

/// Validate each submitted field against its rules. Only the first failing
/// rule of each field is reported.
pub fn validate_form<'a, I>(data: I, rules: &FormRules) -> FormReport
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut report = FormReport::default();

    for (field, value) in data {
        if let Some(err) = rules
            .for_field(field)
            .iter()
            .find_map(|rule| rule(value).err())
        {
            report.errors.insert(field.to_string(), err.0);
        }
    }

    report
}
