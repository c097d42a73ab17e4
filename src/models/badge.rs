// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Badge reference data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Badge rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Badge row from `yearbook_badges`. Not owned by any user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub rarity: Rarity,
    #[serde(default)]
    pub description: Option<String>,
}

/// Badge fields embedded in a profile listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeSummary {
    pub name: String,
    pub icon: String,
    pub rarity: Rarity,
}

impl BadgeSummary {
    pub fn new(name: &str, icon: &str, rarity: Rarity) -> Self {
        Self {
            name: name.to_string(),
            icon: icon.to_string(),
            rarity,
        }
    }
}
