// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile directory: filtered, paginated listing of yearbook profiles.
//!
//! Each page is fetched with the filter pushed down to the provider, then
//! re-filtered locally. The total comes from a count query that uses the
//! same filter, so the page count and the "showing X of Y" label always
//! share one denominator.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Badge, BadgeAward, BadgeSummary, Profile, ProfileListing, Rarity};
use crate::perf::PerformanceMonitor;
use crate::provider::{ProfileFilter, ProfileStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::num::NonZeroU32;
use std::ops::RangeInclusive;
use std::sync::Arc;
use uuid::Uuid;

const LOAD_FAILED: &str = "Failed to load profiles. Please try again.";
const QUERY_METRIC: &str = "directory_query";

/// Page-number buttons shown at once.
const MAX_PAGE_BUTTONS: u32 = 5;

/// One page of directory results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilePage {
    pub profiles: Vec<ProfileListing>,
    pub page: u32,
    pub page_size: u32,
    /// Profiles matching the filter across all pages.
    pub total: u64,
    pub total_pages: u32,
    /// True when these are the labeled sample rows shown for an empty
    /// directory.
    pub placeholder: bool,
}

impl ProfilePage {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Pagination is only worth showing with more than one page.
    pub fn show_pagination(&self) -> bool {
        self.total_pages > 1
    }

    /// Up to five page numbers around the current page.
    pub fn page_numbers(&self) -> Vec<u32> {
        let count = self.total_pages.min(MAX_PAGE_BUTTONS);
        if count == 0 {
            return Vec::new();
        }
        let first = self
            .page
            .saturating_sub(MAX_PAGE_BUTTONS / 2)
            .clamp(1, self.total_pages - count + 1);
        (first..first + count).collect()
    }

    pub fn summary(&self) -> String {
        if self.placeholder {
            return format!("Showing {} sample profiles", self.profiles.len());
        }
        format!("Showing {} of {} profiles", self.profiles.len(), self.total)
    }
}

/// Queries the profile table for the directory.
pub struct ProfileDirectory {
    store: Arc<dyn ProfileStore>,
    page_size: u32,
    placeholders: bool,
    monitor: Arc<PerformanceMonitor>,
}

impl ProfileDirectory {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        config: &Config,
        monitor: Arc<PerformanceMonitor>,
    ) -> Self {
        Self {
            store,
            page_size: config.page_size.max(1),
            placeholders: config.placeholder_profiles,
            monitor,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Inclusive row range for a 1-based page.
    pub fn page_range(&self, page: NonZeroU32) -> RangeInclusive<u64> {
        let size = u64::from(self.page_size);
        let start = (u64::from(page.get()) - 1) * size;
        start..=start + size - 1
    }

    fn total_pages(&self, total: u64) -> u32 {
        let pages = total.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Fetch one page of profiles matching `filter`.
    pub async fn query(&self, filter: &ProfileFilter, page: NonZeroU32) -> Result<ProfilePage> {
        let filter = filter.normalized();
        let result = self
            .monitor
            .measure_async(QUERY_METRIC, self.run_query(&filter, page))
            .await;

        result.map_err(|e| match e {
            AppError::Configuration(_) => e,
            other => {
                tracing::warn!(error = %other, page = page.get(), "Directory query failed");
                AppError::Fetch(LOAD_FAILED.to_string())
            }
        })
    }

    async fn run_query(&self, filter: &ProfileFilter, page: NonZeroU32) -> Result<ProfilePage> {
        let (mut rows, total) = tokio::try_join!(
            self.store.list_profiles(filter, self.page_range(page)),
            self.store.count_profiles(filter),
        )?;

        if total == 0 && self.placeholders && self.table_is_empty(filter).await? {
            return Ok(self.placeholder_page(filter, page));
        }

        // The provider filter may be looser than ours; never show a row the
        // local predicate rejects.
        let fetched = rows.len();
        rows.retain(|row| filter.matches(row));
        if rows.len() != fetched {
            tracing::debug!(
                dropped = fetched - rows.len(),
                "Local filter removed rows the provider returned"
            );
        }

        tracing::debug!(
            page = page.get(),
            rows = rows.len(),
            total,
            "Directory page loaded"
        );

        Ok(ProfilePage {
            profiles: rows,
            page: page.get(),
            page_size: self.page_size,
            total,
            total_pages: self.total_pages(total),
            placeholder: false,
        })
    }

    async fn table_is_empty(&self, filter: &ProfileFilter) -> Result<bool> {
        if filter.is_empty() {
            return Ok(true);
        }
        Ok(self.store.count_profiles(&ProfileFilter::default()).await? == 0)
    }

    fn placeholder_page(&self, filter: &ProfileFilter, page: NonZeroU32) -> ProfilePage {
        let matching: Vec<ProfileListing> = placeholder_profiles()
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect();
        let total = matching.len() as u64;

        let range = self.page_range(page);
        let profiles = matching
            .into_iter()
            .skip(*range.start() as usize)
            .take(self.page_size as usize)
            .collect();

        tracing::debug!(total, "Directory is empty; serving placeholder profiles");

        ProfilePage {
            profiles,
            page: page.get(),
            page_size: self.page_size,
            total,
            total_pages: self.total_pages(total),
            placeholder: true,
        }
    }

    /// Count every profile row. Used as a connection check.
    pub async fn total_profiles(&self) -> Result<u64> {
        self.store.count_profiles(&ProfileFilter::default()).await
    }

    /// Badge reference list. Failures are logged and yield an empty list.
    pub async fn badges(&self) -> Vec<Badge> {
        match self.store.list_badges().await {
            Ok(badges) => badges,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load badges");
                Vec::new()
            }
        }
    }
}

/// Fixed sample rows shown when the directory has no profiles.
pub fn placeholder_profiles() -> Vec<ProfileListing> {
    let created_at = DateTime::<Utc>::UNIX_EPOCH;
    let row = |n: u128,
               username: &str,
               display_name: &str,
               bio: &str,
               crypto: &str,
               quote: &str,
               verified: bool,
               badges: Vec<BadgeSummary>| ProfileListing {
        profile: Profile {
            id: Uuid::from_u128(n),
            user_id: Uuid::from_u128(n),
            username: Some(username.to_string()),
            display_name: Some(display_name.to_string()),
            bio: Some(bio.to_string()),
            avatar_url: None,
            favorite_crypto: Some(crypto.to_string()),
            crypto_quote: Some(quote.to_string()),
            is_verified: verified,
            created_at,
            updated_at: created_at,
        },
        awards: badges
            .into_iter()
            .map(|badge| BadgeAward { badge: Some(badge) })
            .collect(),
    };

    vec![
        row(
            1,
            "cryptowhale",
            "Crypto Whale",
            "Diamond hands since 2010 💎🙌",
            "Bitcoin",
            "HODL to the moon! 🚀",
            true,
            vec![
                BadgeSummary::new("Diamond Hands", "💎", Rarity::Epic),
                BadgeSummary::new("Whale", "🐳", Rarity::Legendary),
            ],
        ),
        row(
            2,
            "nftartist",
            "NFT Artist",
            "Creating digital art for the metaverse 🎨",
            "Ethereum",
            "Art is the future of value",
            false,
            vec![BadgeSummary::new("NFT Collector", "🖼️", Rarity::Common)],
        ),
        row(
            3,
            "defi_farmer",
            "DeFi Farmer",
            "Yield farming since DeFi summer ⚡",
            "Chainlink",
            "Code is law",
            true,
            vec![BadgeSummary::new("DeFi Farmer", "🌾", Rarity::Rare)],
        ),
    ]
}

/// Stateful directory view: current filter, page and last good result.
pub struct DirectoryView {
    directory: Arc<ProfileDirectory>,
    filter: ProfileFilter,
    page: NonZeroU32,
    current: Option<ProfilePage>,
    error: Option<String>,
}

impl DirectoryView {
    pub fn new(directory: Arc<ProfileDirectory>) -> Self {
        Self {
            directory,
            filter: ProfileFilter::default(),
            page: NonZeroU32::MIN,
            current: None,
            error: None,
        }
    }

    /// Last successfully loaded page, kept across failed loads.
    pub fn current(&self) -> Option<&ProfilePage> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn page(&self) -> u32 {
        self.page.get()
    }

    pub fn filter(&self) -> &ProfileFilter {
        &self.filter
    }

    pub fn has_previous(&self) -> bool {
        self.page.get() > 1
    }

    pub fn has_next(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|p| self.page.get() < p.total_pages)
    }

    pub fn page_numbers(&self) -> Vec<u32> {
        self.current
            .as_ref()
            .map(ProfilePage::page_numbers)
            .unwrap_or_default()
    }

    /// Load the current filter and page. On failure the previous page stays
    /// visible and the error is kept until the next load.
    pub async fn load(&mut self) -> Result<()> {
        match self.directory.query(&self.filter, self.page).await {
            Ok(page) => {
                self.current = Some(page);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn retry(&mut self) -> Result<()> {
        self.load().await
    }

    pub async fn go_to_page(&mut self, page: NonZeroU32) -> Result<()> {
        self.page = page;
        self.load().await
    }

    pub async fn next_page(&mut self) -> Result<()> {
        if !self.has_next() {
            return Ok(());
        }
        self.go_to_page(self.page.saturating_add(1)).await
    }

    pub async fn previous_page(&mut self) -> Result<()> {
        match NonZeroU32::new(self.page.get() - 1) {
            Some(page) => self.go_to_page(page).await,
            None => Ok(()),
        }
    }

    /// Filter changes always go back to the first page.
    pub async fn set_search(&mut self, search: &str) -> Result<()> {
        self.filter.search = Some(search.to_string());
        self.filter = self.filter.normalized();
        self.go_to_page(NonZeroU32::MIN).await
    }

    pub async fn set_badge(&mut self, badge: Option<&str>) -> Result<()> {
        self.filter.badge = badge.map(str::to_string);
        self.filter = self.filter.normalized();
        self.go_to_page(NonZeroU32::MIN).await
    }

    pub async fn clear_filters(&mut self) -> Result<()> {
        self.filter = ProfileFilter::default();
        self.go_to_page(NonZeroU32::MIN).await
    }
}
