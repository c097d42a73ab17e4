// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Accessibility helpers (WCAG 2.1): focus trapping, keyboard navigation,
//! live-region announcements, color contrast and heading checks.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::Duration;

/// How long an announcement stays in its live region.
pub const ANNOUNCEMENT_TTL: Duration = Duration::from_secs(1);

/// Keys the helpers react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Other,
}

// ─── Focus trap ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrapAction {
    /// Move focus to this element.
    Focus(String),
    /// Escape was pressed; the owner should close the dialog.
    Escape,
    Ignore,
}

/// Keeps Tab focus cycling inside an ordered set of focusable elements.
#[derive(Debug, Clone)]
pub struct FocusTrap {
    focusable: Vec<String>,
    current: Option<usize>,
    active: bool,
}

impl FocusTrap {
    pub fn new<I, S>(focusable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            focusable: focusable.into_iter().map(Into::into).collect(),
            current: None,
            active: false,
        }
    }

    /// Start trapping. Returns the element that should receive focus.
    pub fn activate(&mut self) -> Option<&str> {
        self.active = true;
        self.current = (!self.focusable.is_empty()).then_some(0);
        self.focused()
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.current = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn focused(&self) -> Option<&str> {
        self.current.map(|i| self.focusable[i].as_str())
    }

    /// Record focus moving to `id` by other means (e.g. a click).
    pub fn set_focus(&mut self, id: &str) {
        if let Some(index) = self.focusable.iter().position(|f| f == id) {
            self.current = Some(index);
        }
    }

    pub fn handle_key(&mut self, key: Key, shift: bool) -> TrapAction {
        if !self.active {
            return TrapAction::Ignore;
        }
        match key {
            Key::Escape => TrapAction::Escape,
            Key::Tab if !self.focusable.is_empty() => {
                let len = self.focusable.len();
                let next = match (self.current, shift) {
                    (None, false) => 0,
                    (None, true) => len - 1,
                    (Some(i), false) => (i + 1) % len,
                    (Some(i), true) => (i + len - 1) % len,
                };
                self.current = Some(next);
                TrapAction::Focus(self.focusable[next].clone())
            }
            _ => TrapAction::Ignore,
        }
    }
}

// ─── Keyboard navigation ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
    Both,
}

/// Roving focus over a list of items driven by arrow keys and Home/End.
#[derive(Debug, Clone)]
pub struct KeyboardNavigator {
    len: usize,
    orientation: Orientation,
    wrap: bool,
    current: usize,
}

impl KeyboardNavigator {
    pub fn new(len: usize, orientation: Orientation, wrap: bool) -> Self {
        Self {
            len,
            orientation,
            wrap,
            current: 0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Out-of-range indices are ignored.
    pub fn set_current_index(&mut self, index: usize) {
        if index < self.len {
            self.current = index;
        }
    }

    /// Handle a key press. Returns the newly focused index when focus moved,
    /// and whether the key was consumed.
    pub fn handle_key(&mut self, key: Key) -> (Option<usize>, bool) {
        let vertical = matches!(self.orientation, Orientation::Vertical | Orientation::Both);
        let horizontal = matches!(self.orientation, Orientation::Horizontal | Orientation::Both);

        let step = match key {
            Key::ArrowDown if vertical => Step::Next,
            Key::ArrowUp if vertical => Step::Previous,
            Key::ArrowRight if horizontal => Step::Next,
            Key::ArrowLeft if horizontal => Step::Previous,
            Key::Home => Step::First,
            Key::End => Step::Last,
            _ => return (None, false),
        };
        (self.navigate(step), true)
    }

    fn navigate(&mut self, step: Step) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let last = self.len - 1;
        let next = match step {
            Step::Next if self.wrap => (self.current + 1) % self.len,
            Step::Next => (self.current + 1).min(last),
            Step::Previous if self.wrap => (self.current + self.len - 1) % self.len,
            Step::Previous => self.current.saturating_sub(1),
            Step::First => 0,
            Step::Last => last,
        };
        (next != self.current).then(|| {
            self.current = next;
            next
        })
    }
}

enum Step {
    Next,
    Previous,
    First,
    Last,
}

// ─── Live regions ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Polite,
    Assertive,
    /// Polite region with `role="status"`.
    Status,
}

impl Region {
    pub fn aria_live(self) -> &'static str {
        match self {
            Region::Polite | Region::Status => "polite",
            Region::Assertive => "assertive",
        }
    }

    pub fn role(self) -> Option<&'static str> {
        matches!(self, Region::Status).then_some("status")
    }
}

#[derive(Default)]
struct RegionText {
    text: String,
    seq: u64,
}

/// Screen-reader announcements. Each announcement replaces the region text
/// and is cleared again after [`ANNOUNCEMENT_TTL`].
///
/// Announcing spawns a tokio task, so it must run inside a runtime.
#[derive(Clone)]
pub struct LiveRegionManager {
    regions: Arc<Mutex<HashMap<Region, RegionText>>>,
    ttl: Duration,
}

impl Default for LiveRegionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveRegionManager {
    pub fn new() -> Self {
        Self::with_ttl(ANNOUNCEMENT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let regions = [Region::Polite, Region::Assertive, Region::Status]
            .into_iter()
            .map(|r| (r, RegionText::default()))
            .collect();
        Self {
            regions: Arc::new(Mutex::new(regions)),
            ttl,
        }
    }

    pub fn announce(&self, message: &str, region: Region) {
        let seq = {
            let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = regions.entry(region).or_default();
            slot.seq += 1;
            slot.text = message.to_string();
            slot.seq
        };
        tracing::debug!(region = region.aria_live(), message, "Announcing");

        let regions = Arc::clone(&self.regions);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut regions = regions.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = regions.get_mut(&region) {
                // A newer announcement owns the region now.
                if slot.seq == seq {
                    slot.text.clear();
                }
            }
        });
    }

    pub fn announce_error(&self, message: &str) {
        self.announce(message, Region::Assertive);
    }

    pub fn announce_status(&self, message: &str) {
        self.announce(message, Region::Status);
    }

    /// Current text of a region; empty when nothing is being announced.
    pub fn text(&self, region: Region) -> String {
        self.regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&region)
            .map(|slot| slot.text.clone())
            .unwrap_or_default()
    }
}

// ─── Color contrast ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized color: {0}")]
pub struct ColorParseError(String);

static RGB_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*[\d.]+\s*)?\)$")
        .expect("static regex")
});

impl Rgb {
    /// Parse `#rgb`, `#rrggbb` or `rgb(r, g, b)`.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let s = input.trim();
        let err = || ColorParseError(input.to_string());

        if let Some(hex) = s.strip_prefix('#') {
            let digits: Vec<u8> = hex
                .chars()
                .map(|c| c.to_digit(16).map(|d| d as u8))
                .collect::<Option<_>>()
                .ok_or_else(err)?;
            return match digits.as_slice() {
                [r, g, b] => Ok(Rgb(r * 17, g * 17, b * 17)),
                [r1, r2, g1, g2, b1, b2] => Ok(Rgb(r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2)),
                _ => Err(err()),
            };
        }

        let caps = RGB_FUNCTION.captures(s).ok_or_else(err)?;
        let channel = |i: usize| caps[i].parse::<u8>().map_err(|_| err());
        Ok(Rgb(channel(1)?, channel(2)?, channel(3)?))
    }

    /// WCAG relative luminance.
    pub fn relative_luminance(self) -> f64 {
        let linear = |c: u8| {
            let c = f64::from(c) / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * linear(self.0) + 0.7152 * linear(self.1) + 0.0722 * linear(self.2)
    }
}

/// Contrast ratio between two colors, from 1.0 to 21.0.
pub fn contrast_ratio(foreground: Rgb, background: Rgb) -> f64 {
    let a = foreground.relative_luminance();
    let b = background.relative_luminance();
    let (light, dark) = if a >= b { (a, b) } else { (b, a) };
    (light + 0.05) / (dark + 0.05)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorContrast {
    pub ratio: f64,
    pub aa: bool,
    pub aaa: bool,
    pub aa_large: bool,
    pub aaa_large: bool,
}

impl ColorContrast {
    pub fn check(foreground: Rgb, background: Rgb) -> Self {
        let ratio = contrast_ratio(foreground, background);
        Self {
            ratio,
            aa: ratio >= 4.5,
            aaa: ratio >= 7.0,
            aa_large: ratio >= 3.0,
            aaa_large: ratio >= 4.5,
        }
    }

    pub fn check_str(foreground: &str, background: &str) -> Result<Self, ColorParseError> {
        Ok(Self::check(Rgb::parse(foreground)?, Rgb::parse(background)?))
    }
}

impl fmt::Display for ColorContrast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}:1", self.ratio)
    }
}

// ─── Headings ────────────────────────────────────────────────

/// Report headings that skip a level, given heading levels (1-6) in
/// document order.
pub fn heading_structure_issues(levels: &[u8]) -> Vec<String> {
    let mut issues = Vec::new();
    let mut current = 0u8;
    for &level in levels {
        if level > current.saturating_add(1) {
            issues.push(format!(
                "Heading level skipped: h{} after h{}",
                level, current
            ));
        }
        current = level;
    }
    issues
}
