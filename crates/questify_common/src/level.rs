//! Level calculator.
//!
//! Levels are uniform 100 XP bands starting at level 1:
//!
//! - Level 1: 0-99 XP
//! - Level 2: 100-199 XP
//! - Level N: (N-1)*100 .. N*100-1 XP

use serde::{Deserialize, Serialize};

/// Width of every level band
pub const XP_PER_LEVEL: u64 = 100;

/// A user's level, derived from total XP (always >= 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(u64);

impl Level {
    /// Calculate level from total XP: floor(xp / 100) + 1
    pub fn from_xp(total_xp: u64) -> Self {
        Self(total_xp / XP_PER_LEVEL + 1)
    }

    /// Get the raw level number
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Total XP at which this level begins
    pub fn xp_at_start(&self) -> u64 {
        xp_at_level_start(self.0)
    }

    /// Total XP at which the next level begins
    pub fn xp_for_next(&self) -> u64 {
        xp_for_next_level(self.0)
    }

    /// Whether this level meets an integer threshold (negative thresholds always do)
    pub fn meets(&self, threshold: i64) -> bool {
        match u64::try_from(threshold) {
            Ok(t) => self.0 >= t,
            Err(_) => true,
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Self(1)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// level(total_xp) = floor(total_xp / 100) + 1
pub fn level(total_xp: u64) -> u64 {
    Level::from_xp(total_xp).value()
}

/// (level - 1) * 100
pub fn xp_at_level_start(level: u64) -> u64 {
    level.saturating_sub(1).saturating_mul(XP_PER_LEVEL)
}

/// level * 100
pub fn xp_for_next_level(level: u64) -> u64 {
    level.saturating_mul(XP_PER_LEVEL)
}

/// Level fields presented alongside a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u64,
    pub total_xp: u64,
    pub xp_at_level_start: u64,
    pub xp_for_next_level: u64,
    /// XP earned inside the current band
    pub xp_into_level: u64,
    /// Band width (constant)
    pub xp_needed_to_level_up: u64,
}

impl LevelProgress {
    pub fn from_xp(total_xp: u64) -> Self {
        let level = Level::from_xp(total_xp);
        let start = level.xp_at_start();
        Self {
            level: level.value(),
            total_xp,
            xp_at_level_start: start,
            xp_for_next_level: level.xp_for_next(),
            xp_into_level: total_xp - start,
            xp_needed_to_level_up: XP_PER_LEVEL,
        }
    }

    /// Progress through the current band (0.0 - 1.0)
    pub fn fraction(&self) -> f64 {
        self.xp_into_level as f64 / XP_PER_LEVEL as f64
    }
}
