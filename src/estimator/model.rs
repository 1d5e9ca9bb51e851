//! Savings estimate types.

use serde::{Deserialize, Serialize};

/// A dollar range in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DollarRange {
    pub min: u64,
    pub max: u64,
}

impl DollarRange {
    pub const ZERO: DollarRange = DollarRange::new(0, 0);

    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub const fn plus(self, other: DollarRange) -> Self {
        Self::new(self.min + other.min, self.max + other.max)
    }
}

/// One categorized contribution to the estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub category: String,
    pub description: String,
    pub min: u64,
    pub max: u64,
}

impl BreakdownEntry {
    pub fn new(category: &str, description: &str, range: DollarRange) -> Self {
        Self {
            category: category.to_string(),
            description: description.to_string(),
            min: range.min,
            max: range.max,
        }
    }

    pub fn range(&self) -> DollarRange {
        DollarRange::new(self.min, self.max)
    }
}

/// How soon the user should act.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    #[default]
    Normal,
    High,
    Critical,
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// The computed estimate. A fresh one replaces the old whenever answers change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsEstimate {
    pub total_min: u64,
    pub total_max: u64,
    pub breakdown: Vec<BreakdownEntry>,
    pub urgency_level: UrgencyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_message: Option<String>,
}

impl SavingsEstimate {
    /// Build an estimate whose totals are the sums of `breakdown`.
    pub fn from_breakdown(breakdown: Vec<BreakdownEntry>) -> Self {
        let total = breakdown
            .iter()
            .fold(DollarRange::ZERO, |acc, entry| acc.plus(entry.range()));
        Self {
            total_min: total.min,
            total_max: total.max,
            breakdown,
            urgency_level: UrgencyLevel::Normal,
            urgency_message: None,
        }
    }

    pub fn with_urgency(mut self, level: UrgencyLevel, message: Option<&str>) -> Self {
        self.urgency_level = level;
        self.urgency_message = message.map(String::from);
        self
    }
}
