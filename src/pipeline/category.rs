// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Disposal category mapping
//!
//! Maps a free-text classifier label to the bin the object belongs in.
//! Matching is case-insensitive substring matching over ordered keyword
//! groups; the first group that matches wins.

use serde::{Deserialize, Serialize};
use std::fmt;

const PLASTIC_AND_METAL_KEYWORDS: &[&str] = &["can", "plastic", "metal", "pop"];
const PAPER_KEYWORDS: &[&str] = &["paper", "cardboard", "carton"];
const BIO_KEYWORDS: &[&str] = &["food", "fruit", "biological"];

/// Waste disposal category reported as the `verdict` of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PlasticAndMetal,
    Paper,
    Bio,
    Glass,
    HouseholdWaste,
    Mixed,
}

impl Category {
    /// All categories in matching priority order
    pub const ALL: [Category; 6] = [
        Category::PlasticAndMetal,
        Category::Paper,
        Category::Bio,
        Category::Glass,
        Category::HouseholdWaste,
        Category::Mixed,
    ];

    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PlasticAndMetal => "plastic_and_metal",
            Category::Paper => "paper",
            Category::Bio => "bio",
            Category::Glass => "glass",
            Category::HouseholdWaste => "household_waste",
            Category::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a classifier label to its disposal category
///
/// ```
/// use waste_recognizer::pipeline::{map_to_category, Category};
///
/// assert_eq!(map_to_category("Pop Can"), Category::PlasticAndMetal);
/// assert_eq!(map_to_category("Battery"), Category::HouseholdWaste);
/// ```
pub fn map_to_category(label: &str) -> Category {
    let label = label.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| label.contains(k));

    if contains_any(PLASTIC_AND_METAL_KEYWORDS) {
        Category::PlasticAndMetal
    } else if contains_any(PAPER_KEYWORDS) {
        Category::Paper
    } else if contains_any(BIO_KEYWORDS) {
        Category::Bio
    } else if label.contains("glass") {
        Category::Glass
    } else if label.contains("battery") {
        Category::HouseholdWaste
    } else {
        Category::Mixed
    }
}
