//! Categorical normalization
//!
//! Rewrites gender, age bracket and region values to canonical labels. The
//! lookup tables are data ([`CategoryMappings`]), not logic: the fitted
//! transform downstream groups by label identity, so the labels must match the
//! ones it was fitted on exactly.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::record::CanonicalRecord;

/// Label used for null, blank and not-applicable values
pub const NOT_SPECIFIED: &str = "No especificado";

/// Raw marker meaning "not applicable"
pub const NOT_APPLICABLE: &str = "NO APLICA";

pub const MALE: &str = "HOMBRE";
pub const FEMALE: &str = "MUJER";

/// Canonical age brackets in reporting order
pub const CANONICAL_AGE_BRACKETS: [&str; 7] = [
    "18-25",
    "26-35",
    "36-45",
    "46-55",
    "56-65",
    "Mayor a 65",
    NOT_SPECIFIED,
];

/// Built-in gender table. Values not listed pass through unchanged.
pub const GENDER_MAP: [(&str, &str); 3] = [
    ("M", MALE),
    ("F", FEMALE),
    (NOT_APPLICABLE, NOT_SPECIFIED),
];

/// Built-in age bracket table: overlapping source ranges to canonical buckets.
pub const AGE_BRACKET_MAP: [(&str, &str); 25] = [
    ("18-21", "18-25"),
    ("18-25", "18-25"),
    ("22-25", "18-25"),
    ("25-30", "26-35"),
    ("26-29", "26-35"),
    ("30-33", "26-35"),
    ("31-35", "26-35"),
    ("34-37", "26-35"),
    ("36-40", "36-45"),
    ("38-41", "36-45"),
    ("41-45", "36-45"),
    ("42-45", "36-45"),
    ("46-49", "46-55"),
    ("46-50", "46-55"),
    ("50-53", "46-55"),
    ("51-55", "46-55"),
    ("54-57", "56-65"),
    ("56-60", "56-65"),
    ("58-61", "56-65"),
    ("61-65", "56-65"),
    ("62-65", "56-65"),
    ("66+", "Mayor a 65"),
    ("66-70", "Mayor a 65"),
    ("71-75", "Mayor a 65"),
    ("Mas de 75", "Mayor a 65"),
];

/// Value-mapping rules for the categorical fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMappings {
    /// Raw gender value -> canonical label
    pub gender: BTreeMap<String, String>,
    /// Raw age bracket -> canonical bucket
    pub age_bracket: BTreeMap<String, String>,
    /// Label for null, blank and unrecognized values
    #[serde(default = "default_not_specified")]
    pub not_specified: String,
}

fn default_not_specified() -> String {
    NOT_SPECIFIED.to_string()
}

impl Default for CategoryMappings {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CategoryMappings {
    /// The tables the production transform was fitted against
    pub fn builtin() -> Self {
        Self {
            gender: to_map(&GENDER_MAP),
            age_bracket: to_map(&AGE_BRACKET_MAP),
            not_specified: default_not_specified(),
        }
    }

    /// Load mappings from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read category mappings: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse category mappings: {}", path.display()))
    }

    /// Canonical gender label for a raw value
    pub fn gender_label(&self, raw: Option<&str>) -> String {
        match raw {
            None => self.not_specified.clone(),
            Some(value) if value.trim().is_empty() => self.not_specified.clone(),
            Some(value) => self
                .gender
                .get(value)
                .cloned()
                .unwrap_or_else(|| value.to_string()),
        }
    }

    /// Canonical age bucket for a raw value; anything unrecognized is not specified
    pub fn age_bracket_label(&self, raw: Option<&str>) -> String {
        let Some(value) = raw else {
            return self.not_specified.clone();
        };
        if let Some(bucket) = self.age_bracket.get(value) {
            return bucket.clone();
        }
        // Already-canonical labels map to themselves so normalization is idempotent.
        if self.age_bracket.values().any(|bucket| bucket == value) {
            return value.to_string();
        }
        self.not_specified.clone()
    }

    /// Region label: free text kept as-is, null or blank becomes not specified
    pub fn region_label(&self, raw: Option<&str>) -> String {
        match raw {
            Some(value) if !value.trim().is_empty() => value.to_string(),
            _ => self.not_specified.clone(),
        }
    }
}

/// Counts of values rewritten by a normalization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub gender_rewritten: usize,
    pub age_bracket_rewritten: usize,
    pub region_filled: usize,
}

/// Canonicalize gender, age bracket and region. Never drops rows.
pub fn normalize(
    records: &[CanonicalRecord],
    mappings: &CategoryMappings,
) -> (Vec<CanonicalRecord>, NormalizeSummary) {
    let mut summary = NormalizeSummary::default();

    let normalized = records
        .iter()
        .map(|canonical| {
            let mut record = canonical.record.clone();

            let gender = mappings.gender_label(record.gender.as_deref());
            if record.gender.as_deref() != Some(gender.as_str()) {
                summary.gender_rewritten += 1;
            }
            record.gender = Some(gender);

            let age = mappings.age_bracket_label(record.age_bracket.as_deref());
            if record.age_bracket.as_deref() != Some(age.as_str()) {
                summary.age_bracket_rewritten += 1;
            }
            record.age_bracket = Some(age);

            let region = mappings.region_label(record.region.as_deref());
            if record.region.as_deref() != Some(region.as_str()) {
                summary.region_filled += 1;
            }
            record.region = Some(region);

            CanonicalRecord::new(record)
        })
        .collect();

    tracing::debug!(
        gender = summary.gender_rewritten,
        age_bracket = summary.age_bracket_rewritten,
        region = summary.region_filled,
        "normalization complete"
    );

    (normalized, summary)
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(raw, label)| (raw.to_string(), label.to_string()))
        .collect()
}
