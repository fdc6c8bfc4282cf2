//! Pipeline configuration

use serde::{Deserialize, Serialize};

use super::features::SelectionPolicy;
use super::model::UnknownCategoryPolicy;
use super::normalize::CategoryMappings;

/// Tunables for one pipeline instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Exclusion thresholds
    #[serde(default)]
    pub selection: SelectionPolicy,
    /// Categorical value mappings
    #[serde(default)]
    pub mappings: CategoryMappings,
    /// Overrides the bundle's unknown-category policy when set
    #[serde(default)]
    pub unknown_category: Option<UnknownCategoryPolicy>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            selection: SelectionPolicy::default(),
            mappings: CategoryMappings::builtin(),
            unknown_category: None,
        }
    }
}
