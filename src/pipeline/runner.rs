//! End-to-end orchestration: load, reconcile, normalize, select, score

use std::path::Path;

use super::cache::DatasetCache;
use super::config::PipelineConfig;
use super::error::{PipelineError, PipelineResult};
use super::features::apply_exclusions;
use super::model::ModelBundle;
use super::normalize::{normalize, NormalizeSummary};
use super::reconcile::{reconcile, summarize, ReconcileSummary};
use super::record::CanonicalRecord;
use super::scorer::{score, PriorityList};

/// Output of the cleaning stages with per-stage counts
#[derive(Debug, Clone, Default)]
pub struct CleanedDataset {
    pub reconcile: ReconcileSummary,
    pub normalize: NormalizeSummary,
    pub excluded_stale: usize,
    pub excluded_residual: usize,
    /// Every canonical, normalized record, before exclusions
    pub canonical: Vec<CanonicalRecord>,
    /// Records that passed the exclusion filters
    pub selected: Vec<CanonicalRecord>,
}

impl CleanedDataset {
    pub fn loaded(&self) -> usize {
        self.reconcile.input_records
    }
}

/// Pipeline bound to a configuration and a dataset cache
#[derive(Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    cache: DatasetCache,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cache: DatasetCache::new(),
        }
    }

    /// Share an existing cache with this pipeline
    pub fn with_cache(config: PipelineConfig, cache: DatasetCache) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Run the cleaning stages on a dataset file
    pub fn clean(&self, dataset: &Path) -> PipelineResult<CleanedDataset> {
        let raw = self
            .cache
            .load(dataset)?
            .ok_or_else(|| PipelineError::DatasetUnavailable {
                path: dataset.to_path_buf(),
                reason: "file not found".to_string(),
            })?;

        let reconciled = reconcile(&raw);
        let reconcile_summary = summarize(raw.len(), &reconciled);

        let (canonical, normalize_summary) = normalize(&reconciled, &self.config.mappings);
        let selection = apply_exclusions(&canonical, &self.config.selection);

        tracing::info!(
            loaded = raw.len(),
            canonical = canonical.len(),
            selected = selection.kept.len(),
            "cleaning complete"
        );

        Ok(CleanedDataset {
            reconcile: reconcile_summary,
            normalize: normalize_summary,
            excluded_stale: selection.excluded_stale,
            excluded_residual: selection.excluded_residual,
            canonical,
            selected: selection.kept,
        })
    }

    /// Load the model bundle, applying the configured unknown-category override
    pub fn load_bundle(&self, artifacts: &Path) -> PipelineResult<ModelBundle> {
        ModelBundle::load_with_policy(artifacts, self.config.unknown_category)
    }

    /// Score cleaned records and rank them
    pub fn score(&self, cleaned: &CleanedDataset, bundle: &ModelBundle) -> PipelineResult<PriorityList> {
        let scored = score(&cleaned.selected, bundle)?;
        Ok(PriorityList::new(scored, bundle.threshold))
    }

    /// Clean `dataset`, then score it with the bundle at `artifacts`.
    ///
    /// Dataset problems are reported before the bundle is touched.
    pub fn run(&self, dataset: &Path, artifacts: &Path) -> PipelineResult<(CleanedDataset, PriorityList)> {
        let cleaned = self.clean(dataset)?;
        let bundle = self.load_bundle(artifacts)?;
        let ranked = self.score(&cleaned, &bundle)?;
        Ok((cleaned, ranked))
    }
}
