//! Model artifact bundle
//!
//! One JSON file holding the fitted transform, the classifier, the
//! autoencoder, the anomaly threshold and the ordered input field list. The
//! pieces are only meaningful together, so the bundle is validated as a unit.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::autoencoder::{DenseAutoencoder, DenseLayerSpec, Reconstructor};
use super::classifier::{LogisticClassifier, PaymentClassifier};
use super::transform::{FittedTransform, Preprocessor, UnknownCategoryPolicy};
use crate::pipeline::error::{PipelineError, PipelineResult};

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierSpec {
    Logistic {
        coefficients: Vec<f64>,
        intercept: f64,
    },
}

#[derive(Debug, Deserialize)]
struct AutoencoderSpec {
    layers: Vec<DenseLayerSpec>,
}

#[derive(Debug, Deserialize)]
struct BundleFile {
    feature_names: Vec<String>,
    threshold: f64,
    preprocessor: FittedTransform,
    classifier: ClassifierSpec,
    autoencoder: AutoencoderSpec,
}

/// The four model components plus the input field contract.
///
/// Cheap to clone; the components are shared.
#[derive(Clone)]
pub struct ModelBundle {
    /// Ordered input fields expected by the preprocessor
    pub feature_names: Vec<String>,
    /// Anomaly flag threshold, fixed offline
    pub threshold: f64,
    preprocessor: Arc<dyn Preprocessor>,
    classifier: Arc<dyn PaymentClassifier>,
    autoencoder: Arc<dyn Reconstructor>,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("feature_names", &self.feature_names)
            .field("threshold", &self.threshold)
            .field("transform_width", &self.preprocessor.output_width())
            .finish()
    }
}

impl ModelBundle {
    /// Assemble a bundle from arbitrary component implementations
    pub fn from_parts(
        feature_names: Vec<String>,
        threshold: f64,
        preprocessor: Arc<dyn Preprocessor>,
        classifier: Arc<dyn PaymentClassifier>,
        autoencoder: Arc<dyn Reconstructor>,
    ) -> Self {
        Self {
            feature_names,
            threshold,
            preprocessor,
            classifier,
            autoencoder,
        }
    }

    /// Load and validate a bundle file
    pub fn load(path: &Path) -> PipelineResult<Self> {
        Self::load_with_policy(path, None)
    }

    /// Load a bundle, optionally overriding its unknown-category policy
    pub fn load_with_policy(
        path: &Path,
        unknown_category: Option<UnknownCategoryPolicy>,
    ) -> PipelineResult<Self> {
        let unavailable = |reason: String| PipelineError::ArtifactUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        if !path.exists() {
            return Err(unavailable("file not found".to_string()));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| unavailable(format!("failed to read bundle: {}", e)))?;

        let bundle = Self::from_json(&text, unknown_category).map_err(unavailable)?;

        tracing::info!(
            path = %path.display(),
            fields = bundle.feature_names.len(),
            width = bundle.preprocessor.output_width(),
            threshold = bundle.threshold,
            "model bundle loaded"
        );

        Ok(bundle)
    }

    /// Parse and validate a bundle from its JSON text
    pub fn from_json(
        text: &str,
        unknown_category: Option<UnknownCategoryPolicy>,
    ) -> Result<Self, String> {
        let file: BundleFile =
            serde_json::from_str(text).map_err(|e| format!("invalid bundle JSON: {}", e))?;

        let mut transform = file.preprocessor;
        if let Some(policy) = unknown_category {
            transform = transform.with_unknown_policy(policy);
        }

        let classifier = match file.classifier {
            ClassifierSpec::Logistic {
                coefficients,
                intercept,
            } => LogisticClassifier::new(coefficients, intercept),
        };
        let autoencoder = DenseAutoencoder::from_specs(&file.autoencoder.layers)?;

        let bundle = Self::from_parts(
            file.feature_names,
            file.threshold,
            Arc::new(transform),
            Arc::new(classifier),
            Arc::new(autoencoder),
        );
        bundle.validate()?;
        Ok(bundle)
    }

    /// Check that the components agree with each other
    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            ));
        }

        let undeclared: Vec<String> = self
            .preprocessor
            .input_fields()
            .into_iter()
            .filter(|f| !self.feature_names.contains(f))
            .collect();
        if !undeclared.is_empty() {
            return Err(format!(
                "transform reads fields not listed in feature_names: {}",
                undeclared.join(", ")
            ));
        }

        let width = self.preprocessor.output_width();
        if let Some(expected) = self.classifier.input_width() {
            if expected != width {
                return Err(format!(
                    "classifier expects {} features, transform produces {}",
                    expected, width
                ));
            }
        }
        if let Some((n_in, n_out)) = self.autoencoder.widths() {
            if n_in != width || n_out != width {
                return Err(format!(
                    "autoencoder maps {} -> {} features, transform produces {}",
                    n_in, n_out, width
                ));
            }
        }

        Ok(())
    }

    pub fn preprocessor(&self) -> &dyn Preprocessor {
        self.preprocessor.as_ref()
    }

    pub fn classifier(&self) -> &dyn PaymentClassifier {
        self.classifier.as_ref()
    }

    pub fn autoencoder(&self) -> &dyn Reconstructor {
        self.autoencoder.as_ref()
    }
}
