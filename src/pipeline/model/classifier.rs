//! Payment-probability classifier

use serde::{Deserialize, Serialize};

/// Positive-class probability for one transformed feature row
pub trait PaymentClassifier: Send + Sync {
    /// Expected row width, when the model knows it
    fn input_width(&self) -> Option<usize> {
        None
    }

    fn predict_probability(&self, features: &[f64]) -> f64;
}

/// Logistic regression exported as coefficients + intercept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticClassifier {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    fn decision(&self, features: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }
}

impl PaymentClassifier for LogisticClassifier {
    fn input_width(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn predict_probability(&self, features: &[f64]) -> f64 {
        sigmoid(self.decision(features))
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
