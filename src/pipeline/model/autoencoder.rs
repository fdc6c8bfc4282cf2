//! Autoencoder used for anomaly scoring
//!
//! The anomaly score of a row is the mean squared error between the
//! transformed input and its reconstruction.

use faer::Mat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::classifier::sigmoid;

/// Reconstructs transformed feature rows
pub trait Reconstructor: Send + Sync {
    /// Expected `(input, output)` widths, when the model knows them
    fn widths(&self) -> Option<(usize, usize)> {
        None
    }

    fn reconstruct(&self, features: &[f64]) -> Vec<f64>;

    /// Reconstruct every row of `inputs`, in row order
    fn reconstruct_batch(&self, inputs: &Mat<f64>) -> Vec<Vec<f64>> {
        (0..inputs.nrows())
            .into_par_iter()
            .map(|i| self.reconstruct(&row_values(inputs, i)))
            .collect()
    }
}

/// Copy one matrix row into a Vec
pub fn row_values(m: &Mat<f64>, i: usize) -> Vec<f64> {
    (0..m.ncols()).map(|j| m[(i, j)]).collect()
}

/// Mean squared difference between a row and its reconstruction
pub fn reconstruction_error(input: &[f64], output: &[f64]) -> f64 {
    if input.is_empty() {
        return 0.0;
    }
    input
        .iter()
        .zip(output)
        .map(|(x, r)| (x - r) * (x - r))
        .sum::<f64>()
        / input.len() as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    #[default]
    Linear,
}

impl Activation {
    fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }
}

/// Serialized form of a dense layer: `weights` is `inputs × outputs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayerSpec {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone)]
struct DenseLayer {
    weights: Mat<f64>,
    bias: Vec<f64>,
    activation: Activation,
}

/// Feed-forward autoencoder made of dense layers
#[derive(Debug, Clone)]
pub struct DenseAutoencoder {
    layers: Vec<DenseLayer>,
}

impl DenseAutoencoder {
    /// Build from layer specs, checking that the shapes chain.
    pub fn from_specs(specs: &[DenseLayerSpec]) -> Result<Self, String> {
        if specs.is_empty() {
            return Err("autoencoder has no layers".to_string());
        }

        let mut layers = Vec::with_capacity(specs.len());
        let mut previous_out: Option<usize> = None;

        for (idx, spec) in specs.iter().enumerate() {
            let n_in = spec.weights.len();
            let n_out = spec.weights.first().map(|r| r.len()).unwrap_or(0);
            if n_in == 0 || n_out == 0 {
                return Err(format!("layer {} has an empty weight matrix", idx));
            }
            if spec.weights.iter().any(|r| r.len() != n_out) {
                return Err(format!("layer {} has ragged weight rows", idx));
            }
            if spec.bias.len() != n_out {
                return Err(format!(
                    "layer {} bias has {} entries, expected {}",
                    idx,
                    spec.bias.len(),
                    n_out
                ));
            }
            if let Some(prev) = previous_out {
                if prev != n_in {
                    return Err(format!(
                        "layer {} expects {} inputs but the previous layer produces {}",
                        idx, n_in, prev
                    ));
                }
            }
            previous_out = Some(n_out);

            layers.push(DenseLayer {
                weights: Mat::from_fn(n_in, n_out, |i, j| spec.weights[i][j]),
                bias: spec.bias.clone(),
                activation: spec.activation,
            });
        }

        Ok(Self { layers })
    }

    fn forward(&self, inputs: &Mat<f64>) -> Mat<f64> {
        let mut x = inputs.clone();
        for layer in &self.layers {
            let mut z = x.as_ref() * &layer.weights;
            for i in 0..z.nrows() {
                for j in 0..z.ncols() {
                    z[(i, j)] = layer.activation.apply(z[(i, j)] + layer.bias[j]);
                }
            }
            x = z;
        }
        x
    }
}

impl Reconstructor for DenseAutoencoder {
    fn widths(&self) -> Option<(usize, usize)> {
        let first = self.layers.first()?;
        let last = self.layers.last()?;
        Some((first.weights.nrows(), last.weights.ncols()))
    }

    fn reconstruct(&self, features: &[f64]) -> Vec<f64> {
        let input = Mat::from_fn(1, features.len(), |_, j| features[j]);
        row_values(&self.forward(&input), 0)
    }

    fn reconstruct_batch(&self, inputs: &Mat<f64>) -> Vec<Vec<f64>> {
        let output = self.forward(inputs);
        (0..output.nrows()).map(|i| row_values(&output, i)).collect()
    }
}
