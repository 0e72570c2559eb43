//! Scoring Model
//!
//! Two-layer graph convolutional network trained per request:
//!
//! ```text
//! H1  = dropout(relu(Â · X · W1 + b1))
//! out = Â · H1 · W2 + b2
//! ```
//!
//! Trained full-batch with mean squared error against the mastery targets and
//! Adam. Scores are `sigmoid(out)` with dropout disabled.

mod adam;

pub use adam::Adam;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::ModelError;
use crate::features::FeatureMatrix;
use crate::graph::NormalizedAdjacency;
use crate::matrix::{add_row_bias, column_sums, mat_mul, mat_mul_transpose_a, mat_mul_transpose_b, sigmoid};
use crate::sanitize::{diagnose_parameters, has_invalid_values};
use crate::types::{DiagnosticResult, FitReport, GcnConfig, FEATURE_DIMENSION};

const LOSS_LOG_INTERVAL: usize = 50;

/// Intermediate values of one forward pass, kept for backprop
struct ForwardPass {
    /// Pre-activation of the hidden layer (`N × hidden`)
    hidden_pre: Vec<f64>,
    /// Hidden activations after relu and dropout (`N × hidden`)
    hidden: Vec<f64>,
    /// Dropout multipliers (`0` or `1 / (1 - p)`), absent when not training
    mask: Option<Vec<f64>>,
    /// Raw output per node
    output: Vec<f64>,
}

/// Per-student lesson scoring network.
///
/// Parameters live in one flat buffer laid out as `[W1 | b1 | W2 | b2]`.
#[derive(Debug, Clone)]
pub struct LessonGcn {
    config: GcnConfig,
    input_dim: usize,
    params: Vec<f64>,
    rng: ChaCha8Rng,
    fitted: bool,
}

impl LessonGcn {
    pub fn new(config: GcnConfig) -> Self {
        Self::with_input_dim(config, FEATURE_DIMENSION)
    }

    pub fn with_input_dim(config: GcnConfig, input_dim: usize) -> Self {
        let config = config.bounded();
        let hidden = config.hidden_dim;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut params = vec![0.0; input_dim * hidden + hidden + hidden + 1];
        glorot_uniform(&mut params[..input_dim * hidden], input_dim, hidden, &mut rng);
        let w2_start = input_dim * hidden + hidden;
        glorot_uniform(&mut params[w2_start..w2_start + hidden], hidden, 1, &mut rng);

        Self {
            config,
            input_dim,
            params,
            rng,
            fitted: false,
        }
    }

    pub fn config(&self) -> &GcnConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    // ==================== Parameter views ====================

    fn w1(&self) -> &[f64] {
        &self.params[..self.input_dim * self.config.hidden_dim]
    }

    fn b1(&self) -> &[f64] {
        let start = self.input_dim * self.config.hidden_dim;
        &self.params[start..start + self.config.hidden_dim]
    }

    fn w2(&self) -> &[f64] {
        let start = self.input_dim * self.config.hidden_dim + self.config.hidden_dim;
        &self.params[start..start + self.config.hidden_dim]
    }

    fn b2(&self) -> f64 {
        self.params[self.params.len() - 1]
    }

    // ==================== Training ====================

    /// Fits the network for exactly `config.epochs` steps.
    pub fn fit(
        &mut self,
        features: &FeatureMatrix,
        adjacency: &NormalizedAdjacency,
        targets: &[f64],
    ) -> Result<FitReport, ModelError> {
        self.check_inputs(features, adjacency)?;
        if targets.len() != features.rows() {
            return Err(ModelError::ShapeMismatch {
                expected: features.rows(),
                actual: targets.len(),
            });
        }

        let n = features.rows();
        let hidden = self.config.hidden_dim;
        let mut optimizer = Adam::new(self.params.len(), self.config.learning_rate);
        let mut initial_loss = None;
        let mut last_loss = 0.0;

        for epoch in 0..self.config.epochs {
            let mask = self.sample_dropout_mask(n * hidden);
            let pass = self.forward(features.values(), adjacency, mask);
            let (loss, grads) = self.backward(features.values(), adjacency, &pass, targets);

            if !loss.is_finite() {
                return Err(ModelError::NonFinite { stage: "loss", epoch });
            }
            if has_invalid_values(&grads) {
                return Err(ModelError::NonFinite { stage: "gradient", epoch });
            }

            optimizer.step(&mut self.params, &grads);
            if has_invalid_values(&self.params) {
                return Err(ModelError::NonFinite { stage: "parameters", epoch });
            }

            if epoch % LOSS_LOG_INTERVAL == 0 {
                tracing::debug!(epoch, loss, "gcn training");
            }
            initial_loss.get_or_insert(loss);
            last_loss = loss;
        }

        // Zero-epoch fits still report the loss of the untouched network
        let initial_loss = match initial_loss {
            Some(loss) => loss,
            None => {
                last_loss = self.loss(features, adjacency, targets)?;
                last_loss
            }
        };

        self.fitted = true;
        Ok(FitReport {
            epochs: self.config.epochs,
            initial_loss,
            final_loss: last_loss,
        })
    }

    /// Mean squared error of the deterministic (dropout-free) forward pass.
    pub fn loss(
        &self,
        features: &FeatureMatrix,
        adjacency: &NormalizedAdjacency,
        targets: &[f64],
    ) -> Result<f64, ModelError> {
        let raw = self.predict(features, adjacency)?;
        if targets.len() != raw.len() {
            return Err(ModelError::ShapeMismatch {
                expected: raw.len(),
                actual: targets.len(),
            });
        }
        Ok(mean_squared_error(&raw, targets))
    }

    // ==================== Inference ====================

    /// Raw network output per node, dropout disabled.
    pub fn predict(
        &self,
        features: &FeatureMatrix,
        adjacency: &NormalizedAdjacency,
    ) -> Result<Vec<f64>, ModelError> {
        self.check_inputs(features, adjacency)?;
        let pass = self.forward(features.values(), adjacency, None);
        if has_invalid_values(&pass.output) {
            return Err(ModelError::NonFinite {
                stage: "inference",
                epoch: self.config.epochs,
            });
        }
        Ok(pass.output)
    }

    /// Priority scores in `(0, 1)`; higher means more in need of study.
    pub fn scores(
        &self,
        features: &FeatureMatrix,
        adjacency: &NormalizedAdjacency,
    ) -> Result<Vec<f64>, ModelError> {
        Ok(self
            .predict(features, adjacency)?
            .into_iter()
            .map(sigmoid)
            .collect())
    }

    pub fn diagnose(&self) -> DiagnosticResult {
        diagnose_parameters(&[&self.params])
    }

    // ==================== Internals ====================

    fn check_inputs(
        &self,
        features: &FeatureMatrix,
        adjacency: &NormalizedAdjacency,
    ) -> Result<(), ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyGraph);
        }
        if features.cols() != self.input_dim {
            return Err(ModelError::ShapeMismatch {
                expected: features.rows() * self.input_dim,
                actual: features.values().len(),
            });
        }
        if adjacency.node_count() != features.rows() {
            return Err(ModelError::ShapeMismatch {
                expected: features.rows(),
                actual: adjacency.node_count(),
            });
        }
        if has_invalid_values(features.values()) {
            return Err(ModelError::NonFinite {
                stage: "features",
                epoch: 0,
            });
        }
        Ok(())
    }

    fn sample_dropout_mask(&mut self, len: usize) -> Option<Vec<f64>> {
        let p = self.config.dropout;
        if p <= 0.0 {
            return None;
        }
        let keep_scale = 1.0 / (1.0 - p);
        Some(
            (0..len)
                .map(|_| if self.rng.gen::<f64>() < p { 0.0 } else { keep_scale })
                .collect(),
        )
    }

    fn forward(&self, x: &[f64], adjacency: &NormalizedAdjacency, mask: Option<Vec<f64>>) -> ForwardPass {
        let n = adjacency.node_count();
        let hidden = self.config.hidden_dim;

        let xw = mat_mul(x, self.w1(), n, self.input_dim, hidden);
        let mut hidden_pre = adjacency.propagate(&xw, hidden);
        add_row_bias(&mut hidden_pre, self.b1());

        let mut activations: Vec<f64> = hidden_pre.iter().map(|&v| v.max(0.0)).collect();
        if let Some(mask) = &mask {
            for (a, &m) in activations.iter_mut().zip(mask) {
                *a *= m;
            }
        }

        let hw = mat_mul(&activations, self.w2(), n, hidden, 1);
        let mut output = adjacency.propagate(&hw, 1);
        let b2 = self.b2();
        for o in &mut output {
            *o += b2;
        }

        ForwardPass {
            hidden_pre,
            hidden: activations,
            mask,
            output,
        }
    }

    /// Returns the loss and the flat gradient in parameter layout.
    fn backward(
        &self,
        x: &[f64],
        adjacency: &NormalizedAdjacency,
        pass: &ForwardPass,
        targets: &[f64],
    ) -> (f64, Vec<f64>) {
        let n = adjacency.node_count();
        let hidden = self.config.hidden_dim;
        let scale = 2.0 / n as f64;

        let loss = mean_squared_error(&pass.output, targets);
        let d_out: Vec<f64> = pass
            .output
            .iter()
            .zip(targets)
            .map(|(o, t)| scale * (o - t))
            .collect();

        // Layer 2
        let d_b2: f64 = d_out.iter().sum();
        let d_hw = adjacency.propagate(&d_out, 1);
        let d_w2 = mat_mul_transpose_a(&pass.hidden, &d_hw, n, hidden, 1);
        let mut d_hidden = mat_mul_transpose_b(&d_hw, self.w2(), n, 1, hidden);

        // Dropout and relu
        if let Some(mask) = &pass.mask {
            for (d, &m) in d_hidden.iter_mut().zip(mask) {
                *d *= m;
            }
        }
        for (d, &pre) in d_hidden.iter_mut().zip(&pass.hidden_pre) {
            if pre <= 0.0 {
                *d = 0.0;
            }
        }

        // Layer 1
        let d_b1 = column_sums(&d_hidden, hidden);
        let d_xw = adjacency.propagate(&d_hidden, hidden);
        let d_w1 = mat_mul_transpose_a(x, &d_xw, n, self.input_dim, hidden);

        let mut grads = Vec::with_capacity(self.params.len());
        grads.extend_from_slice(&d_w1);
        grads.extend_from_slice(&d_b1);
        grads.extend_from_slice(&d_w2);
        grads.push(d_b2);
        (loss, grads)
    }
}

fn glorot_uniform(weights: &mut [f64], fan_in: usize, fan_out: usize, rng: &mut ChaCha8Rng) {
    let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
    for w in weights.iter_mut() {
        *w = rng.gen_range(-bound..bound);
    }
}

fn mean_squared_error(output: &[f64], targets: &[f64]) -> f64 {
    if output.is_empty() {
        return 0.0;
    }
    output
        .iter()
        .zip(targets)
        .map(|(o, t)| (o - t) * (o - t))
        .sum::<f64>()
        / output.len() as f64
}
