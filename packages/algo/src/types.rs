//! Common Types and Constants
//!
//! Shared data structures used across all algorithm modules.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Number of per-node input features
pub const FEATURE_DIMENSION: usize = 5;

/// Highest cognitive-complexity (Bloom) level, used as the normalization divisor
pub const MAX_COMPLEXITY_LEVEL: u8 = 5;

/// Default hidden width of the first graph-convolution layer
pub const DEFAULT_HIDDEN_DIM: usize = 16;

/// Default number of optimization steps per fit
pub const DEFAULT_EPOCHS: usize = 200;

/// Hard ceiling on the optimization budget of a single fit
pub const MAX_EPOCHS: usize = 2000;

/// Default Adam learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

/// Largest accepted learning rate; Adam moves each parameter by about this
/// much per step, so anything larger only diverges
pub const MAX_LEARNING_RATE: f64 = 1.0;

/// Default dropout probability (fitting only)
pub const DEFAULT_DROPOUT: f64 = 0.3;

/// Default RNG seed for weight init and dropout masks
pub const DEFAULT_SEED: u64 = 42;

/// Default number of recommendations returned
pub const DEFAULT_MAX_RECOMMENDATIONS: i64 = 5;

/// Score fraction at or above which a lesson counts as mastered
pub const MASTERY_THRESHOLD: f64 = 0.80;

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

// ==================== Feature Layout ====================

/// Column order of the per-node feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureColumn {
    Complexity = 0,
    InDegree = 1,
    OutDegree = 2,
    Struggling = 3,
    Unmastered = 4,
}

impl FeatureColumn {
    pub fn index(self) -> usize {
        self as usize
    }
}

// ==================== Scoring Configuration ====================

/// Hyper-parameters for one GCN fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcnConfig {
    /// Hidden layer width
    pub hidden_dim: usize,
    /// Optimization steps (always run to completion)
    pub epochs: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Dropout probability applied after the first layer while fitting
    pub dropout: f64,
    /// Seed for weight initialization and dropout masks
    pub seed: u64,
}

impl Default for GcnConfig {
    fn default() -> Self {
        Self {
            hidden_dim: DEFAULT_HIDDEN_DIM,
            epochs: DEFAULT_EPOCHS,
            learning_rate: DEFAULT_LEARNING_RATE,
            dropout: DEFAULT_DROPOUT,
            seed: DEFAULT_SEED,
        }
    }
}

impl GcnConfig {
    /// Clamp every field into its usable range.
    pub fn bounded(mut self) -> Self {
        self.hidden_dim = self.hidden_dim.max(1);
        self.epochs = self.epochs.min(MAX_EPOCHS);
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            self.learning_rate = DEFAULT_LEARNING_RATE;
        }
        self.learning_rate = self.learning_rate.min(MAX_LEARNING_RATE);
        if !self.dropout.is_finite() || !(0.0..1.0).contains(&self.dropout) {
            self.dropout = DEFAULT_DROPOUT;
        }
        self
    }
}

// ==================== Fit Diagnostics ====================

/// Summary of a completed fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Steps executed
    pub epochs: usize,
    /// Loss of the first step
    pub initial_loss: f64,
    /// Loss of the last step
    pub final_loss: f64,
}

/// Parameter health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub is_healthy: bool,
    pub has_nan: bool,
    pub has_inf: bool,
    pub max_abs_weight: f64,
    pub message: String,
}
