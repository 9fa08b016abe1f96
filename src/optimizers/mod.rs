//! Optimizer abstractions for neural network parameter updates
//!
//! Optimizers define how to use gradients to update model parameters. The basic
//! gradient descent update is `weight = weight - learning_rate * gradient`; Adam
//! adds momentum and per-parameter adaptive step sizes.
//!
//! Stateful optimizers keep one moment buffer per parameter, so the network
//! owns one optimizer instance per parameter tensor (see [`OptimizerKind::build`]).
//!
//! # Example
//!
//! ```
//! use signs_cnn::optimizers::{Optimizer, OptimizerKind};
//!
//! let mut optimizer = OptimizerKind::Adam.build(0.009);
//! let mut weights = vec![0.5f32, -0.5];
//! optimizer.update(&mut weights, &[1.0, -1.0]);
//! assert!(weights[0] < 0.5 && weights[1] > -0.5);
//! ```

pub mod adam;
pub mod sgd;

pub use adam::Adam;
pub use sgd::SGD;

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Core trait for neural network optimizers.
///
/// # State Management
///
/// Some optimizers (like Adam) maintain internal state across updates
/// (moment estimates, a time step counter). Callers only provide
/// parameters and gradients; an instance must always be fed the same tensor.
pub trait Optimizer {
    /// Update parameters in place using gradients.
    ///
    /// # Panics
    ///
    /// Implementations panic if parameters and gradients have different lengths.
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]);

    /// Get the learning rate for this optimizer.
    fn learning_rate(&self) -> f32;
}

/// Which update rule to train with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

impl OptimizerKind {
    /// Create a fresh optimizer with this kind's default hyperparameters.
    pub fn build(self, learning_rate: f32) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Adam => Box::new(Adam::with_learning_rate(learning_rate)),
            OptimizerKind::Sgd => Box::new(SGD::new(learning_rate)),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerKind::Adam => write!(f, "adam"),
            OptimizerKind::Sgd => write!(f, "sgd"),
        }
    }
}

impl FromStr for OptimizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adam" => Ok(OptimizerKind::Adam),
            "sgd" => Ok(OptimizerKind::Sgd),
            other => Err(format!("unknown optimizer '{}' (expected adam or sgd)", other)),
        }
    }
}
