//! Configuration structures for training
//!
//! Hyperparameters are read from a JSON file; every field is optional and
//! falls back to the defaults the SIGNS network is tuned for.

use crate::error::{Result, SignsError};
use crate::optimizers::OptimizerKind;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Training hyperparameters.
///
/// # Example
///
/// ```json
/// {
///   "learning_rate": 0.009,
///   "num_epochs": 100,
///   "minibatch_size": 64,
///   "print_cost": true,
///   "print_every": 5,
///   "seed": 3,
///   "init_seed": 0,
///   "optimizer": "adam"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Step size handed to the optimizer
    pub learning_rate: f32,

    /// Passes over the training set
    pub num_epochs: usize,

    /// Examples per optimizer step
    pub minibatch_size: usize,

    /// Log the epoch cost and record it in the cost history
    pub print_cost: bool,

    /// Log the cost every this many epochs
    pub print_every: usize,

    /// Base seed for mini-batch shuffling; epoch `e` shuffles with `seed + e + 1`
    pub seed: u64,

    /// Seed for parameter initialization
    pub init_seed: u64,

    pub optimizer: OptimizerKind,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.009,
            num_epochs: 100,
            minibatch_size: 64,
            print_cost: true,
            print_every: 5,
            seed: 3,
            init_seed: 0,
            optimizer: OptimizerKind::Adam,
        }
    }
}

impl TrainingConfig {
    /// Check that the hyperparameters describe a runnable training loop.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(SignsError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.num_epochs == 0 {
            return Err(SignsError::InvalidConfig(
                "num_epochs must be at least 1".into(),
            ));
        }
        if self.minibatch_size == 0 {
            return Err(SignsError::InvalidConfig(
                "minibatch_size must be at least 1".into(),
            ));
        }
        if self.print_every == 0 {
            return Err(SignsError::InvalidConfig(
                "print_every must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate a JSON training configuration.
pub fn parse_config(contents: &str) -> Result<TrainingConfig> {
    let config: TrainingConfig = serde_json::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Loads a training configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use signs_cnn::config::load_config;
///
/// let cfg = load_config("config/signs_cnn.json").unwrap();
/// assert_eq!(cfg.minibatch_size, 64);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TrainingConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| SignsError::io(path, e))?;
    parse_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_signs_training() {
        let config = TrainingConfig::default();
        assert_eq!(config.learning_rate, 0.009);
        assert_eq!(config.num_epochs, 100);
        assert_eq!(config.minibatch_size, 64);
        assert_eq!(config.seed, 3);
        assert_eq!(config.optimizer, OptimizerKind::Adam);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = parse_config(r#"{ "num_epochs": 3, "optimizer": "sgd" }"#).unwrap();
        assert_eq!(config.num_epochs, 3);
        assert_eq!(config.optimizer, OptimizerKind::Sgd);
        assert_eq!(config.minibatch_size, 64);
    }

    #[test]
    fn test_rejects_zero_batch() {
        let err = parse_config(r#"{ "minibatch_size": 0 }"#).unwrap_err();
        assert!(matches!(err, SignsError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = parse_config(r#"{ "epochs": 3 }"#).unwrap_err();
        assert!(matches!(err, SignsError::Json(_)));
    }
}
