//! SIGNS ConvNet library
//!
//! Building blocks for a small convolutional classifier over the SIGNS
//! hand-sign dataset (64x64 RGB images, 6 classes) and the loop that trains it.
//!
//! # Modules
//!
//! - `shapes`: Input shape declaration and SAME padding arithmetic
//! - `layers`: Layer trait and implementations (Conv2D, MaxPool2D, ReLU, Dense)
//! - `optimizers`: Optimizer trait and implementations (Adam, SGD)
//! - `loss`: Softmax cross-entropy cost and its gradient
//! - `model`: The fixed CONV -> POOL -> CONV -> POOL -> DENSE network
//! - `dataset`: IDX dataset loading, one-hot encoding, mini-batches
//! - `config`: Training configuration structures
//! - `train`: Training loop and accuracy evaluation
//! - `plot`: Sample image and cost curve output
//! - `utils`: Shared utilities (RNG)

pub mod config;
pub mod dataset;
pub mod error;
pub mod layers;
pub mod loss;
pub mod model;
pub mod optimizers;
pub mod plot;
pub mod shapes;
pub mod train;
pub mod utils;

pub use error::{Result, SignsError};
