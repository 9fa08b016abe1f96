//! Layer abstractions for neural networks
//!
//! This module provides the Layer trait and the layer types used by the
//! SIGNS network.

mod r#trait;
pub mod conv2d;
pub mod dense;
pub mod maxpool;
pub mod relu;

// Re-export the Layer trait for convenience
pub use conv2d::Conv2DLayer;
pub use dense::DenseLayer;
pub use maxpool::MaxPool2DLayer;
pub use r#trait::Layer;
pub use relu::ReluLayer;

use crate::optimizers::Optimizer;

/// Hand each gradient buffer to its optimizer, then zero the buffer.
pub(crate) fn step_tensors<const N: usize>(
    tensors: [(&mut [f32], &mut [f32]); N],
    optimizers: &mut [Box<dyn Optimizer>],
) {
    assert_eq!(N, optimizers.len(), "one optimizer per parameter tensor");
    for ((params, grads), optimizer) in tensors.into_iter().zip(optimizers.iter_mut()) {
        optimizer.update(params, grads);
        grads.fill(0.0);
    }
}
