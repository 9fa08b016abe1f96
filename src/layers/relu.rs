//! Element-wise ReLU as a layer.

use crate::layers::Layer;
use crate::optimizers::Optimizer;

/// ReLU activation over a fixed number of values per sample.
pub struct ReluLayer {
    size: usize,
}

impl ReluLayer {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl Layer for ReluLayer {
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        assert_eq!(input.len(), batch_size * self.size, "relu input length mismatch");
        assert_eq!(output.len(), input.len(), "relu output length mismatch");
        for (out, &x) in output.iter_mut().zip(input) {
            *out = x.max(0.0);
        }
    }

    fn backward(
        &self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    ) {
        assert_eq!(input.len(), batch_size * self.size, "relu input length mismatch");
        assert_eq!(grad_output.len(), input.len(), "relu grad_output length mismatch");
        assert_eq!(grad_input.len(), input.len(), "relu grad_input length mismatch");
        // ReLU backward: zero gradients where activation was <= 0.
        for ((gi, &g), &x) in grad_input.iter_mut().zip(grad_output).zip(input) {
            *gi = if x > 0.0 { g } else { 0.0 };
        }
    }

    fn apply_gradients(&mut self, _optimizers: &mut [Box<dyn Optimizer>]) {}

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }
}
