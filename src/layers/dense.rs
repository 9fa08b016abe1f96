//! Dense (fully connected) layer implementation
//!
//! This module provides a DenseLayer (also known as Linear or Fully Connected layer)
//! that performs the transformation: output = input × weights + biases

use crate::layers::{step_tensors, Layer};
use crate::optimizers::Optimizer;
use crate::utils::SimpleRng;
use std::cell::RefCell;

/// Dense (fully connected) layer with weights and biases.
///
/// Performs the linear transformation: y = xW + b
/// where x is the input (batch_size × input_size),
/// W is the weight matrix (input_size × output_size),
/// and b is the bias vector (output_size).
/// No activation is applied; the SIGNS network feeds these logits straight
/// into the softmax cross-entropy cost.
///
/// # Example
///
/// ```
/// use signs_cnn::layers::{DenseLayer, Layer};
/// use signs_cnn::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = DenseLayer::new(64, 6, &mut rng);
/// assert_eq!(layer.input_size(), 64);
/// assert_eq!(layer.output_size(), 6);
/// ```
pub struct DenseLayer {
    input_size: usize,
    output_size: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
    grad_weights: RefCell<Vec<f32>>,
    grad_biases: RefCell<Vec<f32>>,
}

impl DenseLayer {
    /// Create a new DenseLayer with Xavier initialization.
    ///
    /// Weights are sampled from the uniform distribution [-limit, limit]
    /// where limit = sqrt(6 / (input_size + output_size)).
    /// Biases are initialized to zero.
    pub fn new(input_size: usize, output_size: usize, rng: &mut SimpleRng) -> Self {
        // Xavier initialization: limit = sqrt(6 / (fan_in + fan_out))
        let mut weights = vec![0.0f32; input_size * output_size];
        let limit = (6.0f32 / (input_size + output_size) as f32).sqrt();

        for value in &mut weights {
            *value = rng.gen_range_f32(-limit, limit);
        }

        Self {
            input_size,
            output_size,
            weights,
            biases: vec![0.0f32; output_size],
            grad_weights: RefCell::new(vec![0.0f32; input_size * output_size]),
            grad_biases: RefCell::new(vec![0.0f32; output_size]),
        }
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    /// Snapshot of the accumulated weight gradients.
    pub fn weight_gradients(&self) -> Vec<f32> {
        self.grad_weights.borrow().clone()
    }

    /// Snapshot of the accumulated bias gradients.
    pub fn bias_gradients(&self) -> Vec<f32> {
        self.grad_biases.borrow().clone()
    }
}

impl Layer for DenseLayer {
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        assert_eq!(input.len(), batch_size * self.input_size, "dense input length mismatch");
        assert_eq!(output.len(), batch_size * self.output_size, "dense output length mismatch");

        for (x, out) in input
            .chunks_exact(self.input_size)
            .zip(output.chunks_exact_mut(self.output_size))
        {
            out.copy_from_slice(&self.biases);
            for (&xi, w_row) in x.iter().zip(self.weights.chunks_exact(self.output_size)) {
                for (o, &w) in out.iter_mut().zip(w_row) {
                    *o += xi * w;
                }
            }
        }
    }

    fn backward(
        &self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    ) {
        assert_eq!(input.len(), batch_size * self.input_size, "dense input length mismatch");
        assert_eq!(grad_output.len(), batch_size * self.output_size, "dense grad_output length mismatch");
        assert_eq!(grad_input.len(), batch_size * self.input_size, "dense grad_input length mismatch");

        let mut grad_w = self.grad_weights.borrow_mut();
        let mut grad_b = self.grad_biases.borrow_mut();

        for ((x, g), gi) in input
            .chunks_exact(self.input_size)
            .zip(grad_output.chunks_exact(self.output_size))
            .zip(grad_input.chunks_exact_mut(self.input_size))
        {
            for (gb, &gj) in grad_b.iter_mut().zip(g) {
                *gb += gj;
            }

            for (i, &xi) in x.iter().enumerate() {
                let row = i * self.output_size;
                let w_row = &self.weights[row..row + self.output_size];
                let gw_row = &mut grad_w[row..row + self.output_size];

                let mut back = 0.0f32;
                for ((gw, &w), &gj) in gw_row.iter_mut().zip(w_row).zip(g) {
                    *gw += xi * gj;
                    back += w * gj;
                }
                gi[i] = back;
            }
        }
    }

    fn apply_gradients(&mut self, optimizers: &mut [Box<dyn Optimizer>]) {
        step_tensors(
            [
                (&mut self.weights[..], &mut self.grad_weights.get_mut()[..]),
                (&mut self.biases[..], &mut self.grad_biases.get_mut()[..]),
            ],
            optimizers,
        );
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn parameter_tensors(&self) -> usize {
        2
    }

    /// Returns input_size × output_size (weights) + output_size (biases).
    fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }
}
