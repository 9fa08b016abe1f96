//! The `Layer` trait shared by every stage of the SIGNS network.

use crate::optimizers::Optimizer;

/// One stage of the network operating on flat `f32` batches.
///
/// Feature maps are NHWC, so a layer sees `batch_size` consecutive blocks of
/// [`Layer::input_size`] values and writes blocks of [`Layer::output_size`].
/// Forward and backward take `&self`: parameter gradients are summed into
/// interior accumulators and only [`Layer::apply_gradients`] needs `&mut`.
///
/// ```ignore
/// let mut z = vec![0.0f32; batch * layer.output_size()];
/// layer.forward(&x, &mut z, batch);
///
/// let mut dx = vec![0.0f32; batch * layer.input_size()];
/// layer.backward(&x, &dz, &mut dx, batch);
/// ```
pub trait Layer {
    /// Compute the layer output for a whole batch.
    ///
    /// # Panics
    ///
    /// If `input` or `output` is not `batch_size` blocks long.
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize);

    /// Propagate `grad_output` back to `grad_input`, adding parameter
    /// gradients to the layer's accumulators.
    ///
    /// `input` is the buffer the matching forward pass consumed. The loss
    /// gradient already carries the `1 / batch_size` factor, so layers sum
    /// over the batch without rescaling.
    fn backward(
        &self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    );

    /// Step every parameter tensor with its optimizer, then zero the gradients.
    ///
    /// Takes exactly [`Layer::parameter_tensors`] optimizers, weights before biases.
    fn apply_gradients(&mut self, optimizers: &mut [Box<dyn Optimizer>]);

    /// Values per example entering the layer.
    fn input_size(&self) -> usize;

    /// Values per example leaving the layer.
    fn output_size(&self) -> usize;

    /// How many tensors the layer hands to optimizers.
    fn parameter_tensors(&self) -> usize {
        0
    }

    /// Trainable scalars across all tensors.
    fn parameter_count(&self) -> usize {
        0
    }
}
