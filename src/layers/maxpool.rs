//! 2D max pooling over NHWC feature maps with SAME padding.

use crate::layers::Layer;
use crate::optimizers::Optimizer;
use crate::shapes::same_padding;

/// Max pooling with a square window.
///
/// Each output value is the maximum of its window; window positions falling in
/// the SAME padding are skipped. The backward pass routes each output gradient
/// to the arg-max of its window (the first maximum in row-major order), found
/// again from the forward input so the layer carries no per-batch state.
///
/// # Example
///
/// ```
/// use signs_cnn::layers::{Layer, MaxPool2DLayer};
///
/// let pool = MaxPool2DLayer::new(8, 8, 64, 64, 8);
/// assert_eq!(pool.output_height(), 8);
/// assert_eq!(pool.output_size(), 8 * 8 * 8);
/// ```
pub struct MaxPool2DLayer {
    window: usize,
    stride: usize,
    channels: usize,
    input_height: usize,
    input_width: usize,
    output_height: usize,
    output_width: usize,
    pad_top: usize,
    pad_left: usize,
}

impl MaxPool2DLayer {
    pub fn new(
        window: usize,
        stride: usize,
        input_height: usize,
        input_width: usize,
        channels: usize,
    ) -> Self {
        let (output_height, pad_top, _) = same_padding(input_height, window, stride);
        let (output_width, pad_left, _) = same_padding(input_width, window, stride);
        Self {
            window,
            stride,
            channels,
            input_height,
            input_width,
            output_height,
            output_width,
            pad_top,
            pad_left,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn output_height(&self) -> usize {
        self.output_height
    }

    pub fn output_width(&self) -> usize {
        self.output_width
    }

    /// Clamp the window starting at `out * stride - pad` to `[0, limit)`.
    fn span(&self, out: usize, pad: usize, limit: usize) -> (usize, usize) {
        let start = out * self.stride;
        let lo = start.saturating_sub(pad);
        let hi = (start + self.window).saturating_sub(pad).min(limit);
        (lo, hi)
    }

    /// Input offset (within one sample) of the window maximum for one output cell.
    fn argmax(&self, sample: &[f32], oy: usize, ox: usize, c: usize) -> usize {
        let (y0, y1) = self.span(oy, self.pad_top, self.input_height);
        let (x0, x1) = self.span(ox, self.pad_left, self.input_width);

        let mut best = f32::NEG_INFINITY;
        let mut best_idx = (y0 * self.input_width + x0) * self.channels + c;
        for iy in y0..y1 {
            for ix in x0..x1 {
                let idx = (iy * self.input_width + ix) * self.channels + c;
                // Track argmax to route gradients during backprop.
                if sample[idx] > best {
                    best = sample[idx];
                    best_idx = idx;
                }
            }
        }
        best_idx
    }
}

impl Layer for MaxPool2DLayer {
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        let in_volume = self.input_size();
        let out_volume = self.output_size();
        assert_eq!(input.len(), batch_size * in_volume, "pool input length mismatch");
        assert_eq!(output.len(), batch_size * out_volume, "pool output length mismatch");

        for (sample, out_sample) in input
            .chunks_exact(in_volume)
            .zip(output.chunks_exact_mut(out_volume))
        {
            for oy in 0..self.output_height {
                for ox in 0..self.output_width {
                    for c in 0..self.channels {
                        let out_i = (oy * self.output_width + ox) * self.channels + c;
                        out_sample[out_i] = sample[self.argmax(sample, oy, ox, c)];
                    }
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
        let in_volume = self.input_size();
        let out_volume = self.output_size();
        assert_eq!(input.len(), batch_size * in_volume, "pool input length mismatch");
        assert_eq!(grad_output.len(), batch_size * out_volume, "pool grad_output length mismatch");
        assert_eq!(grad_input.len(), batch_size * in_volume, "pool grad_input length mismatch");

        // Zero grad_input so we can scatter-add into it.
        grad_input.fill(0.0);

        for ((sample, g_sample), gi_sample) in input
            .chunks_exact(in_volume)
            .zip(grad_output.chunks_exact(out_volume))
            .zip(grad_input.chunks_exact_mut(in_volume))
        {
            for oy in 0..self.output_height {
                for ox in 0..self.output_width {
                    for c in 0..self.channels {
                        let out_i = (oy * self.output_width + ox) * self.channels + c;
                        gi_sample[self.argmax(sample, oy, ox, c)] += g_sample[out_i];
                    }
                }
            }
        }
    }

    fn apply_gradients(&mut self, _optimizers: &mut [Box<dyn Optimizer>]) {}

    fn input_size(&self) -> usize {
        self.input_height * self.input_width * self.channels
    }

    fn output_size(&self) -> usize {
        self.output_height * self.output_width * self.channels
    }
}
