//! 2D Convolutional layer implementation
//!
//! This module provides a Conv2DLayer that performs 2D convolution over NHWC
//! feature maps with SAME padding, and the `FilterBank` holding its filters.

use crate::layers::{step_tensors, Layer};
use crate::optimizers::Optimizer;
use crate::shapes::same_padding;
use crate::utils::SimpleRng;
use std::cell::RefCell;

/// A group of square convolution filters stored HWIO:
/// `values[((ky * kernel_size + kx) * in_channels + ic) * out_channels + oc]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    pub kernel_size: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    pub values: Vec<f32>,
}

impl FilterBank {
    /// Create filters with Xavier/Glorot uniform initialization.
    ///
    /// Values are sampled from `[-limit, limit]` with
    /// `limit = sqrt(6 / (fan_in + fan_out))`,
    /// `fan_in = kernel_size² × in_channels` and `fan_out = kernel_size² × out_channels`.
    ///
    /// # Example
    ///
    /// ```
    /// use signs_cnn::layers::conv2d::FilterBank;
    /// use signs_cnn::utils::SimpleRng;
    ///
    /// let mut rng = SimpleRng::new(0);
    /// let w1 = FilterBank::xavier(4, 3, 8, &mut rng);
    /// assert_eq!(w1.shape(), [4, 4, 3, 8]);
    /// ```
    pub fn xavier(
        kernel_size: usize,
        in_channels: usize,
        out_channels: usize,
        rng: &mut SimpleRng,
    ) -> Self {
        let receptive = (kernel_size * kernel_size) as f32;
        let fan_in = receptive * in_channels as f32;
        let fan_out = receptive * out_channels as f32;
        let limit = (6.0f32 / (fan_in + fan_out)).sqrt();

        let count = kernel_size * kernel_size * in_channels * out_channels;
        let values = (0..count)
            .map(|_| rng.gen_range_f32(-limit, limit))
            .collect();

        Self {
            kernel_size,
            in_channels,
            out_channels,
            values,
        }
    }

    /// Filter dimensions as `[height, width, in_channels, out_channels]`.
    pub fn shape(&self) -> [usize; 4] {
        [
            self.kernel_size,
            self.kernel_size,
            self.in_channels,
            self.out_channels,
        ]
    }

    fn index(&self, ky: usize, kx: usize, ic: usize, oc: usize) -> usize {
        ((ky * self.kernel_size + kx) * self.in_channels + ic) * self.out_channels + oc
    }

    /// Value of one filter tap.
    pub fn at(&self, ky: usize, kx: usize, ic: usize, oc: usize) -> f32 {
        self.values[self.index(ky, kx, ic, oc)]
    }

    /// The `out_channels` values at one `(ky, kx, ic)` position.
    pub fn taps(&self, ky: usize, kx: usize, ic: usize) -> &[f32] {
        let start = self.index(ky, kx, ic, 0);
        &self.values[start..start + self.out_channels]
    }
}

/// 2D Convolutional layer with learnable filters.
///
/// Slides `FilterBank` filters over an NHWC input with SAME padding: the output
/// has `ceil(input / stride)` rows and columns, and taps falling outside the
/// input read as zero. The layer has no bias.
///
/// # Example
///
/// ```
/// use signs_cnn::layers::{Conv2DLayer, Layer};
/// use signs_cnn::layers::conv2d::FilterBank;
/// use signs_cnn::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = Conv2DLayer::new(FilterBank::xavier(4, 3, 8, &mut rng), 1, 64, 64);
/// assert_eq!(layer.output_height(), 64);
/// assert_eq!(layer.output_size(), 64 * 64 * 8);
/// ```
pub struct Conv2DLayer {
    filters: FilterBank,
    stride: usize,
    input_height: usize,
    input_width: usize,
    output_height: usize,
    output_width: usize,
    pad_top: usize,
    pad_left: usize,
    grad_weights: RefCell<Vec<f32>>,
}

impl Conv2DLayer {
    /// Create a bias-free convolution over an `input_height × input_width` map.
    pub fn new(filters: FilterBank, stride: usize, input_height: usize, input_width: usize) -> Self {
        let (output_height, pad_top, _) = same_padding(input_height, filters.kernel_size, stride);
        let (output_width, pad_left, _) = same_padding(input_width, filters.kernel_size, stride);
        let weight_count = filters.values.len();

        Self {
            filters,
            stride,
            input_height,
            input_width,
            output_height,
            output_width,
            pad_top,
            pad_left,
            grad_weights: RefCell::new(vec![0.0f32; weight_count]),
        }
    }

    pub fn filters(&self) -> &FilterBank {
        &self.filters
    }

    pub fn in_channels(&self) -> usize {
        self.filters.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.filters.out_channels
    }

    pub fn kernel_size(&self) -> usize {
        self.filters.kernel_size
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

    pub fn weights(&self) -> &[f32] {
        &self.filters.values
    }

    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.filters.values
    }

    /// Snapshot of the accumulated weight gradients.
    pub fn weight_gradients(&self) -> Vec<f32> {
        self.grad_weights.borrow().clone()
    }

    /// Input row/column for an output position and kernel offset, if inside the map.
    #[inline]
    fn source(&self, out: usize, k: usize, pad: usize, limit: usize) -> Option<usize> {
        (out * self.stride + k)
            .checked_sub(pad)
            .filter(|&pos| pos < limit)
    }
}

impl Layer for Conv2DLayer {
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        let in_volume = self.input_size();
        let out_volume = self.output_size();
        assert_eq!(input.len(), batch_size * in_volume, "conv input length mismatch");
        assert_eq!(output.len(), batch_size * out_volume, "conv output length mismatch");

        let k = self.filters.kernel_size;
        let in_c = self.filters.in_channels;
        let out_c = self.filters.out_channels;

        for (sample, out_sample) in input
            .chunks_exact(in_volume)
            .zip(output.chunks_exact_mut(out_volume))
        {
            for oy in 0..self.output_height {
                for ox in 0..self.output_width {
                    let px = (oy * self.output_width + ox) * out_c;
                    let out_px = &mut out_sample[px..px + out_c];
                    out_px.fill(0.0);

                    for ky in 0..k {
                        let Some(iy) = self.source(oy, ky, self.pad_top, self.input_height) else {
                            continue;
                        };
                        for kx in 0..k {
                            let Some(ix) = self.source(ox, kx, self.pad_left, self.input_width)
                            else {
                                continue;
                            };
                            let in_px = (iy * self.input_width + ix) * in_c;
                            for (ic, &x) in sample[in_px..in_px + in_c].iter().enumerate() {
                                for (o, &w) in out_px.iter_mut().zip(self.filters.taps(ky, kx, ic)) {
                                    *o += x * w;
                                }
                            }
                        }
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
        assert_eq!(input.len(), batch_size * in_volume, "conv input length mismatch");
        assert_eq!(grad_output.len(), batch_size * out_volume, "conv grad_output length mismatch");
        assert_eq!(grad_input.len(), batch_size * in_volume, "conv grad_input length mismatch");

        let k = self.filters.kernel_size;
        let in_c = self.filters.in_channels;
        let out_c = self.filters.out_channels;

        let mut grad_w = self.grad_weights.borrow_mut();

        // Zero grad_input first as we accumulate into it
        grad_input.fill(0.0);

        for ((sample, g_sample), gi_sample) in input
            .chunks_exact(in_volume)
            .zip(grad_output.chunks_exact(out_volume))
            .zip(grad_input.chunks_exact_mut(in_volume))
        {
            for oy in 0..self.output_height {
                for ox in 0..self.output_width {
                    let px = (oy * self.output_width + ox) * out_c;
                    let g_px = &g_sample[px..px + out_c];

                    for ky in 0..k {
                        let Some(iy) = self.source(oy, ky, self.pad_top, self.input_height) else {
                            continue;
                        };
                        for kx in 0..k {
                            let Some(ix) = self.source(ox, kx, self.pad_left, self.input_width)
                            else {
                                continue;
                            };
                            let in_px = (iy * self.input_width + ix) * in_c;
                            for ic in 0..in_c {
                                let x = sample[in_px + ic];
                                let w_start = self.filters.index(ky, kx, ic, 0);
                                let taps = &self.filters.values[w_start..w_start + out_c];
                                let grad_taps = &mut grad_w[w_start..w_start + out_c];

                                let mut back = 0.0f32;
                                for ((gw, &w), &g) in grad_taps.iter_mut().zip(taps).zip(g_px) {
                                    *gw += x * g;
                                    back += w * g;
                                }
                                gi_sample[in_px + ic] += back;
                            }
                        }
                    }
                }
            }
        }
    }

    fn apply_gradients(&mut self, optimizers: &mut [Box<dyn Optimizer>]) {
        step_tensors(
            [(
                &mut self.filters.values[..],
                &mut self.grad_weights.get_mut()[..],
            )],
            optimizers,
        );
    }

    fn input_size(&self) -> usize {
        self.input_height * self.input_width * self.filters.in_channels
    }

    fn output_size(&self) -> usize {
        self.output_height * self.output_width * self.filters.out_channels
    }

    fn parameter_tensors(&self) -> usize {
        1
    }

    fn parameter_count(&self) -> usize {
        self.filters.values.len()
    }
}
