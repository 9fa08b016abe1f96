//! Input shape declaration and SAME padding arithmetic
//!
//! The batch dimension is never fixed up front: every layer takes the batch
//! size as an argument, so a shape only records the per-example dimensions.

use std::fmt;

/// Per-example shape of an NHWC image batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl InputShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of values in one example (height × width × channels).
    pub fn volume(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(?, {}, {}, {})", self.height, self.width, self.channels)
    }
}

/// Declare the input and label shapes for a batch of unknown size.
///
/// Returns the image shape `(?, n_h0, n_w0, n_c0)` and the label width `n_y`.
///
/// # Example
///
/// ```
/// use signs_cnn::shapes::create_placeholders;
///
/// let (x, n_y) = create_placeholders(64, 64, 3, 6);
/// assert_eq!(x.to_string(), "(?, 64, 64, 3)");
/// assert_eq!(n_y, 6);
/// ```
pub fn create_placeholders(
    n_h0: usize,
    n_w0: usize,
    n_c0: usize,
    n_y: usize,
) -> (InputShape, usize) {
    (InputShape::new(n_h0, n_w0, n_c0), n_y)
}

/// SAME padding for one spatial dimension.
///
/// Returns `(output, pad_before, pad_after)` where
/// `output = ceil(input / stride)` and the padding needed to cover the last
/// window is split with the smaller half first.
///
/// # Example
///
/// ```
/// use signs_cnn::shapes::same_padding;
///
/// // 4x4 kernel, stride 1: three padded rows, one above and two below.
/// assert_eq!(same_padding(64, 4, 1), (64, 1, 2));
/// // 8x8 window, stride 8: divides evenly, no padding.
/// assert_eq!(same_padding(64, 8, 8), (8, 0, 0));
/// ```
pub fn same_padding(input: usize, kernel: usize, stride: usize) -> (usize, usize, usize) {
    assert!(stride > 0, "stride must be positive");
    let output = input.div_ceil(stride);
    let needed = (output.saturating_sub(1)) * stride + kernel;
    let pad_total = needed.saturating_sub(input);
    let pad_before = pad_total / 2;
    (output, pad_before, pad_total - pad_before)
}
