//! Shuffled mini-batches.

use crate::utils::SimpleRng;

/// A contiguous copy of a subset of examples and their label rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MiniBatch {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub size: usize,
}

// Copy a subset of examples/labels into contiguous batch buffers.
fn gather_batch(
    x: &[f32],
    y: &[f32],
    indices: &[usize],
    sample_len: usize,
    n_classes: usize,
) -> MiniBatch {
    let mut batch_x = Vec::with_capacity(indices.len() * sample_len);
    let mut batch_y = Vec::with_capacity(indices.len() * n_classes);
    for &src in indices {
        batch_x.extend_from_slice(&x[src * sample_len..(src + 1) * sample_len]);
        batch_y.extend_from_slice(&y[src * n_classes..(src + 1) * n_classes]);
    }
    MiniBatch {
        x: batch_x,
        y: batch_y,
        size: indices.len(),
    }
}

/// Split `(x, y)` into shuffled mini-batches.
///
/// The examples are permuted with a generator seeded by `seed`, then cut into
/// `floor(m / batch_size)` full batches followed by one smaller batch holding
/// the remaining `m % batch_size` examples, if any. Every example lands in
/// exactly one batch.
///
/// # Arguments
///
/// * `x` - Examples, `sample_len` values each
/// * `y` - Label rows, `n_classes` values each
///
/// # Example
///
/// ```
/// use signs_cnn::dataset::random_mini_batches;
///
/// let x: Vec<f32> = (0..10).map(|v| v as f32).collect();
/// let y = vec![1.0; 10];
/// let batches = random_mini_batches(&x, &y, 1, 1, 4, 3);
/// let sizes: Vec<usize> = batches.iter().map(|b| b.size).collect();
/// assert_eq!(sizes, vec![4, 4, 2]);
/// ```
pub fn random_mini_batches(
    x: &[f32],
    y: &[f32],
    sample_len: usize,
    n_classes: usize,
    batch_size: usize,
    seed: u64,
) -> Vec<MiniBatch> {
    assert!(batch_size > 0, "mini-batch size must be positive");
    let m = y.len() / n_classes;
    assert_eq!(y.len(), m * n_classes, "label buffer is not a whole number of rows");
    assert_eq!(x.len(), m * sample_len, "example and label counts differ");

    let permutation = SimpleRng::new(seed).permutation(m);
    permutation
        .chunks(batch_size)
        .map(|indices| gather_batch(x, y, indices, sample_len, n_classes))
        .collect()
}
