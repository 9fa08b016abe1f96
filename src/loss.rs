//! Softmax cross-entropy cost.
//!
//! The network's last layer emits raw logits; softmax and cross-entropy are
//! computed together here, which keeps the log numerically stable
//! (log-sum-exp) and gives the simple `softmax - labels` gradient.

/// Softmax activation applied row-wise, in place.
///
/// Uses the max-subtraction trick to avoid overflow with large logits.
///
/// # Arguments
/// * `outputs` - Flat array containing row-major matrix data
/// * `rows` - Number of rows in the matrix
/// * `cols` - Number of columns in the matrix
pub fn softmax_rows(outputs: &mut [f32], rows: usize, cols: usize) {
    if cols == 0 {
        return;
    }
    assert_eq!(outputs.len(), rows * cols, "outputs length mismatch in softmax_rows");

    for row in outputs.chunks_exact_mut(cols) {
        let max_value = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let mut sum = 0.0f32;
        for value in row.iter_mut() {
            *value = (*value - max_value).exp();
            sum += *value;
        }

        let inv_sum = 1.0f32 / sum;
        for value in row.iter_mut() {
            *value *= inv_sum;
        }
    }
}

/// `log(sum(exp(row)))` computed without overflow.
fn log_sum_exp(row: &[f32]) -> f32 {
    let max_value = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let sum: f32 = row.iter().map(|&z| (z - max_value).exp()).sum();
    max_value + sum.ln()
}

/// Mean softmax cross-entropy over a batch.
///
/// For each row: `-Σ_j y_j * log_softmax(z)_j`. Label rows are usually one-hot
/// but any non-negative weights are accepted.
///
/// # Example
///
/// ```
/// use signs_cnn::loss::compute_cost;
///
/// // Uniform logits over 4 classes cost ln(4) whatever the label.
/// let cost = compute_cost(&[0.0; 4], &[0.0, 1.0, 0.0, 0.0], 1, 4);
/// assert!((cost - 4f32.ln()).abs() < 1e-6);
/// ```
pub fn compute_cost(logits: &[f32], labels: &[f32], batch_size: usize, n_classes: usize) -> f32 {
    assert_eq!(logits.len(), batch_size * n_classes, "logits length mismatch");
    assert_eq!(labels.len(), logits.len(), "labels length mismatch");
    if batch_size == 0 {
        return 0.0;
    }

    let total: f32 = logits
        .chunks_exact(n_classes)
        .zip(labels.chunks_exact(n_classes))
        .map(|(z, y)| {
            let lse = log_sum_exp(z);
            z.iter().zip(y).map(|(&zj, &yj)| yj * (lse - zj)).sum::<f32>()
        })
        .sum();
    total / batch_size as f32
}

/// Mean softmax cross-entropy and its gradient with respect to the logits.
///
/// Writes `delta = (softmax(z) * Σy - y) / batch_size`, which reduces to the
/// familiar `(p - y) / batch_size` for one-hot labels, and returns the cost.
pub fn softmax_cross_entropy_backward(
    logits: &[f32],
    labels: &[f32],
    batch_size: usize,
    n_classes: usize,
    delta: &mut [f32],
) -> f32 {
    assert_eq!(delta.len(), logits.len(), "delta length mismatch");
    let cost = compute_cost(logits, labels, batch_size, n_classes);
    if batch_size == 0 {
        return cost;
    }

    delta.copy_from_slice(logits);
    softmax_rows(delta, batch_size, n_classes);

    let scale = 1.0 / batch_size as f32;
    for (d_row, y) in delta
        .chunks_exact_mut(n_classes)
        .zip(labels.chunks_exact(n_classes))
    {
        let mass: f32 = y.iter().sum();
        for (d, &yj) in d_row.iter_mut().zip(y) {
            *d = (*d * mass - yj) * scale;
        }
    }
    cost
}

/// Index of the largest value in each row (first one on ties).
pub fn argmax_rows(values: &[f32], n_classes: usize) -> Vec<usize> {
    values
        .chunks_exact(n_classes)
        .map(|row| {
            let mut best = 0;
            for (j, &v) in row.iter().enumerate().skip(1) {
                if v > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}
