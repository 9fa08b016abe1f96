// Numerical gradient checks for the SIGNS ConvNet.
// Analytical gradients from accumulate_gradients are compared with central
// finite differences of the mean softmax cross-entropy.

use signs_cnn::loss::compute_cost;
use signs_cnn::model::SignsCnn;
use signs_cnn::shapes::InputShape;
use signs_cnn::utils::SimpleRng;

const EPSILON: f32 = 1e-3;
const BATCH: usize = 3;
const CLASSES: usize = 6;

// Random inputs in [0, 1) with random one-hot labels.
fn random_batch(shape: InputShape, seed: u64) -> (Vec<f32>, Vec<f32>) {
    let mut rng = SimpleRng::new(seed);
    let x: Vec<f32> = (0..BATCH * shape.volume()).map(|_| rng.next_f32()).collect();
    let mut y = vec![0.0f32; BATCH * CLASSES];
    for row in y.chunks_exact_mut(CLASSES) {
        row[rng.gen_usize(CLASSES)] = 1.0;
    }
    (x, y)
}

fn cost(model: &SignsCnn, x: &[f32], y: &[f32]) -> f32 {
    let logits = model.forward(x, BATCH);
    compute_cost(&logits, y, BATCH, CLASSES)
}

fn assert_close(analytic: f32, numeric: f32, what: &str) {
    let tolerance = 1e-2f32.max(0.05 * numeric.abs());
    assert!(
        (analytic - numeric).abs() <= tolerance,
        "{}: analytic {} vs numeric {}",
        what,
        analytic,
        numeric
    );
}

// Central difference of the cost with respect to one parameter, selected by `param`.
fn numeric_gradient<F>(model: &mut SignsCnn, x: &[f32], y: &[f32], mut param: F) -> f32
where
    F: FnMut(&mut SignsCnn) -> &mut f32,
{
    let original = *param(model);
    *param(model) = original + EPSILON;
    let plus = cost(model, x, y);
    *param(model) = original - EPSILON;
    let minus = cost(model, x, y);
    *param(model) = original;
    (plus - minus) / (2.0 * EPSILON)
}

// ============================================================================
// Dense layer
// ============================================================================

mod dense_gradient_tests {
    use super::*;

    #[test]
    fn test_dense_weight_gradients_match_finite_differences() {
        let shape = InputShape::new(8, 8, 3);
        let mut model = SignsCnn::new(shape, CLASSES, 11);
        let (x, y) = random_batch(shape, 5);

        model.accumulate_gradients(&x, &y, BATCH);
        let grads = model.dense().weight_gradients();

        for idx in [0, 7, 31, grads.len() - 1] {
            let numeric = numeric_gradient(&mut model, &x, &y, |m| &mut m.dense_mut().weights_mut()[idx]);
            assert_close(grads[idx], numeric, &format!("dense weight {}", idx));
        }
    }

    #[test]
    fn test_dense_bias_gradients_match_finite_differences() {
        let shape = InputShape::new(8, 8, 3);
        let mut model = SignsCnn::new(shape, CLASSES, 12);
        let (x, y) = random_batch(shape, 6);

        model.accumulate_gradients(&x, &y, BATCH);
        let grads = model.dense().bias_gradients();

        for idx in 0..CLASSES {
            let numeric = numeric_gradient(&mut model, &x, &y, |m| &mut m.dense_mut().biases_mut()[idx]);
            assert_close(grads[idx], numeric, &format!("dense bias {}", idx));
        }
    }

    #[test]
    fn test_bias_gradients_sum_to_zero_for_one_hot_labels() {
        // Each row of softmax(z) - y sums to zero.
        let shape = InputShape::new(8, 8, 3);
        let model = SignsCnn::new(shape, CLASSES, 13);
        let (x, y) = random_batch(shape, 7);

        model.accumulate_gradients(&x, &y, BATCH);
        let total: f32 = model.dense().bias_gradients().iter().sum();
        assert!(total.abs() < 1e-5, "bias gradient sum {}", total);
    }
}

// ============================================================================
// Convolution filters (through max-pool and ReLU)
// ============================================================================

mod conv_gradient_tests {
    use super::*;

    #[test]
    fn test_conv2_filter_gradients_match_finite_differences() {
        let shape = InputShape::new(8, 8, 3);
        let mut model = SignsCnn::new(shape, CLASSES, 21);
        let (x, y) = random_batch(shape, 8);

        model.accumulate_gradients(&x, &y, BATCH);
        let grads = model.conv2().weight_gradients();

        for idx in [0, 17, 200, grads.len() - 1] {
            let numeric = numeric_gradient(&mut model, &x, &y, |m| &mut m.conv2_mut().weights_mut()[idx]);
            assert_close(grads[idx], numeric, &format!("W2 {}", idx));
        }
    }

    #[test]
    fn test_conv1_filter_gradients_match_finite_differences() {
        let shape = InputShape::new(8, 8, 3);
        let mut model = SignsCnn::new(shape, CLASSES, 22);
        let (x, y) = random_batch(shape, 9);

        model.accumulate_gradients(&x, &y, BATCH);
        let grads = model.conv1().weight_gradients();

        for idx in [0, 45, 190, grads.len() - 1] {
            let numeric = numeric_gradient(&mut model, &x, &y, |m| &mut m.conv1_mut().weights_mut()[idx]);
            assert_close(grads[idx], numeric, &format!("W1 {}", idx));
        }
    }

    #[test]
    fn test_gradients_accumulate_across_calls() {
        let shape = InputShape::new(8, 8, 3);
        let model = SignsCnn::new(shape, CLASSES, 23);
        let (x, y) = random_batch(shape, 10);

        model.accumulate_gradients(&x, &y, BATCH);
        let once = model.conv1().weight_gradients();
        model.accumulate_gradients(&x, &y, BATCH);
        let twice = model.conv1().weight_gradients();

        for (a, b) in once.iter().zip(&twice) {
            assert!((2.0 * a - b).abs() <= 1e-5 + 1e-4 * b.abs());
        }
    }
}
