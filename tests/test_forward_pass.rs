// Forward pass tests for the SIGNS ConvNet and its layers.

use approx::assert_relative_eq;
use signs_cnn::layers::conv2d::FilterBank;
use signs_cnn::layers::{Conv2DLayer, Layer, MaxPool2DLayer};
use signs_cnn::model::{initialize_parameters, SignsCnn};
use signs_cnn::shapes::{create_placeholders, InputShape};
use signs_cnn::utils::SimpleRng;

fn random_images(count: usize, shape: InputShape, seed: u64) -> Vec<f32> {
    let mut rng = SimpleRng::new(seed);
    (0..count * shape.volume()).map(|_| rng.next_f32()).collect()
}

// ============================================================================
// Network shape tests
// ============================================================================

mod shape_tests {
    use super::*;

    #[test]
    fn test_placeholders_for_signs() {
        let (x, n_y) = create_placeholders(64, 64, 3, 6);
        assert_eq!(x.to_string(), "(?, 64, 64, 3)");
        assert_eq!(n_y, 6);
    }

    #[test]
    fn test_activation_shapes_for_64x64_rgb() {
        let shape = InputShape::new(64, 64, 3);
        let model = SignsCnn::new(shape, 6, 1);
        let batch = 2;
        let x = random_images(batch, shape, 4);

        let acts = model.forward_cached(&x, batch);
        assert_eq!(acts.z1.len(), batch * 64 * 64 * 8);
        assert_eq!(acts.a1.len(), batch * 64 * 64 * 8);
        assert_eq!(acts.p1.len(), batch * 8 * 8 * 8);
        assert_eq!(acts.z2.len(), batch * 8 * 8 * 16);
        assert_eq!(acts.a2.len(), batch * 8 * 8 * 16);
        assert_eq!(acts.p2.len(), batch * 64);
        assert_eq!(acts.logits.len(), batch * 6);
        assert!(acts.logits.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_odd_input_size_uses_ceil_division() {
        // 10 -> conv 10 -> pool ceil(10/8) = 2 -> conv 2 -> pool ceil(2/4) = 1
        let model = SignsCnn::new(InputShape::new(10, 10, 3), 6, 0);
        assert_eq!(model.conv1().output_height(), 10);
        assert_eq!(model.flattened_features(), 16);
    }

    #[test]
    fn test_initialized_filter_taps() {
        let params = initialize_parameters(0);
        assert_eq!(params.w1.taps(1, 1, 1).len(), 8);
        assert_eq!(params.w2.taps(1, 1, 1).len(), 16);
    }
}

// ============================================================================
// Activation behaviour
// ============================================================================

mod activation_tests {
    use super::*;

    #[test]
    fn test_relu_and_pool_outputs_are_non_negative() {
        let shape = InputShape::new(16, 16, 3);
        let model = SignsCnn::new(shape, 6, 2);
        let x = random_images(3, shape, 5);

        let acts = model.forward_cached(&x, 3);
        assert!(acts.a1.iter().all(|&v| v >= 0.0));
        assert!(acts.p1.iter().all(|&v| v >= 0.0));
        assert!(acts.a2.iter().all(|&v| v >= 0.0));
        assert!(acts.p2.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_examples_are_independent_within_a_batch() {
        let shape = InputShape::new(16, 16, 3);
        let model = SignsCnn::new(shape, 6, 3);
        let x = random_images(2, shape, 6);

        let both = model.forward(&x, 2);
        let second = model.forward(&x[shape.volume()..], 1);
        for (a, b) in both[6..].iter().zip(&second) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_predictions_are_valid_classes() {
        let shape = InputShape::new(16, 16, 3);
        let model = SignsCnn::new(shape, 6, 4);
        let x = random_images(5, shape, 7);

        let predictions = model.predict(&x, 5);
        assert_eq!(predictions.len(), 5);
        assert!(predictions.iter().all(|&p| p < 6));
    }
}

// ============================================================================
// Layer composition
// ============================================================================

mod layer_tests {
    use super::*;

    #[test]
    fn test_conv_then_pool_with_ones_filter() {
        // 1x1 filter of ones over two channels sums them; the 2x2 pool keeps the max.
        let filters = FilterBank {
            kernel_size: 1,
            in_channels: 2,
            out_channels: 1,
            values: vec![1.0, 1.0],
        };
        let conv = Conv2DLayer::new(filters, 1, 2, 2);
        let pool = MaxPool2DLayer::new(2, 2, 2, 2, 1);

        let input = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
        let mut z = vec![0.0; 4];
        conv.forward(&input, &mut z, 1);
        let mut p = vec![0.0; 1];
        pool.forward(&z, &mut p, 1);

        assert_relative_eq!(z[0], 0.3, epsilon = 1e-6);
        assert_relative_eq!(p[0], 1.5, epsilon = 1e-6);
    }
}
