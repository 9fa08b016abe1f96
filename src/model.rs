//! The SIGNS ConvNet.
//!
//! ```text
//! CONV2D(4x4, 8, SAME) -> RELU -> MAXPOOL(8x8, /8, SAME)
//!   -> CONV2D(2x2, 16, SAME) -> RELU -> MAXPOOL(4x4, /4, SAME)
//!   -> FLATTEN -> DENSE(n_classes)
//! ```
//!
//! With 64x64x3 inputs the feature maps go 64x64x8 -> 8x8x8 -> 8x8x16 ->
//! 2x2x16, so the dense layer sees 64 features. The convolutions have no bias;
//! the dense layer does. Buffers are NHWC, so FLATTEN needs no copy.

use crate::layers::conv2d::FilterBank;
use crate::layers::{Conv2DLayer, DenseLayer, Layer, MaxPool2DLayer, ReluLayer};
use crate::loss::{argmax_rows, softmax_cross_entropy_backward};
use crate::optimizers::{Optimizer, OptimizerKind};
use crate::shapes::InputShape;
use crate::utils::SimpleRng;

// CNN topology.
const CONV1_KERNEL: usize = 4;
const CONV1_FILTERS: usize = 8;
const POOL1: usize = 8;
const CONV2_KERNEL: usize = 2;
const CONV2_FILTERS: usize = 16;
const POOL2: usize = 4;

/// Examples per forward pass when evaluating a whole dataset.
const EVAL_CHUNK: usize = 64;

/// The two learnable filter groups of the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Shape (4, 4, in_channels, 8).
    pub w1: FilterBank,
    /// Shape (2, 2, 8, 16).
    pub w2: FilterBank,
}

impl Parameters {
    /// Xavier-initialize both filter groups for `in_channels` input channels.
    ///
    /// Each group draws from its own generator seeded with `seed`, so W1 and
    /// W2 do not depend on each other's size.
    pub fn xavier(in_channels: usize, seed: u64) -> Self {
        Self {
            w1: FilterBank::xavier(
                CONV1_KERNEL,
                in_channels,
                CONV1_FILTERS,
                &mut SimpleRng::new(seed),
            ),
            w2: FilterBank::xavier(
                CONV2_KERNEL,
                CONV1_FILTERS,
                CONV2_FILTERS,
                &mut SimpleRng::new(seed),
            ),
        }
    }
}

/// Initialize W1 `(4, 4, 3, 8)` and W2 `(2, 2, 8, 16)` for RGB input.
///
/// # Example
///
/// ```
/// use signs_cnn::model::initialize_parameters;
///
/// let params = initialize_parameters(0);
/// assert_eq!(params.w1.shape(), [4, 4, 3, 8]);
/// assert_eq!(params.w2.shape(), [2, 2, 8, 16]);
/// ```
pub fn initialize_parameters(seed: u64) -> Parameters {
    Parameters::xavier(3, seed)
}

/// Intermediate values of one forward pass, kept for backprop.
pub struct Activations {
    pub z1: Vec<f32>,
    pub a1: Vec<f32>,
    pub p1: Vec<f32>,
    pub z2: Vec<f32>,
    pub a2: Vec<f32>,
    /// Pooled features, already flat per example.
    pub p2: Vec<f32>,
    pub logits: Vec<f32>,
}

/// CONV -> RELU -> POOL -> CONV -> RELU -> POOL -> FLATTEN -> DENSE classifier.
pub struct SignsCnn {
    input_shape: InputShape,
    n_classes: usize,
    conv1: Conv2DLayer,
    relu1: ReluLayer,
    pool1: MaxPool2DLayer,
    conv2: Conv2DLayer,
    relu2: ReluLayer,
    pool2: MaxPool2DLayer,
    fc: DenseLayer,
}

impl SignsCnn {
    /// Build the network with freshly initialized parameters.
    ///
    /// Conv filters come from [`Parameters::xavier`] with `seed`; the dense
    /// layer draws from a generator seeded with `seed + 1`.
    ///
    /// # Example
    ///
    /// ```
    /// use signs_cnn::model::SignsCnn;
    /// use signs_cnn::shapes::InputShape;
    ///
    /// let model = SignsCnn::new(InputShape::new(64, 64, 3), 6, 0);
    /// assert_eq!(model.flattened_features(), 64);
    /// ```
    pub fn new(input_shape: InputShape, n_classes: usize, seed: u64) -> Self {
        let params = Parameters::xavier(input_shape.channels, seed);
        Self::from_parameters(params, input_shape, n_classes, seed.wrapping_add(1))
    }

    /// Build the network around existing conv filters.
    ///
    /// # Panics
    ///
    /// Panics if the filters do not fit the input channels or each other.
    pub fn from_parameters(
        params: Parameters,
        input_shape: InputShape,
        n_classes: usize,
        dense_seed: u64,
    ) -> Self {
        assert_eq!(
            params.w1.in_channels, input_shape.channels,
            "W1 input channels must match the image channels"
        );
        assert_eq!(
            params.w2.in_channels, params.w1.out_channels,
            "W2 input channels must match W1 output channels"
        );

        let InputShape { height, width, .. } = input_shape;
        let c1 = params.w1.out_channels;
        let c2 = params.w2.out_channels;

        let conv1 = Conv2DLayer::new(params.w1, 1, height, width);
        let relu1 = ReluLayer::new(conv1.output_size());
        let pool1 = MaxPool2DLayer::new(
            POOL1,
            POOL1,
            conv1.output_height(),
            conv1.output_width(),
            c1,
        );

        let conv2 = Conv2DLayer::new(params.w2, 1, pool1.output_height(), pool1.output_width());
        let relu2 = ReluLayer::new(conv2.output_size());
        let pool2 = MaxPool2DLayer::new(
            POOL2,
            POOL2,
            conv2.output_height(),
            conv2.output_width(),
            c2,
        );

        let fc = DenseLayer::new(pool2.output_size(), n_classes, &mut SimpleRng::new(dense_seed));

        Self {
            input_shape,
            n_classes,
            conv1,
            relu1,
            pool1,
            conv2,
            relu2,
            pool2,
            fc,
        }
    }

    pub fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Features per example after FLATTEN.
    pub fn flattened_features(&self) -> usize {
        self.pool2.output_size()
    }

    pub fn conv1(&self) -> &Conv2DLayer {
        &self.conv1
    }

    pub fn conv1_mut(&mut self) -> &mut Conv2DLayer {
        &mut self.conv1
    }

    pub fn conv2(&self) -> &Conv2DLayer {
        &self.conv2
    }

    pub fn conv2_mut(&mut self) -> &mut Conv2DLayer {
        &mut self.conv2
    }

    pub fn dense(&self) -> &DenseLayer {
        &self.fc
    }

    pub fn dense_mut(&mut self) -> &mut DenseLayer {
        &mut self.fc
    }

    fn layers(&self) -> [&dyn Layer; 7] {
        [
            &self.conv1,
            &self.relu1,
            &self.pool1,
            &self.conv2,
            &self.relu2,
            &self.pool2,
            &self.fc,
        ]
    }

    fn layers_mut(&mut self) -> [&mut dyn Layer; 7] {
        [
            &mut self.conv1,
            &mut self.relu1,
            &mut self.pool1,
            &mut self.conv2,
            &mut self.relu2,
            &mut self.pool2,
            &mut self.fc,
        ]
    }

    /// Total number of trainable values (filters, dense weights and biases).
    pub fn parameter_count(&self) -> usize {
        self.layers().iter().map(|layer| layer.parameter_count()).sum()
    }

    /// One optimizer per parameter tensor, in layer order.
    pub fn optimizers(&self, kind: OptimizerKind, learning_rate: f32) -> Vec<Box<dyn Optimizer>> {
        let tensors: usize = self.layers().iter().map(|layer| layer.parameter_tensors()).sum();
        (0..tensors).map(|_| kind.build(learning_rate)).collect()
    }

    /// Forward pass keeping every intermediate buffer.
    pub fn forward_cached(&self, input: &[f32], batch_size: usize) -> Activations {
        assert_eq!(
            input.len(),
            batch_size * self.input_shape.volume(),
            "input batch does not match {}",
            self.input_shape
        );

        let run = |layer: &dyn Layer, x: &[f32]| {
            let mut out = vec![0.0f32; batch_size * layer.output_size()];
            layer.forward(x, &mut out, batch_size);
            out
        };

        let z1 = run(&self.conv1, input);
        let a1 = run(&self.relu1, &z1);
        let p1 = run(&self.pool1, &a1);
        let z2 = run(&self.conv2, &p1);
        let a2 = run(&self.relu2, &z2);
        let p2 = run(&self.pool2, &a2);
        let logits = run(&self.fc, &p2);

        Activations {
            z1,
            a1,
            p1,
            z2,
            a2,
            p2,
            logits,
        }
    }

    /// Logits `(batch_size, n_classes)` for an NHWC input batch.
    pub fn forward(&self, input: &[f32], batch_size: usize) -> Vec<f32> {
        self.forward_cached(input, batch_size).logits
    }

    /// Predicted class per example.
    pub fn predict(&self, input: &[f32], batch_size: usize) -> Vec<usize> {
        argmax_rows(&self.forward(input, batch_size), self.n_classes)
    }

    /// Run forward and backward on one batch, accumulating parameter gradients.
    ///
    /// Returns the batch cost. Gradients stay in the layers until
    /// [`SignsCnn::apply_gradients`] consumes them.
    pub fn accumulate_gradients(&self, input: &[f32], labels: &[f32], batch_size: usize) -> f32 {
        let acts = self.forward_cached(input, batch_size);

        let mut delta = vec![0.0f32; acts.logits.len()];
        let cost = softmax_cross_entropy_backward(
            &acts.logits,
            labels,
            batch_size,
            self.n_classes,
            &mut delta,
        );

        let back = |layer: &dyn Layer, x: &[f32], g: &[f32]| {
            let mut grad_input = vec![0.0f32; x.len()];
            layer.backward(x, g, &mut grad_input, batch_size);
            grad_input
        };

        let d_p2 = back(&self.fc, &acts.p2, &delta);
        let d_a2 = back(&self.pool2, &acts.a2, &d_p2);
        let d_z2 = back(&self.relu2, &acts.z2, &d_a2);
        let d_p1 = back(&self.conv2, &acts.p1, &d_z2);
        let d_a1 = back(&self.pool1, &acts.a1, &d_p1);
        let d_z1 = back(&self.relu1, &acts.z1, &d_a1);
        back(&self.conv1, input, &d_z1);

        cost
    }

    /// Apply and clear the accumulated gradients.
    ///
    /// `optimizers` must come from [`SignsCnn::optimizers`] on this model.
    pub fn apply_gradients(&mut self, optimizers: &mut [Box<dyn Optimizer>]) {
        let mut rest = optimizers;
        for layer in self.layers_mut() {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(layer.parameter_tensors());
            layer.apply_gradients(head);
            rest = tail;
        }
        assert!(rest.is_empty(), "more optimizers than parameter tensors");
    }

    /// One optimizer step on a mini-batch; returns the batch cost.
    pub fn train_step(
        &mut self,
        input: &[f32],
        labels: &[f32],
        batch_size: usize,
        optimizers: &mut [Box<dyn Optimizer>],
    ) -> f32 {
        let cost = self.accumulate_gradients(input, labels, batch_size);
        self.apply_gradients(optimizers);
        cost
    }

    /// Fraction of examples whose predicted class matches the label row's arg-max.
    pub fn accuracy(&self, images: &[f32], labels: &[f32], count: usize) -> f32 {
        if count == 0 {
            return 0.0;
        }
        let volume = self.input_shape.volume();
        assert_eq!(images.len(), count * volume, "image buffer length mismatch");
        assert_eq!(labels.len(), count * self.n_classes, "label buffer length mismatch");

        let expected = argmax_rows(labels, self.n_classes);
        let mut correct = 0usize;

        for (chunk_idx, chunk) in images.chunks(EVAL_CHUNK * volume).enumerate() {
            let batch = chunk.len() / volume;
            let start = chunk_idx * EVAL_CHUNK;
            correct += self
                .predict(chunk, batch)
                .iter()
                .zip(&expected[start..start + batch])
                .filter(|(predicted, truth)| predicted == truth)
                .count();
        }

        correct as f32 / count as f32
    }
}
