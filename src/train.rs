//! Training loop and accuracy evaluation.

use crate::config::TrainingConfig;
use crate::dataset::{random_mini_batches, SignsDataset};
use crate::error::{Result, SignsError};
use crate::model::SignsCnn;
use crate::shapes::{create_placeholders, InputShape};
use log::{debug, info, warn};
use std::io::Write;
use std::time::Instant;

/// Normalized images with one-hot label rows, ready to feed the network.
#[derive(Debug, Clone)]
pub struct LabeledImages {
    pub shape: InputShape,
    pub n_classes: usize,
    /// NHWC values in `[0, 1]`
    pub images: Vec<f32>,
    /// `(count, n_classes)` one-hot rows
    pub labels: Vec<f32>,
}

impl LabeledImages {
    pub fn from_dataset(dataset: &SignsDataset, n_classes: usize) -> Self {
        Self {
            shape: dataset.shape,
            n_classes,
            images: dataset.normalized_images(),
            labels: dataset.one_hot_labels(n_classes),
        }
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        if self.n_classes == 0 {
            0
        } else {
            self.labels.len() / self.n_classes
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_buffers(&self, name: &str) -> Result<()> {
        if self.images.len() != self.len() * self.shape.volume() {
            return Err(SignsError::DatasetMismatch(format!(
                "{} set has {} image values for {} examples of {}",
                name,
                self.images.len(),
                self.len(),
                self.shape
            )));
        }
        Ok(())
    }
}

// Both splits must feed the same network.
fn check_compatible(train_set: &LabeledImages, test_set: &LabeledImages) -> Result<()> {
    train_set.check_buffers("train")?;
    test_set.check_buffers("test")?;
    if test_set.shape != train_set.shape || test_set.n_classes != train_set.n_classes {
        return Err(SignsError::DatasetMismatch(format!(
            "test set is {} with {} classes but train set is {} with {} classes",
            test_set.shape, test_set.n_classes, train_set.shape, train_set.n_classes
        )));
    }
    Ok(())
}

/// What a training run produced.
pub struct TrainingReport {
    /// Epoch costs, one per epoch when `print_cost` is set
    pub costs: Vec<f32>,
    pub train_accuracy: f32,
    pub test_accuracy: f32,
    pub model: SignsCnn,
}

/// Train the SIGNS ConvNet and evaluate it on both splits.
///
/// Each epoch reshuffles the training set into mini-batches (seeded with
/// `config.seed + epoch + 1`) and takes one optimizer step per batch. The
/// epoch cost adds `batch_cost / floor(m / minibatch_size)` for every batch,
/// trailing partial batch included.
///
/// When `cost_log` is given, one `epoch,cost,seconds` line is written per epoch.
pub fn train(
    train_set: &LabeledImages,
    test_set: &LabeledImages,
    config: &TrainingConfig,
    mut cost_log: Option<&mut dyn Write>,
) -> Result<TrainingReport> {
    config.validate()?;
    check_compatible(train_set, test_set)?;

    let m = train_set.len();
    let (x_shape, n_y) = create_placeholders(
        train_set.shape.height,
        train_set.shape.width,
        train_set.shape.channels,
        train_set.n_classes,
    );
    debug!("X = {}, Y = (?, {})", x_shape, n_y);

    let mut model = SignsCnn::new(x_shape, n_y, config.init_seed);
    let mut optimizers = model.optimizers(config.optimizer, config.learning_rate);
    info!(
        "Training SIGNS CNN: examples={} epochs={} batch={} lr={} optimizer={} params={}",
        m,
        config.num_epochs,
        config.minibatch_size,
        config.learning_rate,
        config.optimizer,
        model.parameter_count()
    );

    let num_minibatches = (m / config.minibatch_size).max(1) as f32;
    let mut costs = Vec::with_capacity(config.num_epochs);

    for epoch in 0..config.num_epochs {
        let start_time = Instant::now();
        let seed = config.seed.wrapping_add(epoch as u64 + 1);
        let minibatches = random_mini_batches(
            &train_set.images,
            &train_set.labels,
            x_shape.volume(),
            n_y,
            config.minibatch_size,
            seed,
        );

        let mut minibatch_cost = 0.0f32;
        for batch in &minibatches {
            let temp_cost = model.train_step(&batch.x, &batch.y, batch.size, &mut optimizers);
            minibatch_cost += temp_cost / num_minibatches;
        }

        let secs = start_time.elapsed().as_secs_f32();
        if config.print_cost && epoch % config.print_every == 0 {
            info!("Cost after epoch {}: {:.6}", epoch, minibatch_cost);
        }
        debug!("epoch {} took {:.3}s over {} batches", epoch, secs, minibatches.len());
        if config.print_cost {
            costs.push(minibatch_cost);
        }
        if let Some(log) = cost_log.as_deref_mut() {
            if let Err(e) = writeln!(log, "{},{},{}", epoch, minibatch_cost, secs) {
                warn!("failed writing training cost: {}", e);
            }
        }
    }

    if let Some(log) = cost_log.as_deref_mut() {
        if let Err(e) = log.flush() {
            warn!("failed flushing training cost log: {}", e);
        }
    }

    let train_accuracy = model.accuracy(&train_set.images, &train_set.labels, m);
    let test_accuracy = model.accuracy(&test_set.images, &test_set.labels, test_set.len());
    info!("Train Accuracy: {:.4}", train_accuracy);
    info!("Test Accuracy: {:.4}", test_accuracy);

    Ok(TrainingReport {
        costs,
        train_accuracy,
        test_accuracy,
        model,
    })
}
