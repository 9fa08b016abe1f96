// signs_cnn.rs
// Train the SIGNS ConvNet: CONV -> RELU -> MAXPOOL -> CONV -> RELU -> MAXPOOL -> FLATTEN -> FC(6).
// Expected files (see signs_cnn::dataset):
//   ./data/train_signs_images.idx
//   ./data/train_signs_labels.idx
//   ./data/test_signs_images.idx
//   ./data/test_signs_labels.idx
//
// Output:
//   - logs/training_cost_signs_cnn.txt (epoch,cost,time)
//   - plots/sample.png and plots/cost.svg
//   - prints train and test accuracy
//
// Set RUST_LOG=debug for per-epoch timings.

use clap::Parser;
use log::{error, info};
use signs_cnn::config::{load_config, TrainingConfig};
use signs_cnn::dataset::load_dataset;
use signs_cnn::model::initialize_parameters;
use signs_cnn::optimizers::OptimizerKind;
use signs_cnn::plot::{save_cost_curve, save_sample_image};
use signs_cnn::train::{train, LabeledImages};
use signs_cnn::{Result, SignsError};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

// Example shown before training.
const SAMPLE_INDEX: usize = 6;

#[derive(Parser, Debug)]
#[command(name = "signs_cnn", about = "Train a small ConvNet on the SIGNS dataset")]
struct Args {
    /// Directory holding the SIGNS IDX files
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// JSON training configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the number of epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Override the learning rate
    #[arg(long)]
    learning_rate: Option<f32>,

    /// Override the mini-batch size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Override the optimizer (adam or sgd)
    #[arg(long)]
    optimizer: Option<OptimizerKind>,

    /// Directory for logs/ and plots/
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Skip writing the sample image and cost curve
    #[arg(long)]
    no_plots: bool,
}

fn resolve_config(args: &Args) -> Result<TrainingConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(epochs) = args.epochs {
        config.num_epochs = epochs;
    }
    if let Some(lr) = args.learning_rate {
        config.learning_rate = lr;
    }
    if let Some(batch) = args.batch_size {
        config.minibatch_size = batch;
    }
    if let Some(kind) = args.optimizer {
        config.optimizer = kind;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = resolve_config(&args)?;

    info!("Loading SIGNS from {}...", args.data_dir.display());
    let load_start = Instant::now();
    let data = load_dataset(&args.data_dir)?;
    let n_classes = data.classes.len();
    info!(
        "Data loading time: {:.2} seconds",
        load_start.elapsed().as_secs_f32()
    );

    if !args.no_plots && !data.train.is_empty() {
        let index = SAMPLE_INDEX.min(data.train.len() - 1);
        let path = args.out_dir.join("plots").join("sample.png");
        save_sample_image(&data.train, index, &path)?;
        info!(
            "y value for shown image = {} (saved to {})",
            data.train.labels[index],
            path.display()
        );
    }

    let train_set = LabeledImages::from_dataset(&data.train, n_classes);
    let test_set = LabeledImages::from_dataset(&data.test, n_classes);

    info!("number of training examples = {}", train_set.len());
    info!("number of test examples = {}", test_set.len());
    for (name, set) in [("train", &train_set), ("test", &test_set)] {
        let shape = set.shape;
        info!(
            "X_{} shape: ({}, {}, {}, {})",
            name,
            set.len(),
            shape.height,
            shape.width,
            shape.channels
        );
        info!("Y_{} shape: ({}, {})", name, set.len(), n_classes);
    }
    info!("classes: {}", data.classes.join(", "));

    let params = initialize_parameters(config.init_seed);
    info!("W1[1, 1, 1] = {:?}", params.w1.taps(1, 1, 1));
    info!("W2[1, 1, 1] = {:?}", params.w2.taps(1, 1, 1));

    let log_dir = args.out_dir.join("logs");
    fs::create_dir_all(&log_dir).map_err(|e| SignsError::io(&log_dir, e))?;
    let log_path = log_dir.join("training_cost_signs_cnn.txt");
    let log_file = File::create(&log_path).map_err(|e| SignsError::io(&log_path, e))?;
    let mut cost_log = BufWriter::new(log_file);

    let train_start = Instant::now();
    let report = train(&train_set, &test_set, &config, Some(&mut cost_log))?;
    info!(
        "Total training time: {:.2} seconds",
        train_start.elapsed().as_secs_f32()
    );

    if !args.no_plots {
        let path = args.out_dir.join("plots").join("cost.svg");
        save_cost_curve(&report.costs, config.learning_rate, &path)?;
        info!("Cost curve saved to {}", path.display());
    }

    println!("Train Accuracy: {:.4}", report.train_accuracy);
    println!("Test Accuracy: {:.4}", report.test_accuracy);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}
