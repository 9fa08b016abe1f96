// End-to-end training tests on small synthetic SIGNS-shaped data.

use signs_cnn::config::TrainingConfig;
use signs_cnn::dataset::idx::write_idx;
use signs_cnn::dataset::{load_dataset, TEST_IMAGES, TEST_LABELS, TRAIN_IMAGES, TRAIN_LABELS};
use signs_cnn::optimizers::OptimizerKind;
use signs_cnn::plot::{save_cost_curve, save_sample_image};
use signs_cnn::shapes::InputShape;
use signs_cnn::train::{train, LabeledImages};
use signs_cnn::utils::SimpleRng;
use std::fs;
use tempfile::TempDir;

// Two classes told apart by which colour channel is bright.
fn separable_set(count: usize, seed: u64) -> LabeledImages {
    let shape = InputShape::new(8, 8, 3);
    let mut rng = SimpleRng::new(seed);
    let mut images = Vec::with_capacity(count * shape.volume());
    let mut labels = Vec::with_capacity(count * 2);
    for i in 0..count {
        let class = i % 2;
        let bright = if class == 0 { 0 } else { 2 };
        for _ in 0..shape.height * shape.width {
            for c in 0..shape.channels {
                let base = if c == bright { 0.8 } else { 0.1 };
                images.push(base + 0.1 * rng.next_f32());
            }
        }
        labels.extend_from_slice(if class == 0 { &[1.0, 0.0] } else { &[0.0, 1.0] });
    }
    LabeledImages {
        shape,
        n_classes: 2,
        images,
        labels,
    }
}

fn small_config(epochs: usize) -> TrainingConfig {
    TrainingConfig {
        learning_rate: 0.01,
        num_epochs: epochs,
        minibatch_size: 8,
        print_every: 10,
        ..TrainingConfig::default()
    }
}

// ============================================================================
// Convergence
// ============================================================================

mod convergence_tests {
    use super::*;

    #[test]
    fn test_adam_reduces_cost() {
        let train_set = separable_set(32, 1);
        let test_set = separable_set(8, 2);
        let report = train(&train_set, &test_set, &small_config(40), None).unwrap();

        assert_eq!(report.costs.len(), 40);
        let first = report.costs[0];
        let last = *report.costs.last().unwrap();
        assert!(last < first, "cost went from {} to {}", first, last);
        assert!(report.costs.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_sgd_reduces_cost() {
        let train_set = separable_set(32, 3);
        let config = TrainingConfig {
            optimizer: OptimizerKind::Sgd,
            learning_rate: 0.1,
            ..small_config(60)
        };
        let report = train(&train_set, &train_set, &config, None).unwrap();

        let first = report.costs[0];
        let last = *report.costs.last().unwrap();
        assert!(last < first, "cost went from {} to {}", first, last);
    }

    #[test]
    fn test_training_is_deterministic() {
        let train_set = separable_set(20, 4);
        let a = train(&train_set, &train_set, &small_config(3), None).unwrap();
        let b = train(&train_set, &train_set, &small_config(3), None).unwrap();

        assert_eq!(a.costs, b.costs);
        assert_eq!(a.train_accuracy, b.train_accuracy);
    }

    #[test]
    fn test_accuracies_are_fractions() {
        let train_set = separable_set(12, 5);
        let test_set = separable_set(5, 6);
        let report = train(&train_set, &test_set, &small_config(2), None).unwrap();

        assert!((0.0..=1.0).contains(&report.train_accuracy));
        // 5 test examples: accuracy is a multiple of 1/5.
        let scaled = report.test_accuracy * 5.0;
        assert!((scaled - scaled.round()).abs() < 1e-5);
    }
}

// ============================================================================
// Full pipeline through files
// ============================================================================

mod pipeline_tests {
    use super::*;

    fn write_signs(dir: &std::path::Path, count: usize, images: &str, labels: &str) {
        let mut rng = SimpleRng::new(count as u64);
        let pixels: Vec<u8> = (0..count * 64 * 64 * 3).map(|_| (rng.next_u32() % 256) as u8).collect();
        let ys: Vec<u8> = (0..count).map(|i| (i % 6) as u8).collect();
        write_idx(&dir.join(images), &[count, 64, 64, 3], &pixels).unwrap();
        write_idx(&dir.join(labels), &[count], &ys).unwrap();
    }

    #[test]
    fn test_files_to_report() {
        let data_dir = TempDir::new().unwrap();
        write_signs(data_dir.path(), 10, TRAIN_IMAGES, TRAIN_LABELS);
        write_signs(data_dir.path(), 4, TEST_IMAGES, TEST_LABELS);
        let out_dir = TempDir::new().unwrap();

        let data = load_dataset(data_dir.path()).unwrap();
        let n_classes = data.classes.len();
        let train_set = LabeledImages::from_dataset(&data.train, n_classes);
        let test_set = LabeledImages::from_dataset(&data.test, n_classes);
        assert_eq!(train_set.len(), 10);
        assert_eq!(test_set.len(), 4);

        let sample = out_dir.path().join("plots").join("sample.png");
        save_sample_image(&data.train, 6, &sample).unwrap();
        assert!(sample.exists());

        let mut log = Vec::new();
        let config = small_config(2);
        let report = train(&train_set, &test_set, &config, Some(&mut log)).unwrap();

        let text = String::from_utf8(log).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for (epoch, line) in lines.iter().enumerate() {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 3);
            assert_eq!(fields[0], epoch.to_string());
            assert!(fields[1].parse::<f32>().is_ok());
        }

        let curve = out_dir.path().join("plots").join("cost.svg");
        save_cost_curve(&report.costs, config.learning_rate, &curve).unwrap();
        let svg = fs::read_to_string(&curve).unwrap();
        assert!(svg.contains("<svg"));
    }
}
