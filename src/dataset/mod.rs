//! SIGNS dataset loading and preprocessing.
//!
//! A dataset directory holds four IDX files (see [`idx`]):
//!
//! ```text
//! train_signs_images.idx   u8 (m_train, 64, 64, 3)
//! train_signs_labels.idx   u8 (m_train)
//! test_signs_images.idx    u8 (m_test, 64, 64, 3)
//! test_signs_labels.idx    u8 (m_test)
//! classes.txt              optional, one class name per line
//! ```
//!
//! Without `classes.txt` the six classes are named `0`..`5`.

pub mod batching;
pub mod idx;

pub use batching::{random_mini_batches, MiniBatch};

use crate::error::{Result, SignsError};
use crate::shapes::{create_placeholders, InputShape};
use log::debug;
use std::fs;
use std::path::Path;

/// Number of hand-sign classes (digits 0 to 5).
pub const NUM_CLASSES: usize = 6;

pub const TRAIN_IMAGES: &str = "train_signs_images.idx";
pub const TRAIN_LABELS: &str = "train_signs_labels.idx";
pub const TEST_IMAGES: &str = "test_signs_images.idx";
pub const TEST_LABELS: &str = "test_signs_labels.idx";
pub const CLASSES: &str = "classes.txt";

/// Height, width and channels of every SIGNS image.
pub fn signs_image_shape() -> InputShape {
    create_placeholders(64, 64, 3, NUM_CLASSES).0
}

/// One split of raw images (NHWC bytes) and integer labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SignsDataset {
    pub shape: InputShape,
    pub images: Vec<u8>,
    pub labels: Vec<u8>,
}

impl SignsDataset {
    /// Number of examples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Raw bytes of one image, `height × width × channels`.
    pub fn image(&self, index: usize) -> &[u8] {
        let volume = self.shape.volume();
        &self.images[index * volume..(index + 1) * volume]
    }

    /// Images scaled to `[0, 1]`.
    pub fn normalized_images(&self) -> Vec<f32> {
        normalize(&self.images)
    }

    /// Labels as one-hot rows of width `n_classes`.
    pub fn one_hot_labels(&self, n_classes: usize) -> Vec<f32> {
        convert_to_one_hot(&self.labels, n_classes)
    }
}

/// Train and test splits plus the class names.
#[derive(Debug, Clone)]
pub struct SignsData {
    pub train: SignsDataset,
    pub test: SignsDataset,
    pub classes: Vec<String>,
}

/// Scale raw pixel bytes from `0..=255` to `[0, 1]`.
pub fn normalize(bytes: &[u8]) -> Vec<f32> {
    bytes.iter().map(|&b| b as f32 / 255.0).collect()
}

/// One-hot encode integer labels into `(labels.len(), n_classes)` rows.
///
/// # Panics
///
/// Panics if a label is not below `n_classes`.
///
/// # Example
///
/// ```
/// use signs_cnn::dataset::convert_to_one_hot;
///
/// let y = convert_to_one_hot(&[2, 0], 3);
/// assert_eq!(y, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
/// ```
pub fn convert_to_one_hot(labels: &[u8], n_classes: usize) -> Vec<f32> {
    let mut rows = vec![0.0f32; labels.len() * n_classes];
    for (row, &label) in rows.chunks_exact_mut(n_classes).zip(labels) {
        let label = label as usize;
        assert!(label < n_classes, "label {} out of range for {} classes", label, n_classes);
        row[label] = 1.0;
    }
    rows
}

/// Read one split from an image file and a label file.
///
/// The images must be `(count, height, width, channels)` with the per-image
/// dimensions of `expected`.
pub fn load_split(
    images_path: &Path,
    labels_path: &Path,
    expected: InputShape,
    n_classes: usize,
) -> Result<SignsDataset> {
    let images = idx::read_idx(images_path)?;
    let labels = idx::read_idx(labels_path)?;

    let [count, height, width, channels] = images.dims[..] else {
        return Err(SignsError::dataset(
            images_path,
            format!("expected a rank-4 image array, found dims {:?}", images.dims),
        ));
    };
    let shape = InputShape::new(height, width, channels);
    if shape != expected {
        return Err(SignsError::dataset(
            images_path,
            format!("expected {} images, found {}", expected, shape),
        ));
    }
    if labels.dims.len() != 1 {
        return Err(SignsError::dataset(
            labels_path,
            format!("expected a rank-1 label array, found dims {:?}", labels.dims),
        ));
    }
    if labels.dims[0] != count {
        return Err(SignsError::dataset(
            labels_path,
            format!("{} labels for {} images", labels.dims[0], count),
        ));
    }
    if let Some(&bad) = labels.data.iter().find(|&&l| l as usize >= n_classes) {
        return Err(SignsError::dataset(
            labels_path,
            format!("label {} out of range for {} classes", bad, n_classes),
        ));
    }

    debug!(
        "loaded {} examples of {}x{}x{} from {}",
        count,
        height,
        width,
        channels,
        images_path.display()
    );

    Ok(SignsDataset {
        shape,
        images: images.data,
        labels: labels.data,
    })
}

fn load_classes(dir: &Path) -> Result<Vec<String>> {
    let path = dir.join(CLASSES);
    if !path.exists() {
        return Ok((0..NUM_CLASSES).map(|c| c.to_string()).collect());
    }
    let contents = fs::read_to_string(&path).map_err(|e| SignsError::io(&path, e))?;
    let classes: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    if classes.is_empty() {
        return Err(SignsError::dataset(&path, "no class names"));
    }
    Ok(classes)
}

/// Load the train and test splits from a dataset directory.
///
/// Both splits must hold `64 × 64 × 3` images.
pub fn load_dataset(dir: impl AsRef<Path>) -> Result<SignsData> {
    let dir = dir.as_ref();
    let classes = load_classes(dir)?;
    let n_classes = classes.len();
    let shape = signs_image_shape();

    let train = load_split(&dir.join(TRAIN_IMAGES), &dir.join(TRAIN_LABELS), shape, n_classes)?;
    let test = load_split(&dir.join(TEST_IMAGES), &dir.join(TEST_LABELS), shape, n_classes)?;

    Ok(SignsData {
        train,
        test,
        classes,
    })
}
