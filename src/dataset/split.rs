//! Train/test partitioning, validation hold-out and pixel scaling
//!
//! ## Split Strategy
//!
//! 1. **Test partition**: `ceil(test_fraction * n)` records picked by a seeded
//!    permutation (ChaCha8, seed 2 by default); not stratified.
//! 2. **Train partition**: every remaining record, in permutation order.
//! 3. **Validation slice**: the tail of the train partition, taken at fit time.

use burn::config::Config;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::dataset::loader::LabeledImages;
use crate::dataset::preprocess::ImageArray;
use crate::utils::error::{FaceMaskError, Result};

/// Configuration for the train/test split
#[derive(Config, Debug, PartialEq)]
pub struct SplitConfig {
    /// Fraction of records held out for testing
    #[config(default = "0.2")]
    pub test_fraction: f64,

    /// Seed of the permutation
    #[config(default = "2")]
    pub seed: u64,
}

impl SplitConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(FaceMaskError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }

    /// Number of test records for a dataset of `n` records
    pub fn test_size(&self, n: usize) -> usize {
        (self.test_fraction * n as f64).ceil() as usize
    }
}

/// The two disjoint partitions of a dataset
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: LabeledImages,
    pub test: LabeledImages,
    /// Original position of every train record
    pub train_indices: Vec<usize>,
    /// Original position of every test record
    pub test_indices: Vec<usize>,
}

/// Permutation of `0..n` for a given seed
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

/// Partition `data` into train and test sets
///
/// The same seed always yields the same partitions. Both partitions must be
/// non-empty, so at least two records are required.
pub fn train_test_split(data: LabeledImages, config: &SplitConfig) -> Result<DatasetSplit> {
    config.validate()?;

    let n = data.len();
    let test_size = config.test_size(n);
    if n < 2 || test_size == 0 || test_size >= n {
        return Err(FaceMaskError::Dataset(format!(
            "cannot split {} records with test fraction {}",
            n, config.test_fraction
        )));
    }

    let permutation = shuffled_indices(n, config.seed);
    let (test_indices, train_indices) = permutation.split_at(test_size);

    let (images, labels) = data.into_parts();
    let mut slots: Vec<Option<(ImageArray, u8)>> =
        images.into_iter().zip(labels).map(Some).collect();

    let mut take = |indices: &[usize]| -> Result<LabeledImages> {
        let mut images = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            let (image, label) = slots[i].take().ok_or_else(|| {
                FaceMaskError::Dataset(format!("record {} assigned twice", i))
            })?;
            images.push(image);
            labels.push(label);
        }
        LabeledImages::new(images, labels)
    };

    let test = take(test_indices)?;
    let train = take(train_indices)?;

    info!(
        "Split {} records into {} train / {} test (seed {})",
        n,
        train.len(),
        test.len(),
        config.seed
    );

    Ok(DatasetSplit {
        train,
        test,
        train_indices: train_indices.to_vec(),
        test_indices: test_indices.to_vec(),
    })
}

/// Hold out the tail of `train` for validation
///
/// Keeps the first `floor(n * (1 - fraction))` records for training and
/// returns `(train, validation)`.
pub fn validation_split(mut train: LabeledImages, fraction: f64) -> Result<(LabeledImages, LabeledImages)> {
    if !(0.0..1.0).contains(&fraction) {
        return Err(FaceMaskError::Config(format!(
            "validation fraction must be in [0, 1), got {}",
            fraction
        )));
    }

    let split_at = (train.len() as f64 * (1.0 - fraction)).floor() as usize;
    let validation = train.split_off(split_at);
    Ok((train, validation))
}

/// Divide every pixel value by 255
pub fn scale_pixels(image: &ImageArray) -> Vec<f32> {
    image.as_slice().iter().map(|&v| v as f32 / 255.0).collect()
}

/// Multiply scaled values back into the 0-255 range
pub fn unscale_pixels(scaled: &[f32]) -> Vec<f32> {
    scaled.iter().map(|&v| v * 255.0).collect()
}
