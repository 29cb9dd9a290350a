//! Face-Mask Dataset Loader
//!
//! Lists both class directories, assigns labels and decodes every image
//! into memory, positive class first.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::dataset::labels::{labels_for, ClassListing, ExpectedCounts};
use crate::dataset::preprocess::{load_image_array, ImageArray};
use crate::utils::error::{FaceMaskError, Result};
use crate::{NEGATIVE_CLASS_DIR, POSITIVE_CLASS_DIR};

/// Where the two class directories live on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    /// Directory holding `with_mask/` and `without_mask/`
    pub root: PathBuf,
}

impl DatasetLayout {
    /// Find the directory that contains both class folders
    ///
    /// The Kaggle archive extracts into `data/`, so both `root` and
    /// `root/data` are searched.
    pub fn locate(root: &Path) -> Result<Self> {
        for candidate in [root.to_path_buf(), root.join("data")] {
            if candidate.join(POSITIVE_CLASS_DIR).is_dir()
                && candidate.join(NEGATIVE_CLASS_DIR).is_dir()
            {
                debug!("Dataset layout found at {:?}", candidate);
                return Ok(Self { root: candidate });
            }
        }

        Err(FaceMaskError::Dataset(format!(
            "no '{}' and '{}' directories under {:?}",
            POSITIVE_CLASS_DIR, NEGATIVE_CLASS_DIR, root
        )))
    }

    /// Directory of images with a mask (label 1)
    pub fn positive_dir(&self) -> PathBuf {
        self.root.join(POSITIVE_CLASS_DIR)
    }

    /// Directory of images without a mask (label 0)
    pub fn negative_dir(&self) -> PathBuf {
        self.root.join(NEGATIVE_CLASS_DIR)
    }

    /// List both class directories
    pub fn listings(&self) -> Result<(ClassListing, ClassListing)> {
        let positive = ClassListing::read(&self.positive_dir(), 1)?;
        let negative = ClassListing::read(&self.negative_dir(), 0)?;
        Ok((positive, negative))
    }
}

/// A stack of decoded images with one label per image
#[derive(Debug, Clone, Default)]
pub struct LabeledImages {
    images: Vec<ImageArray>,
    labels: Vec<u8>,
}

impl LabeledImages {
    /// Pair images with labels; both must have the same length
    pub fn new(images: Vec<ImageArray>, labels: Vec<u8>) -> Result<Self> {
        if images.len() != labels.len() {
            return Err(FaceMaskError::LabelMismatch {
                labels: labels.len(),
                images: images.len(),
            });
        }
        Ok(Self { images, labels })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[ImageArray] {
        &self.images
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Number of images labelled `1`
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Split off the records from `at` onwards, keeping `[0, at)` in `self`
    pub fn split_off(&mut self, at: usize) -> Self {
        Self {
            images: self.images.split_off(at),
            labels: self.labels.split_off(at),
        }
    }

    /// Consume into the underlying vectors
    pub fn into_parts(self) -> (Vec<ImageArray>, Vec<u8>) {
        (self.images, self.labels)
    }
}

/// The loaded face-mask dataset
#[derive(Debug)]
pub struct FaceMaskDataset {
    /// Where the images were read from
    pub layout: DatasetLayout,
    /// Listing of `with_mask/`
    pub positive: ClassListing,
    /// Listing of `without_mask/`
    pub negative: ClassListing,
    /// Decoded images and their labels, positive class first
    pub data: LabeledImages,
}

impl FaceMaskDataset {
    /// List, label and decode every image under `layout`
    ///
    /// A corrupt or unreadable file aborts the load with an `ImageLoad` error.
    pub fn load(layout: DatasetLayout, expected: &ExpectedCounts) -> Result<Self> {
        info!("Loading face-mask dataset from: {:?}", layout.root);

        let (positive, negative) = layout.listings()?;
        expected.check_all(&positive, &negative)?;

        if positive.is_empty() || negative.is_empty() {
            return Err(FaceMaskError::Dataset(format!(
                "both classes need images ({}: {}, {}: {})",
                positive.class_name,
                positive.len(),
                negative.class_name,
                negative.len()
            )));
        }

        let labels = labels_for(&positive, &negative);
        let total = positive.len() + negative.len();

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
                .map_err(|e| FaceMaskError::Dataset(e.to_string()))?
                .progress_chars("#>-"),
        );

        let mut images = Vec::with_capacity(total);
        for path in positive.paths().chain(negative.paths()) {
            images.push(load_image_array(&path)?);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let data = LabeledImages::new(images, labels)?;
        info!(
            "Loaded {} images ({} with mask, {} without)",
            data.len(),
            positive.len(),
            negative.len()
        );

        Ok(Self {
            layout,
            positive,
            negative,
            data,
        })
    }
}
