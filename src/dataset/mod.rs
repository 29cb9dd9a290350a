//! Dataset module for face-mask data handling
//!
//! This module provides functionality for:
//! - Downloading and extracting the Kaggle archive
//! - Listing the two class directories and assigning labels
//! - Decoding images into fixed-size pixel arrays
//! - Splitting into train/test partitions and scaling pixels
//!
//! ## Labeling
//!
//! Labels come from the directory an image sits in:
//! `with_mask/` is class 1, `without_mask/` is class 0. Positive images
//! always come first in the stacked dataset.

pub mod burn_dataset;
pub mod download;
pub mod labels;
pub mod loader;
pub mod preprocess;
pub mod split;

// Re-export main types for convenience
pub use burn_dataset::{FaceMaskBatch, FaceMaskBatcher, FaceMaskBurnDataset, FaceMaskItem};
pub use download::{download_dataset, extract_archive, fetch_dataset, DatasetRef, KaggleCredentials};
pub use labels::{assign_labels, ClassListing, ExpectedCounts};
pub use loader::{DatasetLayout, FaceMaskDataset, LabeledImages};
pub use preprocess::{load_image_array, ImageArray};
pub use split::{scale_pixels, train_test_split, validation_split, DatasetSplit, SplitConfig};
