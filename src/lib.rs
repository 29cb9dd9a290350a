//! # Face-Mask CNN
//!
//! A Rust library that trains a small convolutional network to tell whether the
//! person in a photo is wearing a face mask, built on the Burn framework.
//!
//! ## Pipeline
//!
//! 1. **Acquisition**: download and extract the Kaggle face-mask archive
//! 2. **Labeling**: `with_mask/` images get label 1, `without_mask/` images label 0
//! 3. **Preprocessing**: decode, resize to 128x128 RGB, split 80/20, scale to [0, 1]
//! 4. **Training**: two conv/pool blocks and three dense layers, Adam, 5 epochs
//! 5. **Evaluation**: test loss/accuracy, training curves and a single prediction
//!
//! ## Modules
//!
//! - `dataset`: Acquisition, labeling, decoding and splitting
//! - `model`: CNN architecture built with Burn
//! - `training`: Loss, training loop, history and evaluation
//! - `inference`: Single-image prediction and the mask verdict
//! - `pipeline`: Configuration and orchestration of the five stages
//! - `utils`: Logging, charts and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use facemask_cnn::backend::{default_device, TrainingBackend};
//! use facemask_cnn::pipeline::{run_pipeline, PipelineConfig};
//!
//! let report = run_pipeline::<TrainingBackend>(
//!     &PipelineConfig::new(),
//!     "data".as_ref(),
//!     Some("face.jpg".as_ref()),
//!     "output".as_ref(),
//!     &default_device(),
//! )?;
//! println!("{}", report.evaluation.accuracy);
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod pipeline;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::labels::ExpectedCounts;
pub use dataset::loader::{DatasetLayout, FaceMaskDataset, LabeledImages};
pub use dataset::preprocess::{load_image_array, ImageArray};
pub use dataset::split::{train_test_split, DatasetSplit, SplitConfig};
pub use dataset::{FaceMaskBatch, FaceMaskBatcher, FaceMaskBurnDataset, FaceMaskItem};
pub use inference::{MaskVerdict, Prediction, Predictor};
pub use model::cnn::{FaceMaskCnn, FaceMaskCnnConfig};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineReport};
pub use training::{Evaluation, TrainingConfig, TrainingHistory};
pub use utils::error::{FaceMaskError, Result};

/// Side length of every preprocessed image
pub const IMAGE_SIZE: usize = 128;

/// RGB
pub const CHANNELS: usize = 3;

/// Mask / no mask
pub const NUM_CLASSES: usize = 2;

/// Directory of the positive class (label 1)
pub const POSITIVE_CLASS_DIR: &str = "with_mask";

/// Directory of the negative class (label 0)
pub const NEGATIVE_CLASS_DIR: &str = "without_mask";

/// Kaggle reference of the face-mask dataset
pub const DATASET_REF: &str = "omkargurav/face-mask-dataset";

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
