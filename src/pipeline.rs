//! End-to-end pipeline
//!
//! Wires the stages together: labeling, preprocessing, split, training,
//! evaluation, charts and an optional single-image prediction. Each stage
//! takes the previous stage's output by value; nothing is shared globally.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::config::Config;
use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use chrono::{DateTime, Local};
use tracing::info;

use crate::dataset::burn_dataset::FaceMaskBurnDataset;
use crate::dataset::labels::ExpectedCounts;
use crate::dataset::loader::{DatasetLayout, FaceMaskDataset};
use crate::dataset::split::{train_test_split, SplitConfig};
use crate::inference::{Prediction, Predictor};
use crate::model::cnn::FaceMaskCnnConfig;
use crate::training::{evaluate, fit, Evaluation, TrainingConfig, TrainingHistory};
use crate::utils::charts::plot_history;
use crate::utils::error::{FaceMaskError, Result};
use crate::IMAGE_SIZE;

/// Every tunable of a pipeline run
#[derive(Config, Debug)]
pub struct PipelineConfig {
    #[config(default = "FaceMaskCnnConfig::new()")]
    pub model: FaceMaskCnnConfig,

    #[config(default = "TrainingConfig::new()")]
    pub training: TrainingConfig,

    #[config(default = "SplitConfig::new()")]
    pub split: SplitConfig,

    #[config(default = "ExpectedCounts::new()")]
    pub expected_counts: ExpectedCounts,
}

impl PipelineConfig {
    /// Validate every nested configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.image_size != IMAGE_SIZE {
            return Err(FaceMaskError::Config(format!(
                "model.image_size must be {} to match preprocessing, got {}",
                IMAGE_SIZE, self.model.image_size
            )));
        }
        self.training.validate()?;
        self.split.validate()
    }

    /// Load from a JSON file; absent fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::load(path).map_err(|e| FaceMaskError::Config(format!("{:?}: {}", path, e)))
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct PipelineReport {
    /// Images found under `with_mask/`
    pub positive_count: usize,
    /// Images found under `without_mask/`
    pub negative_count: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub history: TrainingHistory,
    /// Loss and accuracy on the test partition
    pub evaluation: Evaluation,
    /// Loss and accuracy chart files
    pub charts: (PathBuf, PathBuf),
    /// Present when an input image was given
    pub prediction: Option<Prediction>,
    pub started_at: DateTime<Local>,
    pub elapsed_secs: f64,
}

/// Run stages 2 to 5 on an extracted dataset
///
/// # Arguments
/// * `config` - Pipeline configuration
/// * `data_dir` - Directory holding (possibly under `data/`) both class folders
/// * `input` - Optional image to classify after training
/// * `output_dir` - Where the two charts are written; nothing else lands there
/// * `device` - Device to train on
pub fn run_pipeline<B: AutodiffBackend>(
    config: &PipelineConfig,
    data_dir: &Path,
    input: Option<&Path>,
    output_dir: &Path,
    device: &B::Device,
) -> Result<PipelineReport> {
    let started_at = Local::now();
    let start = Instant::now();
    config.validate()?;

    if let Some(path) = input {
        if !path.is_file() {
            return Err(FaceMaskError::PathNotFound(path.to_path_buf()));
        }
    }

    fs::create_dir_all(output_dir)?;

    // Labeling and preprocessing
    let layout = DatasetLayout::locate(data_dir)?;
    info!("Run started at {}", started_at.format("%Y-%m-%d %H:%M:%S"));
    let dataset = FaceMaskDataset::load(layout, &config.expected_counts)?;
    let positive_count = dataset.positive.len();
    let negative_count = dataset.negative.len();

    let split = train_test_split(dataset.data, &config.split)?;
    let train_size = split.train.len();
    let test_size = split.test.len();

    // Training
    let model = config.model.init::<B>(device);
    let (model, history) = fit(model, split.train, &config.training, device)?;

    // Evaluation
    let model = model.valid();
    let test_dataset = FaceMaskBurnDataset::new(split.test);
    let evaluation = evaluate(&model, &test_dataset, config.training.batch_size, device)?;
    info!("Test {}", evaluation);

    let charts = plot_history(&history, output_dir)?;
    info!("Charts written to {:?} and {:?}", charts.0, charts.1);

    // Single-sample inference
    let prediction = match input {
        Some(path) => {
            let predictor = Predictor::new(model, device.clone());
            let prediction = predictor.predict_path(path)?;
            info!("{:?}: {}", path, prediction.verdict);
            Some(prediction)
        }
        None => None,
    };

    Ok(PipelineReport {
        positive_count,
        negative_count,
        train_size,
        test_size,
        history,
        evaluation,
        charts,
        prediction,
        started_at,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}
