//! Supervised Training Implementation
//!
//! A custom training loop over Burn's autodiff backend: seeded epoch
//! shuffling, Adam updates per mini-batch and a validation pass on the
//! inner backend after every epoch.

use burn::{
    config::Config,
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::dataset::burn_dataset::{FaceMaskBatch, FaceMaskBatcher, FaceMaskBurnDataset};
use crate::dataset::loader::LabeledImages;
use crate::dataset::split::validation_split;
use crate::model::cnn::FaceMaskCnn;
use crate::training::evaluate::evaluate;
use crate::training::history::{EpochMetrics, TrainingHistory};
use crate::training::loss::sparse_categorical_crossentropy;
use crate::utils::error::{FaceMaskError, Result};
use crate::utils::logging::TrainingLogger;

/// Training hyperparameters
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Number of passes over the training slice
    #[config(default = "5")]
    pub epochs: usize,

    /// Mini-batch size
    #[config(default = "32")]
    pub batch_size: usize,

    /// Adam learning rate
    #[config(default = "1e-3")]
    pub learning_rate: f64,

    /// Adam first moment decay
    #[config(default = "0.9")]
    pub beta_1: f32,

    /// Adam second moment decay
    #[config(default = "0.999")]
    pub beta_2: f32,

    /// Adam numerical stability term
    #[config(default = "1e-7")]
    pub epsilon: f32,

    /// Tail fraction of the training partition held out for validation
    #[config(default = "0.1")]
    pub validation_fraction: f64,

    /// Seed of the per-epoch shuffle
    #[config(default = "2")]
    pub shuffle_seed: u64,
}

impl TrainingConfig {
    /// Validate the hyperparameters
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(FaceMaskError::Config("epochs must be positive".to_string()));
        }
        if self.batch_size == 0 {
            return Err(FaceMaskError::Config("batch_size must be positive".to_string()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(FaceMaskError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(FaceMaskError::Config(format!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        Ok(())
    }
}

/// Train `model` on `train`, holding out its tail for validation
///
/// # Type Parameters
/// * `B` - The autodiff backend to use (e.g., `Autodiff<NdArray>`)
///
/// # Returns
/// The trained model and the per-epoch metrics.
pub fn fit<B: AutodiffBackend>(
    mut model: FaceMaskCnn<B>,
    train: LabeledImages,
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<(FaceMaskCnn<B>, TrainingHistory)> {
    config.validate()?;

    let (train, validation) = validation_split(train, config.validation_fraction)?;
    if train.is_empty() || validation.is_empty() {
        return Err(FaceMaskError::Dataset(format!(
            "training partition too small: {} train / {} validation records",
            train.len(),
            validation.len()
        )));
    }

    info!(
        "Training on {} samples, validating on {} samples",
        train.len(),
        validation.len()
    );

    let train_dataset = FaceMaskBurnDataset::new(train);
    let val_dataset = FaceMaskBurnDataset::new(validation);
    let [negatives, positives] = train_dataset.class_distribution();
    debug!("Training slice: {} with mask, {} without", positives, negatives);
    let batcher = FaceMaskBatcher;

    let mut optimizer = AdamConfig::new()
        .with_beta_1(config.beta_1)
        .with_beta_2(config.beta_2)
        .with_epsilon(config.epsilon)
        .init();

    let mut history = TrainingHistory::default();
    let mut logger = TrainingLogger::new(config.epochs);
    let mut epoch_rng = ChaCha8Rng::seed_from_u64(config.shuffle_seed);

    let mut indices: Vec<usize> = (0..train_dataset.len()).collect();
    let num_batches = indices.len().div_ceil(config.batch_size);

    for epoch in 0..config.epochs {
        logger.start_epoch(epoch);
        indices.shuffle(&mut epoch_rng);

        let pb = ProgressBar::new(num_batches as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Epoch {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| FaceMaskError::Model(e.to_string()))?
                .progress_chars("=>-"),
        );
        pb.set_prefix(format!("{}/{}", epoch + 1, config.epochs));

        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;

        for batch_indices in indices.chunks(config.batch_size) {
            let items = train_dataset.items_at(batch_indices);
            let batch: FaceMaskBatch<B> = batcher.batch(items, device);
            let [batch_size] = batch.targets.dims();

            let scores = model.forward(batch.images);
            let predictions = scores.clone().argmax(1).reshape([batch_size]);
            let batch_correct: i64 = predictions
                .equal(batch.targets.clone())
                .int()
                .sum()
                .into_scalar()
                .elem();

            let loss = sparse_categorical_crossentropy(scores, batch.targets);
            let loss_value: f64 = loss.clone().into_scalar().elem();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(config.learning_rate, model, grads);

            loss_sum += loss_value * batch_size as f64;
            correct += batch_correct as usize;
            seen += batch_size;

            pb.set_message(format!(
                "loss: {:.4} acc: {:.4}",
                loss_sum / seen as f64,
                correct as f64 / seen as f64
            ));
            pb.inc(1);
        }
        pb.finish_and_clear();

        let validation = evaluate(&model.valid(), &val_dataset, config.batch_size, device)?;

        let metrics = EpochMetrics {
            loss: loss_sum / seen.max(1) as f64,
            accuracy: correct as f64 / seen.max(1) as f64,
            val_loss: validation.loss,
            val_accuracy: validation.accuracy,
        };
        logger.end_epoch(&metrics);
        history.push(metrics);
    }

    let elapsed = logger.log_complete();
    debug!("fit finished after {:.1}s", elapsed);

    Ok((model, history))
}
