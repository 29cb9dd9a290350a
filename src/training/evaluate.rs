//! Model evaluation on a held-out set

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::{backend::Backend, ElementConversion};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::burn_dataset::{FaceMaskBatch, FaceMaskBatcher, FaceMaskBurnDataset};
use crate::model::cnn::FaceMaskCnn;
use crate::training::loss::sparse_categorical_crossentropy;
use crate::utils::error::{FaceMaskError, Result};

/// Loss and accuracy over a dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Sample-weighted mean loss
    pub loss: f64,
    /// Fraction of correct predictions in [0, 1]
    pub accuracy: f64,
    /// Number of evaluated samples
    pub samples: usize,
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "loss: {:.4} | accuracy: {:.2}% ({} samples)",
            self.loss,
            self.accuracy * 100.0,
            self.samples
        )
    }
}

/// Summed loss and correct count of one batch
fn batch_stats<B: Backend>(model: &FaceMaskCnn<B>, batch: FaceMaskBatch<B>) -> (f64, usize) {
    let [batch_size] = batch.targets.dims();
    let scores = model.forward(batch.images);

    let predictions = scores.clone().argmax(1).reshape([batch_size]);
    let correct: i64 = predictions
        .equal(batch.targets.clone())
        .int()
        .sum()
        .into_scalar()
        .elem();

    let loss: f64 = sparse_categorical_crossentropy(scores, batch.targets)
        .into_scalar()
        .elem();

    (loss * batch_size as f64, correct as usize)
}

/// Evaluate `model` on every item of `dataset`
///
/// Pass a model on a non-autodiff backend (e.g. `model.valid()`) so dropout
/// is inactive.
pub fn evaluate<B: Backend>(
    model: &FaceMaskCnn<B>,
    dataset: &FaceMaskBurnDataset,
    batch_size: usize,
    device: &B::Device,
) -> Result<Evaluation> {
    let len = dataset.len();
    if len == 0 {
        return Err(FaceMaskError::Dataset("cannot evaluate an empty dataset".to_string()));
    }
    if batch_size == 0 {
        return Err(FaceMaskError::Config("batch_size must be positive".to_string()));
    }

    let batcher = FaceMaskBatcher;
    let mut loss_sum = 0.0f64;
    let mut correct = 0usize;
    let mut total = 0usize;

    for start in (0..len).step_by(batch_size) {
        let end = (start + batch_size).min(len);
        let items: Vec<_> = (start..end).filter_map(|i| dataset.get(i)).collect();
        if items.is_empty() {
            continue;
        }

        total += items.len();
        let batch: FaceMaskBatch<B> = batcher.batch(items, device);
        let (batch_loss, batch_correct) = batch_stats(model, batch);
        loss_sum += batch_loss;
        correct += batch_correct;
    }

    let evaluation = Evaluation {
        loss: loss_sum / total as f64,
        accuracy: correct as f64 / total as f64,
        samples: total,
    };
    debug!("Evaluation: {}", evaluation);

    Ok(evaluation)
}
