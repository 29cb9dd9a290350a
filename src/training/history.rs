//! Per-epoch training metrics

use serde::{Deserialize, Serialize};

/// Metrics recorded at the end of one epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Mean training loss over the epoch
    pub loss: f64,
    /// Training accuracy in [0, 1]
    pub accuracy: f64,
    /// Loss on the validation slice
    pub val_loss: f64,
    /// Accuracy on the validation slice in [0, 1]
    pub val_accuracy: f64,
}

/// One series per metric, one entry per epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    pub accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
}

impl TrainingHistory {
    /// Append the metrics of a finished epoch
    pub fn push(&mut self, metrics: EpochMetrics) {
        self.loss.push(metrics.loss);
        self.accuracy.push(metrics.accuracy);
        self.val_loss.push(metrics.val_loss);
        self.val_accuracy.push(metrics.val_accuracy);
    }

    /// Number of recorded epochs
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    /// Metrics of the last recorded epoch
    pub fn last(&self) -> Option<EpochMetrics> {
        let i = self.epochs().checked_sub(1)?;
        Some(EpochMetrics {
            loss: self.loss[i],
            accuracy: self.accuracy[i],
            val_loss: self.val_loss[i],
            val_accuracy: self.val_accuracy[i],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_last() {
        let mut history = TrainingHistory::default();
        assert!(history.last().is_none());

        history.push(EpochMetrics {
            loss: 0.6,
            accuracy: 0.7,
            val_loss: 0.5,
            val_accuracy: 0.75,
        });
        history.push(EpochMetrics {
            loss: 0.3,
            accuracy: 0.9,
            val_loss: 0.35,
            val_accuracy: 0.88,
        });

        assert_eq!(history.epochs(), 2);
        assert_eq!(history.val_loss, vec![0.5, 0.35]);
        assert_eq!(history.last().unwrap().accuracy, 0.9);
    }
}
