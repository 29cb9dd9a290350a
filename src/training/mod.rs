//! Training module for the face-mask CNN
//!
//! This module provides:
//! - Sparse categorical cross-entropy over sigmoid scores
//! - The supervised training loop with per-epoch validation
//! - Per-epoch metric history
//! - Evaluation on held-out data

pub mod evaluate;
pub mod history;
pub mod loss;
pub mod supervised;

// Re-export main types for convenience
pub use evaluate::{evaluate, Evaluation};
pub use history::{EpochMetrics, TrainingHistory};
pub use loss::sparse_categorical_crossentropy;
pub use supervised::{fit, TrainingConfig};
