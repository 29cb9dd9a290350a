//! Single-image inference and the mask verdict

pub mod predictor;

// Re-export main types for convenience
pub use predictor::{argmax, MaskVerdict, Prediction, Predictor};
