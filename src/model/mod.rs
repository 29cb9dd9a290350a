//! Model module for the face-mask CNN
//!
//! ## Architecture
//!
//! A small two-block convolutional network with a dense classifier head,
//! trained from scratch on 128x128 RGB images.

pub mod cnn;

// Re-export main types for convenience
pub use cnn::{FaceMaskCnn, FaceMaskCnnConfig};
