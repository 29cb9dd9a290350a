//! Inference Predictor Module
//!
//! Runs a trained model on one image that went through exactly the same
//! preprocessing as the training data.

use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::tensor::backend::Backend;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::burn_dataset::FaceMaskBatcher;
use crate::dataset::preprocess::{load_image_array, ImageArray};
use crate::model::cnn::FaceMaskCnn;
use crate::utils::error::{FaceMaskError, Result};

/// Whether the person in an image wears a mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskVerdict {
    WearingMask,
    NotWearingMask,
}

impl MaskVerdict {
    /// Class 1 means a mask; any other index means no mask
    pub fn from_class_index(index: usize) -> Self {
        if index == 1 {
            MaskVerdict::WearingMask
        } else {
            MaskVerdict::NotWearingMask
        }
    }
}

impl std::fmt::Display for MaskVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskVerdict::WearingMask => write!(f, "The person in the image is wearing a mask"),
            MaskVerdict::NotWearingMask => {
                write!(f, "The person in the image is not wearing a mask")
            }
        }
    }
}

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Path to the input image (if applicable)
    pub image_path: Option<PathBuf>,

    /// Raw sigmoid score per class
    pub scores: Vec<f32>,

    /// Index of the highest score
    pub class_index: usize,

    /// Verdict derived from `class_index`
    pub verdict: MaskVerdict,

    /// Forward pass time in milliseconds
    pub inference_time_ms: f64,
}

impl Prediction {
    /// Build a prediction from raw scores
    pub fn from_scores(scores: Vec<f32>, image_path: Option<PathBuf>, inference_time_ms: f64) -> Self {
        let class_index = argmax(&scores);
        Self {
            image_path,
            class_index,
            verdict: MaskVerdict::from_class_index(class_index),
            scores,
            inference_time_ms,
        }
    }
}

/// Index of the largest value; the first one wins ties
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Runs single-image predictions with a trained model
pub struct Predictor<B: Backend> {
    model: FaceMaskCnn<B>,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Wrap a trained model; use a non-autodiff backend so dropout is off
    pub fn new(model: FaceMaskCnn<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Decode, resize and classify an image file
    pub fn predict_path(&self, path: &Path) -> Result<Prediction> {
        if !path.is_file() {
            return Err(FaceMaskError::PathNotFound(path.to_path_buf()));
        }

        let array = load_image_array(path)?;
        let mut prediction = self.predict_array(&array)?;
        prediction.image_path = Some(path.to_path_buf());
        Ok(prediction)
    }

    /// Classify an already decoded image
    pub fn predict_image(&self, image: &DynamicImage) -> Result<Prediction> {
        self.predict_array(&ImageArray::from_image(image))
    }

    /// Classify a preprocessed pixel array
    pub fn predict_array(&self, array: &ImageArray) -> Result<Prediction> {
        let start = Instant::now();

        // [1, 3, 128, 128]
        let input = FaceMaskBatcher::images::<B>(&[array], &self.device);
        let output = self.model.forward(input);

        let scores: Vec<f32> = output
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| FaceMaskError::Model(format!("{:?}", e)))?;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let prediction = Prediction::from_scores(scores, None, elapsed_ms);
        debug!(
            "Scores {:?} -> class {} in {:.1}ms",
            prediction.scores, prediction.class_index, elapsed_ms
        );

        Ok(prediction)
    }
}
