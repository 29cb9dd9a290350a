//! Sparse categorical cross-entropy over probability scores
//!
//! The network ends in a sigmoid, so its two scores do not sum to one. They
//! are renormalized per row before the negative log-likelihood is taken,
//! the same treatment Keras applies to non-logit inputs.

use burn::tensor::{backend::Backend, Int, Tensor};

/// Clipping bound keeping `log` finite
pub const EPSILON: f32 = 1e-7;

/// Mean sparse categorical cross-entropy
///
/// # Arguments
/// * `scores` - Non-negative class scores of shape [batch_size, num_classes]
/// * `targets` - Class indices of shape [batch_size]
///
/// # Returns
/// * Single-element tensor holding the batch mean
pub fn sparse_categorical_crossentropy<B: Backend>(
    scores: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let [batch_size, _] = scores.dims();

    let totals = scores.clone().sum_dim(1);
    let probabilities = scores.div(totals).clamp(EPSILON, 1.0 - EPSILON);

    let picked = probabilities.gather(1, targets.reshape([batch_size, 1]));
    picked.log().neg().mean()
}
