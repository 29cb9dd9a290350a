//! Burn Dataset Integration
//!
//! Implements Burn's `Dataset` trait over in-memory labeled images and a
//! `Batcher` that scales pixels to [0, 1] and stacks them into NCHW tensors.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;

use crate::dataset::loader::LabeledImages;
use crate::dataset::preprocess::ImageArray;
use crate::{CHANNELS, IMAGE_SIZE, NUM_CLASSES};

/// A single face image ready for Burn
#[derive(Clone, Debug)]
pub struct FaceMaskItem {
    /// Raw 0-255 pixels; scaling happens at batch time
    pub image: ImageArray,
    /// 1 = wearing a mask, 0 = not wearing a mask
    pub label: u8,
}

/// In-memory dataset implementing Burn's Dataset trait
#[derive(Debug, Clone, Default)]
pub struct FaceMaskBurnDataset {
    items: Vec<FaceMaskItem>,
}

impl FaceMaskBurnDataset {
    /// Wrap a labeled image stack
    pub fn new(data: LabeledImages) -> Self {
        let (images, labels) = data.into_parts();
        let items = images
            .into_iter()
            .zip(labels)
            .map(|(image, label)| FaceMaskItem { image, label })
            .collect();

        Self { items }
    }

    /// Items at the given positions, skipping any out of range
    pub fn items_at(&self, indices: &[usize]) -> Vec<FaceMaskItem> {
        indices.iter().filter_map(|&i| self.get(i)).collect()
    }

    /// Count of items per class, indexed by label
    pub fn class_distribution(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for item in &self.items {
            counts[(item.label as usize).min(NUM_CLASSES - 1)] += 1;
        }
        counts
    }
}

impl Dataset<FaceMaskItem> for FaceMaskBurnDataset {
    fn get(&self, index: usize) -> Option<FaceMaskItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of face images for training or evaluation
#[derive(Clone, Debug)]
pub struct FaceMaskBatch<B: Backend> {
    /// Scaled images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher that turns items into scaled NCHW tensors
#[derive(Clone, Debug, Default)]
pub struct FaceMaskBatcher;

impl FaceMaskBatcher {
    /// Build the image tensor for a set of arrays
    pub fn images<B: Backend>(images: &[&ImageArray], device: &B::Device) -> Tensor<B, 4> {
        let data: Vec<f32> = images
            .iter()
            .flat_map(|image| image.to_chw_scaled())
            .collect();

        Tensor::<B, 4>::from_data(
            TensorData::new(data, [images.len(), CHANNELS, IMAGE_SIZE, IMAGE_SIZE]),
            device,
        )
    }
}

impl<B: Backend> Batcher<B, FaceMaskItem, FaceMaskBatch<B>> for FaceMaskBatcher {
    fn batch(&self, items: Vec<FaceMaskItem>, device: &B::Device) -> FaceMaskBatch<B> {
        let batch_size = items.len();

        let arrays: Vec<&ImageArray> = items.iter().map(|item| &item.image).collect();
        let images = Self::images::<B>(&arrays, device);

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(targets_data, [batch_size]),
            device,
        );

        FaceMaskBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn uniform(value: u8) -> ImageArray {
        ImageArray::from_raw(vec![value; ImageArray::LEN]).unwrap()
    }

    fn dataset() -> FaceMaskBurnDataset {
        let data = LabeledImages::new(vec![uniform(255), uniform(0), uniform(51)], vec![1, 0, 0])
            .unwrap();
        FaceMaskBurnDataset::new(data)
    }

    #[test]
    fn test_dataset_len_and_get() {
        let ds = dataset();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.get(0).unwrap().label, 1);
        assert!(ds.get(3).is_none());
        assert_eq!(ds.class_distribution(), [2, 1]);
        assert_eq!(ds.items_at(&[2, 7]).len(), 1);
    }

    #[test]
    fn test_batch_shapes_and_scaling() {
        let device = <TestBackend as Backend>::Device::default();
        let ds = dataset();
        let items = ds.items_at(&[0, 1, 2]);

        let batch: FaceMaskBatch<TestBackend> = FaceMaskBatcher.batch(items, &device);
        assert_eq!(batch.images.dims(), [3, 3, 128, 128]);
        assert_eq!(batch.targets.dims(), [3]);

        let max: f32 = batch.images.clone().max().into_scalar();
        let min: f32 = batch.images.clone().min().into_scalar();
        assert_eq!(max, 1.0);
        assert_eq!(min, 0.0);

        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![1, 0, 0]);
    }
}
