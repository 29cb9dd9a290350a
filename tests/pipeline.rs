//! End-to-end run over a small synthetic two-class dataset

use std::fs;
use std::path::Path;

use burn::backend::Autodiff;
use burn::tensor::backend::Backend;
use burn_ndarray::NdArray;
use image::{Rgb, RgbImage};

use facemask_cnn::dataset::labels::assign_labels;
use facemask_cnn::dataset::loader::{DatasetLayout, FaceMaskDataset};
use facemask_cnn::inference::MaskVerdict;
use facemask_cnn::pipeline::{run_pipeline, PipelineConfig};
use facemask_cnn::training::TrainingConfig;
use facemask_cnn::utils::charts::{ACCURACY_CHART_FILE, LOSS_CHART_FILE};
use facemask_cnn::{ExpectedCounts, FaceMaskError, NEGATIVE_CLASS_DIR, POSITIVE_CLASS_DIR};

type TestBackend = Autodiff<NdArray>;

fn write_class(root: &Path, class: &str, n: usize, color: [u8; 3]) {
    let dir = root.join(class);
    fs::create_dir_all(&dir).unwrap();
    for i in 0..n {
        RgbImage::from_pixel(20 + i as u32, 16, Rgb(color))
            .save(dir.join(format!("{}_{:02}.png", class, i)))
            .unwrap();
    }
}

fn synthetic_dataset(root: &Path) {
    // The archive layout nests both classes under data/
    let data = root.join("data");
    write_class(&data, POSITIVE_CLASS_DIR, 12, [40, 160, 220]);
    write_class(&data, NEGATIVE_CLASS_DIR, 12, [210, 150, 120]);
}

fn quick_config() -> PipelineConfig {
    PipelineConfig::new().with_training(TrainingConfig::new().with_epochs(1).with_batch_size(8))
}

#[test]
fn test_labels_follow_directory_order() {
    let dir = tempfile::tempdir().unwrap();
    synthetic_dataset(dir.path());

    let layout = DatasetLayout::locate(dir.path()).unwrap();
    let dataset = FaceMaskDataset::load(layout, &ExpectedCounts::new()).unwrap();

    assert_eq!(dataset.data.labels(), assign_labels(12, 12).as_slice());
    // Bicubic resampling of a flat color may drift by one step
    assert!(dataset.data.images()[0].get(3, 3, 2).abs_diff(220) <= 1);
    assert!(dataset.data.images()[23].get(3, 3, 0).abs_diff(210) <= 1);
}

#[test]
fn test_full_pipeline_on_synthetic_data() {
    let dir = tempfile::tempdir().unwrap();
    synthetic_dataset(dir.path());

    let input = dir.path().join("face.png");
    RgbImage::from_pixel(64, 80, Rgb([40, 160, 220]))
        .save(&input)
        .unwrap();

    let output_dir = dir.path().join("output");
    let device = Default::default();
    let report = run_pipeline::<TestBackend>(
        &quick_config(),
        dir.path(),
        Some(&input),
        &output_dir,
        &device,
    )
    .unwrap();

    assert_eq!(report.positive_count, 12);
    assert_eq!(report.negative_count, 12);
    // ceil(0.2 * 24) = 5
    assert_eq!(report.test_size, 5);
    assert_eq!(report.train_size, 19);

    assert_eq!(report.history.epochs(), 1);
    assert_eq!(report.evaluation.samples, 5);
    assert!((0.0..=1.0).contains(&report.evaluation.accuracy));
    assert!(report.evaluation.loss.is_finite());

    assert!(output_dir.join(LOSS_CHART_FILE).is_file());
    assert!(output_dir.join(ACCURACY_CHART_FILE).is_file());
    // The charts are the only files a run writes
    let mut written: Vec<String> = fs::read_dir(&output_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    written.sort();
    assert_eq!(written, vec![ACCURACY_CHART_FILE, LOSS_CHART_FILE]);

    let prediction = report.prediction.unwrap();
    assert_eq!(prediction.scores.len(), 2);
    assert!(prediction.class_index < 2);
    assert_eq!(
        prediction.verdict,
        MaskVerdict::from_class_index(prediction.class_index)
    );
}

#[test]
fn test_trained_pipeline_recognises_masked_colour() {
    let dir = tempfile::tempdir().unwrap();
    synthetic_dataset(dir.path());

    let input = dir.path().join("masked.png");
    RgbImage::from_pixel(48, 48, Rgb([40, 160, 220]))
        .save(&input)
        .unwrap();

    let config = PipelineConfig::new()
        .with_training(TrainingConfig::new().with_epochs(8).with_batch_size(4));

    let device = Default::default();
    TestBackend::seed(7);
    let report = run_pipeline::<TestBackend>(
        &config,
        dir.path(),
        Some(&input),
        &dir.path().join("output"),
        &device,
    )
    .unwrap();

    let prediction = report.prediction.unwrap();
    assert_eq!(prediction.class_index, 1);
    assert_eq!(
        prediction.verdict.to_string(),
        "The person in the image is wearing a mask"
    );
}

#[test]
fn test_pipeline_rejects_missing_input_image() {
    let dir = tempfile::tempdir().unwrap();
    synthetic_dataset(dir.path());

    let device = Default::default();
    let result = run_pipeline::<TestBackend>(
        &quick_config(),
        dir.path(),
        Some(&dir.path().join("missing.jpg")),
        &dir.path().join("output"),
        &device,
    );

    assert!(matches!(result, Err(FaceMaskError::PathNotFound(_))));
}

#[test]
fn test_pipeline_strict_counts_abort() {
    let dir = tempfile::tempdir().unwrap();
    synthetic_dataset(dir.path());

    let config = quick_config().with_expected_counts(ExpectedCounts::new().with_strict(true));
    let device = Default::default();
    let result = run_pipeline::<TestBackend>(
        &config,
        dir.path(),
        None,
        &dir.path().join("output"),
        &device,
    );

    assert!(matches!(result, Err(FaceMaskError::CountMismatch { .. })));
}
