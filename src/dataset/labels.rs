//! Class listings and label assignment
//!
//! Labels come purely from directory membership: every file under the
//! positive directory gets `1`, every file under the negative directory `0`.

use std::path::{Path, PathBuf};

use burn::config::Config;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::utils::error::{FaceMaskError, Result};

/// Image file extensions picked up by the listing
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Number of filenames/labels shown at each end of a preview
pub const PREVIEW_LEN: usize = 5;

/// The published size of each class in the Kaggle face-mask dataset
#[derive(Config, Debug, PartialEq, Eq)]
pub struct ExpectedCounts {
    /// Images under `with_mask/`
    #[config(default = "3725")]
    pub with_mask: usize,

    /// Images under `without_mask/`
    #[config(default = "3828")]
    pub without_mask: usize,

    /// Fail instead of warning when a listing disagrees
    #[config(default = "false")]
    pub strict: bool,
}

/// The files of one class directory, in listing order
#[derive(Debug, Clone)]
pub struct ClassListing {
    /// Directory name (e.g. `with_mask`)
    pub class_name: String,
    /// Directory the files live in
    pub dir: PathBuf,
    /// File names relative to `dir`, sorted
    pub files: Vec<String>,
    /// Label every file in this directory receives
    pub label: u8,
}

impl ClassListing {
    /// List a class directory and attach its label
    pub fn read(dir: &Path, label: u8) -> Result<Self> {
        let class_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let files = list_class_files(dir)?;
        debug!("Class '{}' (label {}): {} files", class_name, label, files.len());

        Ok(Self {
            class_name,
            dir: dir.to_path_buf(),
            files,
            label,
        })
    }

    /// Number of files in the class
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the directory held no images
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Full paths of every file, in listing order
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(move |f| self.dir.join(f))
    }

    /// First and last `PREVIEW_LEN` file names
    pub fn preview(&self) -> (&[String], &[String]) {
        preview(&self.files)
    }
}

/// List the image files directly inside `dir`, sorted by name
///
/// Sorting makes the image/label order reproducible across filesystems.
pub fn list_class_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(FaceMaskError::PathNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| FaceMaskError::Dataset(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_image = path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                IMAGE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false);

        if is_image {
            files.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    files.sort();
    Ok(files)
}

/// Build the label sequence: `positive` ones followed by `negative` zeros
pub fn assign_labels(positive: usize, negative: usize) -> Vec<u8> {
    let mut labels = vec![1u8; positive];
    labels.extend(std::iter::repeat(0u8).take(negative));
    labels
}

/// Labels for a positive and a negative listing, in concatenation order
pub fn labels_for(positive: &ClassListing, negative: &ClassListing) -> Vec<u8> {
    assign_labels(positive.len(), negative.len())
}

/// First and last `PREVIEW_LEN` items of a slice
pub fn preview<T>(items: &[T]) -> (&[T], &[T]) {
    let head = &items[..items.len().min(PREVIEW_LEN)];
    let tail = &items[items.len().saturating_sub(PREVIEW_LEN)..];
    (head, tail)
}

impl ExpectedCounts {
    /// Compare a listing against the published count for its class
    ///
    /// Mismatches are logged; in strict mode they become an error.
    pub fn check(&self, listing: &ClassListing, expected: usize) -> Result<()> {
        if listing.len() == expected {
            return Ok(());
        }

        if self.strict {
            return Err(FaceMaskError::CountMismatch {
                class: listing.class_name.clone(),
                expected,
                found: listing.len(),
            });
        }

        warn!(
            "'{}' holds {} images but the published dataset has {}; labels follow the listing",
            listing.class_name,
            listing.len(),
            expected
        );
        Ok(())
    }

    /// Check both class listings
    pub fn check_all(&self, positive: &ClassListing, negative: &ClassListing) -> Result<()> {
        self.check(positive, self.with_mask)?;
        self.check(negative, self.without_mask)
    }
}
