//! Error Handling Module
//!
//! Defines the error type shared by every pipeline stage.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the face-mask pipeline
#[derive(Error, Debug)]
pub enum FaceMaskError {
    /// Error decoding or resizing an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with dataset layout or contents
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Labels and images no longer line up by position
    #[error("Label mismatch: {labels} labels for {images} images")]
    LabelMismatch { labels: usize, images: usize },

    /// Directory listing disagrees with the published class sizes
    #[error("Count mismatch for '{class}': expected {expected}, found {found}")]
    CountMismatch {
        class: String,
        expected: usize,
        found: usize,
    },

    /// Kaggle credential file missing or malformed
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Download failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Archive could not be read or extracted
    #[error("Archive error: {0}")]
    Archive(String),

    /// Error with model operations
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

impl From<serde_json::Error> for FaceMaskError {
    fn from(err: serde_json::Error) -> Self {
        FaceMaskError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for FaceMaskError {
    fn from(err: reqwest::Error) -> Self {
        FaceMaskError::Http(err.to_string())
    }
}

impl From<zip::result::ZipError> for FaceMaskError {
    fn from(err: zip::result::ZipError) -> Self {
        FaceMaskError::Archive(err.to_string())
    }
}

/// Convenience Result type for pipeline operations
pub type Result<T, E = FaceMaskError> = std::result::Result<T, E>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| FaceMaskError::InvalidInput(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| FaceMaskError::InvalidInput(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| FaceMaskError::InvalidInput(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| FaceMaskError::InvalidInput(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FaceMaskError::Dataset("no class directories".to_string());
        assert_eq!(format!("{}", err), "Dataset error: no class directories");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/data/with_mask/with_mask_1.jpg");
        let err = FaceMaskError::ImageLoad(path, "truncated file".to_string());
        assert!(format!("{}", err).contains("with_mask_1.jpg"));
    }

    #[test]
    fn test_count_mismatch_display() {
        let err = FaceMaskError::CountMismatch {
            class: "with_mask".to_string(),
            expected: 3725,
            found: 3700,
        };
        assert_eq!(
            err.to_string(),
            "Count mismatch for 'with_mask': expected 3725, found 3700"
        );
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<i32, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"));

        let with_context = result.context("Failed to read file");
        assert!(matches!(with_context, Err(FaceMaskError::InvalidInput(_))));
    }

    #[test]
    fn test_json_error_is_config_error() {
        let parsed: Result<Vec<u32>> = serde_json::from_str("[1, 2,").map_err(FaceMaskError::from);
        assert!(matches!(parsed, Err(FaceMaskError::Config(_))));
    }

    #[test]
    fn test_result_alias_takes_explicit_error() {
        let parsed: Result<u8, std::num::ParseIntError> = "300".parse();
        assert!(parsed.is_err());
        let ok: Result<u8> = Ok(7);
        assert_eq!(ok.unwrap(), 7);
    }

    #[test]
    fn test_option_context() {
        let opt: Option<i32> = None;
        assert!(opt.context("Value was None").is_err());
    }
}
