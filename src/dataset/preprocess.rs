//! Image Preprocessing
//!
//! Decodes image files into fixed-size RGB pixel arrays.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};

use crate::dataset::split::scale_pixels;
use crate::utils::error::{FaceMaskError, Result};
use crate::{CHANNELS, IMAGE_SIZE};

/// A decoded image as a `IMAGE_SIZE x IMAGE_SIZE x CHANNELS` array of `u8`
///
/// Pixels are stored row-major in HWC order, i.e. the value for row `y`,
/// column `x`, channel `c` lives at `(y * IMAGE_SIZE + x) * CHANNELS + c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageArray {
    pixels: Vec<u8>,
}

impl ImageArray {
    /// Number of values in one array
    pub const LEN: usize = IMAGE_SIZE * IMAGE_SIZE * CHANNELS;

    /// Wrap raw HWC pixel data, checking its length
    pub fn from_raw(pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != Self::LEN {
            return Err(FaceMaskError::InvalidInput(format!(
                "expected {} pixel values for a {}x{}x{} image, got {}",
                Self::LEN,
                IMAGE_SIZE,
                IMAGE_SIZE,
                CHANNELS,
                pixels.len()
            )));
        }
        Ok(Self { pixels })
    }

    /// Resize an already decoded image and force three channels
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb: RgbImage = image
            .resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::CatmullRom)
            .to_rgb8();

        // RgbImage is already row-major RGB, which is exactly the HWC layout
        Self {
            pixels: rgb.into_raw(),
        }
    }

    /// Array shape as `[height, width, channels]`
    pub fn shape(&self) -> [usize; 3] {
        [IMAGE_SIZE, IMAGE_SIZE, CHANNELS]
    }

    /// Value at row `y`, column `x`, channel `c`
    pub fn get(&self, y: usize, x: usize, c: usize) -> u8 {
        self.pixels[(y * IMAGE_SIZE + x) * CHANNELS + c]
    }

    /// Raw HWC values
    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    /// Scale to [0, 1] and reorder into the CHW layout Burn's conv layers expect
    pub fn to_chw_scaled(&self) -> Vec<f32> {
        hwc_to_chw(&scale_pixels(self))
    }
}

/// Reorder an HWC buffer of one image into CHW
pub fn hwc_to_chw(hwc: &[f32]) -> Vec<f32> {
    let plane = IMAGE_SIZE * IMAGE_SIZE;
    let mut chw = vec![0.0f32; CHANNELS * plane];

    for (i, pixel) in hwc.chunks_exact(CHANNELS).enumerate() {
        for (c, &value) in pixel.iter().enumerate() {
            chw[c * plane + i] = value;
        }
    }

    chw
}

/// Decode an image file into an `ImageArray`
///
/// The image is resized to `IMAGE_SIZE x IMAGE_SIZE` without preserving the
/// aspect ratio and converted to RGB regardless of its stored color type.
pub fn load_image_array(path: &Path) -> Result<ImageArray> {
    let image = ImageReader::open(path)
        .map_err(|e| FaceMaskError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .with_guessed_format()
        .map_err(|e| FaceMaskError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| FaceMaskError::ImageLoad(path.to_path_buf(), e.to_string()))?;

    Ok(ImageArray::from_image(&image))
}
