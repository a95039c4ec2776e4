//! Image decoding and tensor preparation.

use crate::constants::preprocess::{MEAN, STD};
use crate::error::{Error, Result};
use image::imageops::FilterType;
use image::{ImageReader, RgbImage};
use std::path::Path;

/// Normalized NCHW float tensor for a single image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    side: usize,
}

impl ImageTensor {
    /// Build a tensor from an RGB image.
    ///
    /// The image is resized to `resize`×`resize`, center-cropped to
    /// `crop`×`crop`, scaled to `[0, 1]` and normalized per channel.
    pub fn from_rgb(image: &RgbImage, resize: u32, crop: u32) -> Self {
        let resized = image::imageops::resize(image, resize, resize, FilterType::Triangle);
        let offset = resize.saturating_sub(crop) / 2;
        let cropped = image::imageops::crop_imm(&resized, offset, offset, crop, crop).to_image();

        let side = crop as usize;
        let plane = side * side;
        let mut data = vec![0.0f32; 3 * plane];

        for (x, y, pixel) in cropped.enumerate_pixels() {
            let index = y as usize * side + x as usize;
            for channel in 0..3 {
                let value = f32::from(pixel.0[channel]) / 255.0;
                data[channel * plane + index] = (value - MEAN[channel]) / STD[channel];
            }
        }

        Self { data, side }
    }

    /// All-zero tensor of the given side length.
    pub fn zeros(side: usize) -> Self {
        Self {
            data: vec![0.0; 3 * side * side],
            side,
        }
    }

    /// Tensor shape `[batch, channels, height, width]`.
    pub const fn shape(&self) -> [usize; 4] {
        [1, 3, self.side, self.side]
    }

    /// Flat tensor data in NCHW order.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Decode the image at `path` into the classifier's input format.
pub fn decode_image(path: &Path, resize: u32, crop: u32) -> Result<ImageTensor> {
    let decode_error = |source| Error::ImageDecode {
        path: path.to_path_buf(),
        source,
    };
    let image = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| decode_error(image::ImageError::IoError(e)))?
        .decode()
        .map_err(decode_error)?;

    Ok(ImageTensor::from_rgb(&image.to_rgb8(), resize, crop))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_shape_and_length() {
        let image = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
        let tensor = ImageTensor::from_rgb(&image, 256, 224);
        assert_eq!(tensor.shape(), [1, 3, 224, 224]);
        assert_eq!(tensor.data().len(), 3 * 224 * 224);
    }

    #[test]
    fn test_uniform_image_normalizes_per_channel() {
        let image = RgbImage::from_pixel(64, 64, Rgb([255, 0, 255]));
        let tensor = ImageTensor::from_rgb(&image, 32, 16);
        let plane = 16 * 16;

        let red = (1.0 - MEAN[0]) / STD[0];
        let green = (0.0 - MEAN[1]) / STD[1];
        assert!((tensor.data()[0] - red).abs() < 1e-5);
        assert!((tensor.data()[plane] - green).abs() < 1e-5);
        assert!((tensor.data()[3 * plane - 1] - (1.0 - MEAN[2]) / STD[2]).abs() < 1e-5);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let image = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 90]));
        image.save(&path).unwrap();

        let first = decode_image(&path, 32, 24).unwrap();
        let second = decode_image(&path, 32, 24).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_garbage_is_image_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"\xFF\xD8\xFFnot really a jpeg").unwrap();

        assert!(matches!(
            decode_image(&path, 32, 24),
            Err(Error::ImageDecode { .. })
        ));
    }

    #[test]
    fn test_zeros() {
        let tensor = ImageTensor::zeros(8);
        assert_eq!(tensor.shape(), [1, 3, 8, 8]);
        assert!(tensor.data().iter().all(|v| *v == 0.0));
    }
}
