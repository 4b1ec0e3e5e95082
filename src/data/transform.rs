//! Image preprocessing for GAN training
//!
//! Images are brought to a fixed square resolution and mapped to the [-1, 1]
//! range expected by a generator with a tanh output.

use std::path::Path;

use image::{imageops, imageops::FilterType, DynamicImage, RgbImage};
use ndarray::Array3;
use tch::Tensor;

use crate::error::{DcganError, Result};

/// Map an 8-bit channel value to [-1, 1]
///
/// Formula: x_norm = (x / 255 - 0.5) / 0.5
pub fn normalize_pixel(value: u8) -> f32 {
    (value as f32 / 255.0 - 0.5) / 0.5
}

/// Map a value in [-1, 1] back to an 8-bit channel, clamping out-of-range input
pub fn denormalize_pixel(value: f32) -> u8 {
    (((value + 1.0) / 2.0).clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Resize, center-crop and normalize decoded images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransform {
    image_size: u32,
}

impl ImageTransform {
    pub fn new(image_size: u32) -> Self {
        Self { image_size }
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Decode an image file and apply the transform
    pub fn load(&self, path: &Path) -> Result<Array3<f32>> {
        let img = image::open(path).map_err(|source| DcganError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.apply(&img))
    }

    /// Transform a decoded image into a (3, size, size) array in [-1, 1]
    pub fn apply(&self, img: &DynamicImage) -> Array3<f32> {
        let rgb = img.to_rgb8();
        let resized = resize_shorter_side(&rgb, self.image_size);
        let cropped = center_crop(&resized, self.image_size);
        to_chw(&cropped)
    }
}

/// Resize so the shorter side equals `size`, keeping the aspect ratio
fn resize_shorter_side(img: &RgbImage, size: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let (new_w, new_h) = if w <= h {
        (size, ((h as f64 * size as f64 / w as f64) as u32).max(size))
    } else {
        (((w as f64 * size as f64 / h as f64) as u32).max(size), size)
    };

    if (new_w, new_h) == (w, h) {
        return img.clone();
    }
    imageops::resize(img, new_w, new_h, FilterType::Triangle)
}

/// Crop the central `size` x `size` square
fn center_crop(img: &RgbImage, size: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let x = w.saturating_sub(size) / 2;
    let y = h.saturating_sub(size) / 2;
    imageops::crop_imm(img, x, y, size.min(w), size.min(h)).to_image()
}

/// Convert an RGB image into a normalized channels-first array
pub fn to_chw(img: &RgbImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    Array3::from_shape_fn((3, h as usize, w as usize), |(c, y, x)| {
        normalize_pixel(img.get_pixel(x as u32, y as u32)[c])
    })
}

/// Resize an in-memory batch in [0, 1] to `size` and map it to [-1, 1]
///
/// # Arguments
///
/// * `images` - Tensor of shape (batch, channels, height, width) with values in [0, 1]
pub fn normalize_tensor_batch(images: &Tensor, size: i64) -> Tensor {
    let dims = images.size();
    let resized = if dims[2] == size && dims[3] == size {
        images.shallow_clone()
    } else {
        images.upsample_bilinear2d([size, size], false, None::<f64>, None::<f64>)
    };
    resized * 2.0 - 1.0
}
