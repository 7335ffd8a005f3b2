use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::config::ImageConfig;
use crate::error::InferenceError;
use crate::inference::decode::DecodedImage;

pub const MODEL_CHANNELS: usize = 3;

/// Turns a decoded image into the `(1, H, W, 3)` tensor the classifier reads.
///
/// Channel policy: luma is copied into R, G and B; alpha is dropped without
/// compositing. The image is then stretched to exactly `H x W` with the
/// configured filter and every byte is scaled by `1 / 255`.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl Preprocessor {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            filter: config.interpolation.filter(),
        }
    }

    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, MODEL_CHANNELS]
    }

    pub fn run(&self, image: &DecodedImage) -> Result<Array4<f32>, InferenceError> {
        let rgb = to_rgb(image)?;
        let resized = imageops::resize(&rgb, self.width, self.height, self.filter);

        let [batch, height, width, channels] = self.input_shape();
        let values: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|v| f32::from(v) / 255.0)
            .collect();
        let tensor = Array4::from_shape_vec((batch, height, width, channels), values)
            .map_err(|e| InferenceError::Shape(e.to_string()))?;

        if tensor.shape() != self.input_shape() {
            return Err(InferenceError::Shape(format!(
                "Expected tensor shape {:?}, got {:?}",
                self.input_shape(),
                tensor.shape()
            )));
        }
        Ok(tensor)
    }
}

/// Rebuilds the source layout as a `DynamicImage` and lets `image` do the
/// RGB conversion: luma is replicated, alpha is discarded.
fn to_rgb(image: &DecodedImage) -> Result<RgbImage, InferenceError> {
    let (width, height) = (image.width(), image.height());
    let pixels = image.pixels().to_vec();
    let dynamic = match image.channels() {
        1 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
        n => {
            return Err(InferenceError::Shape(format!(
                "Cannot convert {} channels to RGB",
                n
            )));
        }
    };
    dynamic.map(DynamicImage::into_rgb8).ok_or_else(|| {
        InferenceError::Shape("Pixel buffer does not match image dimensions".to_string())
    })
}
