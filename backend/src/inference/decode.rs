use std::io::Cursor;

use image::{ColorType, DynamicImage, ImageError, ImageReader};

use crate::error::InferenceError;

/// An 8-bit interleaved image in its source channel layout
/// (1 = L, 2 = LA, 3 = RGB, 4 = RGBA).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    channels: u8,
    pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Result<Self, InferenceError> {
        if width == 0 || height == 0 {
            return Err(InferenceError::Shape(format!(
                "Image has no pixels ({}x{})",
                width, height
            )));
        }
        if !(1..=4).contains(&channels) {
            return Err(InferenceError::Shape(format!(
                "Unsupported channel count {}",
                channels
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(InferenceError::Shape(format!(
                "Pixel buffer holds {} bytes, expected {} for {}x{}x{}",
                pixels.len(),
                expected,
                width,
                height,
                channels
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Decodes an uploaded file. Unrecognised bytes are a decode error;
    /// a recognised header with a broken body is a shape error.
    pub fn decode(bytes: &[u8]) -> Result<Self, InferenceError> {
        if bytes.is_empty() {
            return Err(InferenceError::Shape("Uploaded file is empty".to_string()));
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| InferenceError::Decode(e.to_string()))?;
        let format = reader.format().ok_or_else(|| {
            InferenceError::Decode("Unrecognised image format".to_string())
        })?;

        let image = reader.decode().map_err(|e| match e {
            ImageError::Unsupported(e) => InferenceError::Decode(e.to_string()),
            e => InferenceError::Shape(format!("Corrupt {:?} data: {}", format, e)),
        })?;
        Self::from_dynamic(image)
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<Self, InferenceError> {
        let (width, height) = (image.width(), image.height());
        let (channels, pixels) = match image.color() {
            ColorType::L8 | ColorType::L16 => (1, image.into_luma8().into_raw()),
            ColorType::La8 | ColorType::La16 => (2, image.into_luma_alpha8().into_raw()),
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => {
                (3, image.into_rgb8().into_raw())
            }
            _ => (4, image.into_rgba8().into_raw()),
        };
        Self::new(width, height, channels, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
