//! Validation and downscaling of user-supplied product photos.
//!
//! Only JPEG, PNG and WEBP are accepted. Anything that decodes is re-encoded
//! as RGB JPEG, shrunk to fit inside [`ImageLimits::max_dimension`] on both
//! axes with the aspect ratio preserved.

use std::io::Cursor;

use base64::Engine as _;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use pricefinder_common::{PriceFinderError, Result};

const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub min_dimension: u32,
    pub max_dimension: u32,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            min_dimension: 10,
            max_dimension: 1024,
        }
    }
}

/// An image ready to be sent inline to the vision collaborator.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl PreparedImage {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

fn accepted_format(bytes: &[u8]) -> Result<ImageFormat> {
    let format = image::guess_format(bytes)
        .map_err(|e| PriceFinderError::InvalidInput(format!("unrecognised image: {e}")))?;
    match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP => Ok(format),
        other => Err(PriceFinderError::InvalidInput(format!(
            "unsupported image format {other:?}"
        ))),
    }
}

fn decode(bytes: &[u8], limits: &ImageLimits) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(PriceFinderError::InvalidInput("empty image payload".into()));
    }
    let format = accepted_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PriceFinderError::InvalidInput(format!("image decode failed: {e}")))?;
    if img.width() < limits.min_dimension || img.height() < limits.min_dimension {
        return Err(PriceFinderError::InvalidInput(format!(
            "image too small: {}x{}",
            img.width(),
            img.height()
        )));
    }
    Ok(img)
}

/// Validate, downscale and re-encode an image for the vision collaborator.
pub fn prepare_image(bytes: &[u8], limits: &ImageLimits) -> Result<PreparedImage> {
    let img = decode(bytes, limits)?;
    let max = limits.max_dimension;
    let img = if img.width() > max || img.height() > max {
        img.resize(max, max, FilterType::Lanczos3)
    } else {
        img
    };
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| PriceFinderError::InvalidInput(format!("image encode failed: {e}")))?;

    tracing::debug!(
        width = rgb.width(),
        height = rgb.height(),
        bytes = out.get_ref().len(),
        "vision.image.prepared"
    );

    Ok(PreparedImage {
        bytes: out.into_inner(),
        mime_type: "image/jpeg",
        width: rgb.width(),
        height: rgb.height(),
    })
}

#[cfg(test)]
pub(crate) fn encode_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([200, 30, 30, 255]),
    ));
    let img = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    };
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}
