//! Image loading, downscaling, and base64 encoding for the vision request.
//!
//! Photos are resized so the longest edge is at most 1024px and re-encoded
//! as JPEG before they are sent inline to the AI backend.

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Maximum dimension (width or height) for images sent to the AI backend.
pub const MAX_IMAGE_DIMENSION: u32 = 1024;

/// JPEG quality factor for the re-encoded payload (0-100).
pub const JPEG_QUALITY: u8 = 90;

/// Media type of every prepared image.
pub const IMAGE_MEDIA_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Couldn't read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {0}. Ensure it's a valid JPEG/PNG/WebP.")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image to JPEG: {0}")]
    Encode(#[source] image::ImageError),
}

/// A downscaled, JPEG-encoded image ready for inline transmission.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedImage {
    /// Base64 payload without any data-URI prefix.
    pub data: String,
    pub media_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Read an image file from disk and prepare it.
pub fn prepare_image_file(path: &Path) -> Result<PreparedImage, ImageError> {
    let bytes = std::fs::read(path).map_err(|source| ImageError::Read {
        path: path.display().to_string(),
        source,
    })?;
    prepare_image(&bytes)
}

/// Prepare raw image bytes (JPEG, PNG, WebP, etc.): decode, resize, encode.
pub fn prepare_image(image_bytes: &[u8]) -> Result<PreparedImage, ImageError> {
    let img = image::load_from_memory(image_bytes).map_err(ImageError::Decode)?;
    info!("Loaded image: {}x{}", img.width(), img.height());

    let resized = resize_if_needed(img, MAX_IMAGE_DIMENSION);
    let (width, height) = (resized.width(), resized.height());
    info!("Resized to: {}x{}", width, height);

    let jpeg_bytes = encode_to_jpeg(&resized, JPEG_QUALITY)?;
    info!("Encoded to JPEG: {} bytes", jpeg_bytes.len());

    Ok(PreparedImage {
        data: STANDARD.encode(&jpeg_bytes),
        media_type: IMAGE_MEDIA_TYPE,
        width,
        height,
    })
}

/// Compute the output size for an image, keeping the aspect ratio.
///
/// The longer side is clamped to `max_dimension` and the other side is
/// rounded to the nearest pixel. Images already within bounds are unchanged.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let scaled = |side: u32, long: u32| {
        let value = (side as f64 * max_dimension as f64 / long as f64).round() as u32;
        value.max(1)
    };

    if width > height {
        if width > max_dimension {
            return (max_dimension, scaled(height, width));
        }
    } else if height > max_dimension {
        return (scaled(width, height), max_dimension);
    }
    (width, height)
}

fn resize_if_needed(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let (new_width, new_height) = target_dimensions(width, height, max_dimension);

    if (new_width, new_height) == (width, height) {
        return img;
    }

    img.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

fn encode_to_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder).map_err(ImageError::Encode)?;
    Ok(buffer.into_inner())
}
