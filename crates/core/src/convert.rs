//! The conversion codec: decode, optional alpha flattening, encode.
//!
//! This is the external collaborator of the worker state machine; it is
//! synchronous and CPU-bound, so callers run it on a blocking thread.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::error::CoreError;
use crate::formats::supports_alpha;

/// JPEG encode quality, matching the service's historical output.
pub const JPEG_QUALITY: u8 = 85;

/// Convert the image at `input` to `output_format`, writing to `output`.
///
/// Sources carrying an alpha channel are flattened to opaque RGB before
/// encoding to a target without alpha support (JPEG). Encoding parameters
/// are per-format: JPEG lossy at [`JPEG_QUALITY`], PNG and WebP lossless.
pub fn convert(input: &Path, output: &Path, output_format: &str) -> Result<(), CoreError> {
    let img = image::open(input).map_err(|e| CoreError::Conversion(e.to_string()))?;

    let format = output_format.to_ascii_lowercase();
    let img = flatten_alpha(img, &format);

    match format.as_str() {
        "jpeg" | "jpg" => encode_jpeg(&img, output),
        "png" => save(&img, output, ImageFormat::Png),
        "webp" => save(&img, output, ImageFormat::WebP),
        "gif" => save(&img, output, ImageFormat::Gif),
        other => match ImageFormat::from_extension(other) {
            Some(fmt) => save(&img, output, fmt),
            None => Err(CoreError::InvalidFormat(other.to_string())),
        },
    }
}

/// Flatten transparency when the target cannot represent it.
fn flatten_alpha(img: DynamicImage, format: &str) -> DynamicImage {
    if img.color().has_alpha() && !supports_alpha(format) {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    }
}

fn encode_jpeg(img: &DynamicImage, output: &Path) -> Result<(), CoreError> {
    let file = File::create(output).map_err(|e| CoreError::Conversion(e.to_string()))?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
    img.write_with_encoder(encoder)
        .map_err(|e| CoreError::Conversion(e.to_string()))
}

fn save(img: &DynamicImage, output: &Path, format: ImageFormat) -> Result<(), CoreError> {
    img.save_with_format(output, format)
        .map_err(|e| CoreError::Conversion(e.to_string()))
}
