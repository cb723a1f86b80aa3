//! Image decoding, validation and bounded resize.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Largest side the recognizer is handed; bigger inputs are scaled down.
pub const MAX_IMAGE_DIMENSION: u32 = 2048;

/// Lossy quality used when re-encoding for echo/test paths.
pub const JPEG_QUALITY: u8 = 85;

/// Decode raw image bytes into the canonical in-memory form.
pub fn decode_bytes(bytes: &[u8]) -> EngineResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(EngineError::invalid_image("empty image payload"));
    }

    let image = image::load_from_memory(bytes)
        .map_err(|e| EngineError::invalid_image(e.to_string()))?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EngineError::invalid_image("image has zero dimensions"));
    }

    Ok(image)
}

/// Decode a base64 string, with or without a `data:image/...;base64,` prefix.
pub fn decode_base64(payload: &str) -> EngineResult<DynamicImage> {
    let stripped = strip_data_uri(payload);
    let cleaned: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| EngineError::invalid_image(format!("bad base64: {e}")))?;

    decode_bytes(&bytes)
}

/// Strip an optional data-URI prefix, tolerating any `image/*` subtype.
fn strip_data_uri(payload: &str) -> &str {
    if let Some(rest) = payload.strip_prefix("data:image/") {
        if let Some(idx) = rest.find(";base64,") {
            return &rest[idx + ";base64,".len()..];
        }
    }
    payload
}

/// True when the payload decodes to an image with positive dimensions.
pub fn validate(bytes: &[u8]) -> bool {
    decode_bytes(bytes).is_ok()
}

/// Scale the image down so both sides fit `MAX_IMAGE_DIMENSION`.
///
/// The scale factor comes from whichever dimension exceeds the maximum;
/// aspect ratio is preserved. Images already within bounds are returned
/// unchanged.
pub fn resize_if_needed(image: DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= MAX_IMAGE_DIMENSION && height <= MAX_IMAGE_DIMENSION {
        return image;
    }

    let scale = if width > height {
        MAX_IMAGE_DIMENSION as f32 / width as f32
    } else {
        MAX_IMAGE_DIMENSION as f32 / height as f32
    };

    // Extreme aspect ratios can truncate a side to zero.
    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);

    debug!(
        from = format!("{width}x{height}"),
        to = format!("{new_width}x{new_height}"),
        "resizing oversized image"
    );

    image.resize_exact(new_width, new_height, FilterType::Triangle)
}

/// Re-encode as base64 JPEG at the fixed quality setting.
pub fn to_base64_jpeg(image: &DynamicImage) -> EngineResult<String> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .encode_image(&image.to_rgb8())
        .map_err(|e| EngineError::invalid_image(format!("jpeg encode failed: {e}")))?;
    Ok(STANDARD.encode(&buf))
}
