//! JPEG decode, fit-to-box resize and re-encode

use crate::error::TransformError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, ImageResult};
use tracing::{debug, warn};

/// Quality used when re-encoding resized images
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Decode `raw`, fit it inside `width` x `height` and encode it as JPEG.
///
/// CPU bound; callers on the async runtime should run it on a blocking thread.
pub fn transform(raw: &[u8], width: u32, height: u32) -> Result<Vec<u8>, TransformError> {
    let source = decode(raw)?;
    let (source_width, source_height) = (source.width(), source.height());

    let fitted = fit(source, width, height);
    debug!(
        source_width,
        source_height,
        width = fitted.width(),
        height = fitted.height(),
        "Resized image"
    );

    encode(&fitted)
}

/// Decode a JPEG, retrying once when the decoder trips over excess
/// coefficients.
fn decode(raw: &[u8]) -> Result<DynamicImage, TransformError> {
    decode_with(raw, decode_jpeg)
}

fn decode_with(
    raw: &[u8],
    decoder: impl Fn(&[u8]) -> ImageResult<DynamicImage>,
) -> Result<DynamicImage, TransformError> {
    match decoder(raw) {
        Ok(image) => Ok(image),
        Err(err) if is_excess_coefficients(&err) => {
            warn!(error = %err, "JPEG decoder reported excess coefficients, retrying decode");
            decoder(raw).map_err(TransformError::Decode)
        }
        Err(err) => Err(TransformError::Decode(err)),
    }
}

fn decode_jpeg(raw: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(raw, ImageFormat::Jpeg)
}

fn is_excess_coefficients(err: &ImageError) -> bool {
    matches!(err, ImageError::Decoding(_))
        && err.to_string().to_ascii_lowercase().contains("coefficient")
}

/// Largest size with the source aspect ratio that fits inside the box.
/// Never enlarges, never returns a zero dimension.
pub fn fit_dimensions(
    source_width: u32,
    source_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if source_width <= max_width && source_height <= max_height {
        return (source_width, source_height);
    }

    let source_aspect = f64::from(source_width) / f64::from(source_height);
    let box_aspect = f64::from(max_width) / f64::from(max_height);

    let (width, height) = if source_aspect > box_aspect {
        let height = (f64::from(max_width) / source_aspect).round() as u32;
        (max_width, height)
    } else {
        let width = (f64::from(max_height) * source_aspect).round() as u32;
        (width, max_height)
    };

    (width.clamp(1, max_width), height.clamp(1, max_height))
}

fn fit(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = fit_dimensions(image.width(), image.height(), max_width, max_height);
    if (width, height) == (image.width(), image.height()) {
        return image;
    }
    image.resize_exact(width, height, FilterType::Lanczos3)
}

fn encode(image: &DynamicImage) -> Result<Vec<u8>, TransformError> {
    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, DEFAULT_JPEG_QUALITY);

    // The JPEG encoder only takes 8-bit gray or RGB
    let result = match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => {
            image.write_with_encoder(encoder)
        }
        other => DynamicImage::ImageRgb8(other.to_rgb8()).write_with_encoder(encoder),
    };
    result.map_err(TransformError::Encode)?;

    Ok(encoded)
}
