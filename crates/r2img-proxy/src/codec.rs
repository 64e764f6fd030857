//! Image decoding and WebP encoding

use crate::error::{ProxyError, Result};
use image::{DynamicImage, ImageFormat};

/// Decode supported raster inputs and encode them to WebP
pub trait ImageCodec: Send + Sync {
    /// Decode `bytes` as the format named by `extension` (`png`, `jpg`, `jpeg`)
    fn decode(&self, bytes: &[u8], extension: &str) -> Result<DynamicImage>;

    /// Encode to lossy WebP. `quality` is passed to the encoder unchanged.
    fn encode(&self, image: &DynamicImage, quality: f32) -> Result<Vec<u8>>;
}

/// `image` for decoding, libwebp for encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpCodec;

fn decode_format(extension: &str) -> Result<ImageFormat> {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        _ => Err(ProxyError::UnsupportedFormat(extension.to_string())),
    }
}

impl ImageCodec for WebpCodec {
    fn decode(&self, bytes: &[u8], extension: &str) -> Result<DynamicImage> {
        let format = decode_format(extension)?;
        image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ProxyError::Decode(e.to_string()))
    }

    fn encode(&self, image: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height)
            .encode_simple(false, quality)
            .map_err(|e| ProxyError::Encode(format!("{:?}", e)))?;
        Ok(encoded.to_vec())
    }
}

/// Content type of an image payload, judged from its leading bytes
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    image::guess_format(data)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}
