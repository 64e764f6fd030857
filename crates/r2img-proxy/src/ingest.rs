//! Upload pipeline: normalize to WebP, name, and store remotely
//!
//! Uploaded bytes go only to the remote store. The local cache is filled
//! lazily by the first read of the new object.

use crate::codec::ImageCodec;
use crate::error::{ProxyError, Result};
use crate::filename;
use blob_store_client::RemoteStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Lowercased extension of an uploaded file name, with its leading dot
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

pub struct IngestPipeline {
    codec: Arc<dyn ImageCodec>,
    remote: Arc<dyn RemoteStore>,
}

impl IngestPipeline {
    pub fn new(codec: Arc<dyn ImageCodec>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { codec, remote }
    }

    /// Store an uploaded image and return its object name (`<token>.webp`)
    pub async fn ingest(
        &self,
        bytes: Vec<u8>,
        declared_extension: &str,
        quality: f32,
    ) -> Result<String> {
        let extension = declared_extension
            .trim_start_matches('.')
            .to_ascii_lowercase();

        let webp = match extension.as_str() {
            "webp" => {
                debug!(size = bytes.len(), "Upload already WebP, skipping transcode");
                bytes
            }
            "png" | "jpg" | "jpeg" => self.transcode(bytes, extension, quality).await?,
            _ => return Err(ProxyError::UnsupportedType(declared_extension.to_string())),
        };

        let token = filename::generate()?;
        let name = self.remote.upload(webp, &token).await?;

        info!(name = %name, "Stored uploaded image");
        Ok(name)
    }

    async fn transcode(&self, bytes: Vec<u8>, extension: String, quality: f32) -> Result<Vec<u8>> {
        let codec = Arc::clone(&self.codec);
        let input_size = bytes.len();

        let webp = tokio::task::spawn_blocking(move || {
            let image = codec.decode(&bytes, &extension)?;
            codec.encode(&image, quality)
        })
        .await
        .map_err(|e| ProxyError::Encode(format!("transcode task failed: {}", e)))??;

        debug!(input_size, output_size = webp.len(), quality, "Transcoded upload to WebP");
        Ok(webp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{encoded, sample_image};
    use crate::codec::WebpCodec;
    use crate::filename::TOKEN_LEN;
    use crate::testing::CountingRemote;
    use image::{DynamicImage, ImageFormat};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegates to the real codec and counts calls
    #[derive(Default)]
    struct CountingCodec {
        decodes: AtomicUsize,
        encodes: AtomicUsize,
    }

    impl ImageCodec for CountingCodec {
        fn decode(&self, bytes: &[u8], extension: &str) -> Result<DynamicImage> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            WebpCodec.decode(bytes, extension)
        }

        fn encode(&self, image: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            WebpCodec.encode(image, quality)
        }
    }

    fn pipeline() -> (Arc<CountingCodec>, Arc<CountingRemote>, IngestPipeline) {
        let codec = Arc::new(CountingCodec::default());
        let remote = Arc::new(CountingRemote::default());
        let pipeline = IngestPipeline::new(codec.clone(), remote.clone());
        (codec, remote, pipeline)
    }

    fn assert_canonical_name(name: &str) {
        let token = name.strip_suffix(".webp").expect("missing .webp suffix");
        assert_eq!(token.len(), TOKEN_LEN);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.PNG"), ".png");
        assert_eq!(extension_of("archive.tar.jpeg"), ".jpeg");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of(""), "");
    }

    #[tokio::test]
    async fn test_png_is_transcoded_and_uploaded() {
        let (codec, remote, pipeline) = pipeline();
        let png = encoded(&sample_image(100, 100), ImageFormat::Png);

        let name = pipeline.ingest(png, ".png", 80.0).await.unwrap();

        assert_canonical_name(&name);
        assert_eq!(codec.decodes.load(Ordering::SeqCst), 1);
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 1);
        assert_eq!(remote.uploads(), 1);
        let stored = remote.objects.lock().unwrap().get(&name).cloned().unwrap();
        assert_eq!(crate::codec::sniff_content_type(&stored), "image/webp");
    }

    #[tokio::test]
    async fn test_jpeg_is_transcoded() {
        let (codec, _remote, pipeline) = pipeline();
        let jpeg = encoded(&sample_image(40, 30), ImageFormat::Jpeg);

        let name = pipeline.ingest(jpeg, ".JPG", 75.0).await.unwrap();

        assert_canonical_name(&name);
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_webp_passes_through_untouched() {
        let (codec, remote, pipeline) = pipeline();
        let webp = WebpCodec.encode(&sample_image(10, 10), 80.0).unwrap();

        let name = pipeline.ingest(webp.clone(), ".webp", 80.0).await.unwrap();

        assert_canonical_name(&name);
        assert_ne!(name, "original.webp");
        assert_eq!(codec.decodes.load(Ordering::SeqCst), 0);
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 0);
        assert_eq!(remote.objects.lock().unwrap().get(&name), Some(&webp));
    }

    #[tokio::test]
    async fn test_unsupported_type_checked_before_network() {
        let (codec, remote, pipeline) = pipeline();

        let err = pipeline
            .ingest(b"GIF89a".to_vec(), ".gif", 80.0)
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::UnsupportedType(_)));
        assert_eq!(codec.decodes.load(Ordering::SeqCst), 0);
        assert_eq!(remote.uploads(), 0);
    }

    #[tokio::test]
    async fn test_missing_extension_unsupported() {
        let (_codec, remote, pipeline) = pipeline();

        let err = pipeline.ingest(vec![1, 2, 3], "", 80.0).await.unwrap_err();

        assert!(matches!(err, ProxyError::UnsupportedType(_)));
        assert_eq!(remote.uploads(), 0);
    }

    #[tokio::test]
    async fn test_same_bytes_twice_yields_distinct_names() {
        let (_codec, remote, pipeline) = pipeline();
        let png = encoded(&sample_image(16, 16), ImageFormat::Png);

        let first = pipeline.ingest(png.clone(), ".png", 80.0).await.unwrap();
        let second = pipeline.ingest(png, ".png", 80.0).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(remote.uploads(), 2);
    }

    #[tokio::test]
    async fn test_decode_error_propagates_without_upload() {
        let (_codec, remote, pipeline) = pipeline();

        let err = pipeline
            .ingest(b"not really a png".to_vec(), ".png", 80.0)
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Decode(_)));
        assert_eq!(remote.uploads(), 0);
    }
}
