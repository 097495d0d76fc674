//! # Image Processing Module
//!
//! Questo modulo gestisce la ricodifica in memoria delle immagini supportate.
//!
//! ## Responsabilità:
//! - Definisce il contratto `ImageCodec` usato dal batch compressor
//! - Implementa `ImageProcessor` con la crate `image` e `oxipng`
//! - Nessun progresso intermedio: il chiamante vede solo 0% e 100%
//!
//! ## Formati Supportati
//!
//! | Formato | Strategia                              | Qualità usata        |
//! |---------|----------------------------------------|----------------------|
//! | JPEG    | decode + `JpegEncoder` lossy           | quality diretta      |
//! | PNG     | `oxipng` lossless (mai più grande)     | livello libdeflate   |
//! | WebP    | decode + libwebp lossy (`webp`)        | quality diretta      |
//!
//! Il PNG resta lossless: la qualità sceglie solo lo sforzo di deflate, con
//! la stessa direzione del CRF video (qualità bassa = compressione più spinta).
//!
//! ## Error Handling
//!
//! - Payload corrotto o troncato: `CompressError::Decode`
//! - Media type non immagine: `CompressError::UnsupportedType`
//! - Il formato di output è sempre uguale a quello di input
//!
//! ## Determinismo
//!
//! Stessi byte in ingresso e stessa qualità producono sempre gli stessi byte
//! in uscita. Se l'output risulta più grande dell'input la dimensione reale
//! viene comunque riportata al chiamante.
//!
//! ## Esempio:
//! ```rust,no_run
//! use madacly::image_processor::{ImageCodec, ImageProcessor};
//! use madacly::{InputFile, Quality};
//!
//! # async fn run(bytes: Vec<u8>) -> Result<(), madacly::CompressError> {
//! let processor = ImageProcessor::new();
//! let file = InputFile::new("photo.jpg", "image/jpeg", bytes);
//! let compressed = processor.compress(&file, Quality::new(80)?).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::CompressError;
use crate::media::{InputFile, Quality};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::sync::Arc;
use tracing::debug;

/// Still-image re-encoder contract
#[async_trait]
pub trait ImageCodec: Send + Sync {
    /// Re-encodes `file` at `quality` and returns the compressed bytes.
    async fn compress(&self, file: &InputFile, quality: Quality) -> Result<Vec<u8>, CompressError>;
}

/// Raster formats the image processor can re-encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
}

impl SourceFormat {
    pub fn from_media_type(media_type: &str) -> Result<Self, CompressError> {
        let essence = media_type.split(';').next().unwrap_or_default().trim().to_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/webp" => Ok(Self::WebP),
            _ => Err(CompressError::UnsupportedType(media_type.to_string())),
        }
    }
}

/// In-memory image re-encoder backed by the `image` and `oxipng` crates
#[derive(Debug, Default, Clone)]
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of the adapter; runs on a blocking thread.
    pub fn compress_bytes(data: &[u8], format: SourceFormat, quality: Quality) -> Result<Vec<u8>, CompressError> {
        match format {
            SourceFormat::Jpeg => Self::encode_jpeg(data, quality),
            SourceFormat::Png => Self::optimize_png(data, quality),
            SourceFormat::WebP => Self::encode_webp(data, quality),
        }
    }

    fn encode_jpeg(data: &[u8], quality: Quality) -> Result<Vec<u8>, CompressError> {
        let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;

        // JPEG has no alpha channel
        let img = match img {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };

        let mut out = Vec::with_capacity(data.len() / 2);
        let encoder = JpegEncoder::new_with_quality(&mut out, quality.value());
        img.write_with_encoder(encoder)?;
        Ok(out)
    }

    fn optimize_png(data: &[u8], quality: Quality) -> Result<Vec<u8>, CompressError> {
        let mut options = oxipng::Options::from_preset(2);
        options.deflate = oxipng::Deflaters::Libdeflater {
            compression: Self::png_compression_level(quality),
        };

        oxipng::optimize_from_memory(data, &options).map_err(|e| CompressError::Decode(e.to_string()))
    }

    fn encode_webp(data: &[u8], quality: Quality) -> Result<Vec<u8>, CompressError> {
        let img = image::load_from_memory_with_format(data, ImageFormat::WebP)?;
        let (width, height) = (img.width(), img.height());
        let factor = quality.value() as f32;

        let encoded = if img.color().has_alpha() {
            let pixels = img.to_rgba8();
            webp::Encoder::from_rgba(&pixels, width, height).encode_simple(false, factor)
        } else {
            let pixels = img.to_rgb8();
            webp::Encoder::from_rgb(&pixels, width, height).encode_simple(false, factor)
        };

        encoded
            .map(|memory| memory.to_vec())
            .map_err(|e| CompressError::Decode(format!("WebP encoding failed: {:?}", e)))
    }

    /// libdeflate effort for a quality value. PNG stays lossless, so the
    /// output barely moves; lower quality still means more effort.
    pub fn png_compression_level(quality: Quality) -> u8 {
        match quality.value() {
            90..=100 => 8,
            70..=89 => 10,
            _ => 12,
        }
    }
}

#[async_trait]
impl ImageCodec for ImageProcessor {
    async fn compress(&self, file: &InputFile, quality: Quality) -> Result<Vec<u8>, CompressError> {
        let format = SourceFormat::from_media_type(&file.media_type)?;
        let data = Arc::clone(&file.data);

        debug!("Re-encoding {} as {:?} (quality: {})", file.name, format, quality);

        tokio::task::spawn_blocking(move || Self::compress_bytes(&data, format, quality))
            .await
            .map_err(|e| CompressError::Decode(format!("image worker failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};
    use image::codecs::webp::WebPEncoder;
    use image::{GenericImageView, ImageBuffer, Rgb, RgbImage};

    fn sample_image(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                ((x * 7 + y * 13) % 256) as u8,
            ])
        })
    }

    fn jpeg_fixture(quality: u8) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(sample_image(128, 96))
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
            .unwrap();
        out
    }

    fn png_fixture() -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(sample_image(64, 64))
            .write_with_encoder(PngEncoder::new_with_quality(
                &mut out,
                CompressionType::Fast,
                FilterType::NoFilter,
            ))
            .unwrap();
        out
    }

    fn webp_fixture(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(sample_image(width, height))
            .write_with_encoder(WebPEncoder::new_lossless(&mut out))
            .unwrap();
        out
    }

    #[tokio::test]
    async fn test_jpeg_reencode_is_smaller_and_decodable() {
        let input = jpeg_fixture(100);
        let file = InputFile::new("photo.jpg", "image/jpeg", input.clone());

        let output = ImageProcessor::new()
            .compress(&file, Quality::new(60).unwrap())
            .await
            .unwrap();

        assert!(output.len() < input.len());
        let decoded = image::load_from_memory_with_format(&output, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (128, 96));
    }

    #[test]
    fn test_jpeg_reencode_is_deterministic() {
        let input = jpeg_fixture(95);
        let quality = Quality::new(75).unwrap();
        let first = ImageProcessor::compress_bytes(&input, SourceFormat::Jpeg, quality).unwrap();
        let second = ImageProcessor::compress_bytes(&input, SourceFormat::Jpeg, quality).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_png_never_grows() {
        let input = png_fixture();
        let output = ImageProcessor::compress_bytes(&input, SourceFormat::Png, Quality::new(80).unwrap()).unwrap();
        assert!(output.len() <= input.len());
        let decoded = image::load_from_memory_with_format(&output, ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), (64, 64));
    }

    #[test]
    fn test_webp_reencode_is_decodable() {
        let input = webp_fixture(32, 32);
        let output = ImageProcessor::compress_bytes(&input, SourceFormat::WebP, Quality::new(90).unwrap()).unwrap();
        let decoded = image::load_from_memory_with_format(&output, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.dimensions(), (32, 32));
    }

    #[test]
    fn test_webp_quality_controls_size() {
        let input = webp_fixture(128, 96);
        let low = ImageProcessor::compress_bytes(&input, SourceFormat::WebP, Quality::new(50).unwrap()).unwrap();
        let high = ImageProcessor::compress_bytes(&input, SourceFormat::WebP, Quality::new(100).unwrap()).unwrap();

        assert!(low.len() < high.len(), "q50={} q100={}", low.len(), high.len());
    }

    #[test]
    fn test_webp_reencode_is_deterministic() {
        let input = webp_fixture(64, 64);
        let quality = Quality::new(70).unwrap();
        let first = ImageProcessor::compress_bytes(&input, SourceFormat::WebP, quality).unwrap();
        let second = ImageProcessor::compress_bytes(&input, SourceFormat::WebP, quality).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_decode_error() {
        let file = InputFile::new("broken.jpg", "image/jpeg", b"definitely not a jpeg".to_vec());
        let err = ImageProcessor::new()
            .compress(&file, Quality::new(80).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::Decode(_)));

        let file = InputFile::new("broken.png", "image/png", vec![0x89, b'P', b'N', b'G']);
        let err = ImageProcessor::new()
            .compress(&file, Quality::new(80).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::Decode(_)));
    }

    #[tokio::test]
    async fn test_non_image_type_is_rejected() {
        let file = InputFile::new("clip.mp4", "video/mp4", vec![0u8; 16]);
        let err = ImageProcessor::new()
            .compress(&file, Quality::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::UnsupportedType(_)));
    }

    #[test]
    fn test_png_effort_follows_video_direction() {
        let low = ImageProcessor::png_compression_level(Quality::new(50).unwrap());
        let mid = ImageProcessor::png_compression_level(Quality::new(75).unwrap());
        let high = ImageProcessor::png_compression_level(Quality::new(100).unwrap());
        assert!(low >= mid && mid >= high);
        assert!(low > high);
    }
}
