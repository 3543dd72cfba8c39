//! # Encoder Adapter Module
//!
//! Questo modulo isola l'unica dipendenza specifica di piattaforma: la
//! codifica dei pixel in un container (JPEG / PNG / WebP).
//!
//! ## Responsabilità:
//! - Trait `EncoderAdapter`: interfaccia sostituibile per formato
//! - `CodecEncoder`: implementazione in-memory con `image` (JPEG, PNG) e `webp` (WebP lossy)
//! - Clamp della qualità in `[10,100]` prima di ogni chiamata
//! - Inflazione JPEG: `effective = min(round(quality × 1.1), 95)`, arrotondamento
//!   half-away-from-zero (15 → 17, 50 → 55)
//! - Preparazione della copia di lavoro (sharpen + composizione alpha per JPEG)
//!
//! ## Formati:
//! | Formato | Qualità | Alpha | Libreria |
//! |---------|---------|-------|----------|
//! | JPEG    | ✅ (round(×1.1), max 95) | ❌ composta su background | image |
//! | PNG     | ❌ ignorata (lossless) | ✅ | image |
//! | WebP    | ✅ diretta | ✅ | webp (libwebp) |
//!
//! ## Side effect:
//! Nessuno. L'immagine sorgente non viene mai modificata: ogni encoder
//! lavora su conversioni o copie.

use crate::config::Config;
use crate::decision::{EncodingPlan, Enhancement, OutputFormat};
use crate::error::CompressError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder as _, Rgb, RgbImage};
use tracing::debug;

/// One encoded buffer
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// Nominal quality after clamping, before any format-specific mapping
    pub quality: u8,
}

impl EncodedImage {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Turns pixels into an encoded container at a given quality.
///
/// Implementations must be pure per call and must not mutate `image`.
pub trait EncoderAdapter: Send + Sync {
    fn encode(&self, image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<EncodedImage, CompressError>;
}

/// In-memory encoder backed by the `image` and `webp` crates
#[derive(Debug, Clone)]
pub struct CodecEncoder {
    min_quality: u8,
    jpeg_quality_boost: f64,
    jpeg_quality_cap: u8,
    background: [u8; 3],
}

impl Default for CodecEncoder {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl CodecEncoder {
    pub fn new(config: &Config) -> Self {
        Self {
            min_quality: config.min_quality,
            jpeg_quality_boost: config.jpeg_quality_boost,
            jpeg_quality_cap: config.jpeg_quality_cap,
            background: config.background,
        }
    }

    pub fn clamp_quality(&self, quality: u8) -> u8 {
        quality.clamp(self.min_quality, 100)
    }

    /// Quality actually handed to the underlying codec
    pub fn effective_quality(&self, format: OutputFormat, quality: u8) -> u8 {
        let quality = self.clamp_quality(quality);
        match format {
            OutputFormat::Jpeg => {
                let boosted = (quality as f64 * self.jpeg_quality_boost).round();
                boosted.min(self.jpeg_quality_cap as f64).max(1.0) as u8
            }
            OutputFormat::WebP | OutputFormat::Png => quality,
        }
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressError> {
        let rgb = flatten_alpha(image, self.background);
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
        Ok(buf)
    }

    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>, CompressError> {
        let mut buf = Vec::new();
        if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            PngEncoder::new(&mut buf).write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)?;
        } else {
            let rgb = image.to_rgb8();
            PngEncoder::new(&mut buf).write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
        }
        Ok(buf)
    }

    fn encode_webp(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressError> {
        let mut config = webp::WebPConfig::new()
            .map_err(|_| CompressError::encode(OutputFormat::WebP, "failed to create WebPConfig"))?;
        config.quality = quality as f32;

        let memory = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height()).encode_advanced(&config)
        } else {
            let rgb = image.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()).encode_advanced(&config)
        }
        .map_err(|e| CompressError::encode(OutputFormat::WebP, format!("{:?}", e)))?;

        Ok(memory.to_vec())
    }
}

impl EncoderAdapter for CodecEncoder {
    fn encode(&self, image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<EncodedImage, CompressError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CompressError::encode(format, "image has no pixels"));
        }

        let quality = self.clamp_quality(quality);
        let effective = self.effective_quality(format, quality);

        let bytes = match format {
            OutputFormat::Jpeg => self.encode_jpeg(image, effective)?,
            OutputFormat::Png => self.encode_png(image)?,
            OutputFormat::WebP => self.encode_webp(image, effective)?,
        };

        debug!("Encoded {} at quality {} (effective {}): {} bytes", format, quality, effective, bytes.len());

        Ok(EncodedImage { bytes, format, quality })
    }
}

/// Composite an image over an opaque background, dropping alpha
pub fn flatten_alpha(image: &DynamicImage, background: [u8; 3]) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as u32;
        let blend = |c: u8, bg: u8| ((c as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(
            x,
            y,
            Rgb([
                blend(px[0], background[0]),
                blend(px[1], background[1]),
                blend(px[2], background[2]),
            ]),
        );
    }
    out
}

/// Build the copy the search encodes from: enhancement first, then
/// composition over the background when the target format has no alpha.
pub fn prepare_working_image(source: &DynamicImage, plan: &EncodingPlan, config: &Config) -> DynamicImage {
    let working = match plan.enhancement {
        Enhancement::Sharpen => source.unsharpen(config.sharpen_sigma, config.sharpen_threshold),
        Enhancement::None => source.clone(),
    };

    if plan.format == OutputFormat::Jpeg && working.color().has_alpha() {
        DynamicImage::ImageRgb8(flatten_alpha(&working, config.background))
    } else {
        working
    }
}
