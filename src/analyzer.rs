//! # Content Analyzer Module
//!
//! Classificazione leggera del contenuto di un'immagine decodificata.
//!
//! ## Responsabilità:
//! - Campiona una finestra fissa top-left di `min(w,100) × min(h,100)` pixel
//! - Rileva la trasparenza (pixel con alpha < 255) e ne calcola la quota
//! - Stima la complessità colore come distanza media dal grigio medio (128)
//! - Classifica l'aspect ratio (Square / Landscape / Other)
//!
//! ## Determinismo e costo:
//! La finestra è sempre la stessa e ha dimensione limitata, quindi il costo
//! non dipende dalla dimensione dell'immagine e due analisi della stessa
//! immagine producono lo stesso `ContentProfile`.
//!
//! ## Fallimenti:
//! Un buffer illeggibile (dimensioni nulle, buffer troppo corto) non è un
//! errore: si ritorna un profilo di default (Medium, opaco, Other).

use crate::config::Config;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Coarse estimate of how much color information an image carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorComplexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectClass {
    Square,
    Landscape,
    Other,
}

/// Sampled classification of a single image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentProfile {
    pub has_transparency: bool,
    pub transparent_pixel_ratio: f64,
    pub color_complexity: ColorComplexity,
    pub aspect_class: AspectClass,
    pub width: u32,
    pub height: u32,
}

impl ContentProfile {
    /// Safe profile used when pixel data cannot be read
    pub fn fallback(width: u32, height: u32) -> Self {
        Self {
            has_transparency: false,
            transparent_pixel_ratio: 0.0,
            color_complexity: ColorComplexity::Medium,
            aspect_class: AspectClass::Other,
            width,
            height,
        }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn min_dimension(&self) -> u32 {
        self.width.min(self.height)
    }
}

/// Produces a `ContentProfile` from decoded pixels
pub struct ContentAnalyzer<'a> {
    config: &'a Config,
}

impl<'a> ContentAnalyzer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Analyze a decoded image. Only the top-left sample window is converted.
    pub fn analyze(&self, image: &DynamicImage) -> ContentProfile {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            warn!("Cannot analyze empty image {}x{}, using default profile", width, height);
            return ContentProfile::fallback(width, height);
        }

        let window_w = width.min(self.config.sample_window);
        let window_h = height.min(self.config.sample_window);
        let window = image.crop_imm(0, 0, window_w, window_h).to_rgba8();

        self.profile_from_window(width, height, window_w, window_h, window.as_raw())
    }

    /// Analyze a raw RGBA8 buffer laid out row-major with `width * 4` bytes per row.
    pub fn analyze_rgba(&self, width: u32, height: u32, rgba: &[u8]) -> ContentProfile {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() < expected {
            warn!(
                "Unreadable pixel buffer ({} bytes for {}x{}), using default profile",
                rgba.len(),
                width,
                height
            );
            return ContentProfile::fallback(width, height);
        }

        let window_w = width.min(self.config.sample_window);
        let window_h = height.min(self.config.sample_window);
        let stride = width as usize * 4;
        let row_len = window_w as usize * 4;

        let mut window = Vec::with_capacity(row_len * window_h as usize);
        for row in 0..window_h as usize {
            let start = row * stride;
            window.extend_from_slice(&rgba[start..start + row_len]);
        }

        self.profile_from_window(width, height, window_w, window_h, &window)
    }

    fn profile_from_window(
        &self,
        width: u32,
        height: u32,
        window_w: u32,
        window_h: u32,
        window: &[u8],
    ) -> ContentProfile {
        let sample_size = window_w as usize * window_h as usize;

        let transparent = window.chunks_exact(4).filter(|px| px[3] < 255).count();
        let transparent_pixel_ratio = transparent as f64 / sample_size as f64;

        let variance = self.color_variance(window, sample_size);
        let color_complexity = self.classify_complexity(variance);
        let aspect_class = self.classify_aspect(width, height);

        debug!(
            "Analyzed {}x{} ({}x{} window): transparent={:.3}, variance={:.2}, {:?}, {:?}",
            width, height, window_w, window_h, transparent_pixel_ratio, variance, color_complexity, aspect_class
        );

        ContentProfile {
            has_transparency: transparent > 0,
            transparent_pixel_ratio,
            color_complexity,
            aspect_class,
            width,
            height,
        }
    }

    /// Mean of `|128 - avg(R,G,B)|` over at most `complexity_sample_limit`
    /// pixels, spread evenly across the window.
    fn color_variance(&self, window: &[u8], sample_size: usize) -> f64 {
        let limit = self.config.complexity_sample_limit.max(1);
        let step = sample_size.div_ceil(limit).max(1);

        let (sum, count) = window
            .chunks_exact(4)
            .step_by(step)
            .take(limit)
            .fold((0.0_f64, 0_usize), |(sum, count), px| {
                let avg = (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0;
                (sum + (128.0 - avg).abs(), count + 1)
            });

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    fn classify_complexity(&self, variance: f64) -> ColorComplexity {
        if variance > self.config.high_complexity_threshold {
            ColorComplexity::High
        } else if variance > self.config.medium_complexity_threshold {
            ColorComplexity::Medium
        } else {
            ColorComplexity::Low
        }
    }

    fn classify_aspect(&self, width: u32, height: u32) -> AspectClass {
        if height == 0 {
            return AspectClass::Other;
        }
        let ratio = width as f64 / height as f64;
        if (ratio - 1.0).abs() < self.config.square_tolerance {
            AspectClass::Square
        } else if ratio > self.config.landscape_ratio {
            AspectClass::Landscape
        } else {
            AspectClass::Other
        }
    }
}

/// Analyze with the default heuristics
pub fn analyze(image: &DynamicImage) -> ContentProfile {
    ContentAnalyzer::new(&Config::default()).analyze(image)
}
