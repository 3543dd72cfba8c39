//! # Decision Engine Module
//!
//! Trasforma un `ContentProfile` e un `CompressionTarget` in un `EncodingPlan`.
//!
//! ## Responsabilità:
//! - Scelta del formato di output (PNG / WebP / JPEG) in ordine di priorità
//! - Scelta della modalità di ricerca (Balanced / Quality / Size)
//! - Calcolo dei bound iniziali della binary search
//! - Scelta del filtro di enhancement applicato prima della ricerca
//! - Traccia testuale delle decisioni (`reasoning`) per osservabilità
//!
//! ## Regole formato:
//! 1. Trasparenza con quota > 0.1 → PNG (unico formato che preserva l'alpha lossless)
//! 2. Complessità colore High → WebP
//! 3. Altrimenti → JPEG
//!
//! ## Bound iniziali:
//! | Modalità | Bound |
//! |----------|-------|
//! | Quality  | 70-95 |
//! | Size     | 25-70 |
//! | Balanced | 50-85 (> 150 KB), 40-80 (> 80 KB), 30-70 |
//!
//! ## Regole modalità:
//! - Hint del chiamante, se presente
//! - Lato corto < 500px → Quality (anche per immagini quadrate)
//! - Altrimenti → Balanced
//!
//! La funzione è pura: stesso profilo + stesso target = stesso piano.

use crate::analyzer::{AspectClass, ColorComplexity, ContentProfile};
use crate::config::Config;
use crate::target::CompressionTarget;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Container formats the engine can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    /// Whether the quality parameter changes the encoded output
    pub fn is_lossy(&self) -> bool {
        !matches!(self, Self::Png)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WEBP",
        };
        f.write_str(name)
    }
}

/// Bias of the quality search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityMode {
    Balanced,
    Quality,
    Size,
}

impl fmt::Display for QualityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Balanced => "balanced",
            Self::Quality => "quality",
            Self::Size => "size",
        };
        f.write_str(name)
    }
}

/// Filter applied once to the working copy before the search starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Enhancement {
    None,
    Sharpen,
}

/// Frozen decisions taken before the search begins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingPlan {
    pub format: OutputFormat,
    pub quality_mode: QualityMode,
    pub reasoning: Vec<String>,
    pub search_low: u8,
    pub search_high: u8,
    pub enhancement: Enhancement,
}

/// Build the encoding plan for a profiled image
pub fn decide(profile: &ContentProfile, target: &CompressionTarget, config: &Config) -> EncodingPlan {
    let mut reasoning = Vec::new();

    let format = select_format(profile, config, &mut reasoning);
    let quality_mode = select_mode(profile, target, config, &mut reasoning);
    let (search_low, search_high) = search_bounds(quality_mode, target, &mut reasoning);
    let enhancement = select_enhancement(profile, quality_mode, &mut reasoning);

    info!(
        "Plan: {} / {} mode / quality {}-{} / {:?}",
        format, quality_mode, search_low, search_high, enhancement
    );

    EncodingPlan {
        format,
        quality_mode,
        reasoning,
        search_low,
        search_high,
        enhancement,
    }
}

fn select_format(profile: &ContentProfile, config: &Config, reasoning: &mut Vec<String>) -> OutputFormat {
    if profile.has_transparency && profile.transparent_pixel_ratio > config.png_transparency_ratio {
        reasoning.push(format!(
            "{:.1}% of sampled pixels are transparent: PNG preserves the alpha channel",
            profile.transparent_pixel_ratio * 100.0
        ));
        OutputFormat::Png
    } else if profile.color_complexity == ColorComplexity::High {
        reasoning.push("High color complexity: WEBP compresses detailed content best".to_string());
        OutputFormat::WebP
    } else {
        reasoning.push(format!(
            "{:?} color complexity without significant transparency: JPEG",
            profile.color_complexity
        ));
        OutputFormat::Jpeg
    }
}

fn select_mode(
    profile: &ContentProfile,
    target: &CompressionTarget,
    config: &Config,
    reasoning: &mut Vec<String>,
) -> QualityMode {
    if let Some(hint) = target.mode_hint {
        reasoning.push(format!("Caller requested {} mode", hint));
        return hint;
    }

    // Small images favor fidelity whatever their shape; otherwise the
    // aspect ratio decides.
    if profile.min_dimension() < config.small_image_edge {
        reasoning.push(format!(
            "Small image (short edge {}px < {}px): favor quality over size",
            profile.min_dimension(),
            config.small_image_edge
        ));
        return QualityMode::Quality;
    }

    match profile.aspect_class {
        AspectClass::Square | AspectClass::Landscape => {
            reasoning.push(format!("{:?} aspect ratio: balanced mode", profile.aspect_class));
        }
        AspectClass::Other => {
            reasoning.push("Large image with irregular aspect ratio: balanced mode".to_string());
        }
    }
    QualityMode::Balanced
}

fn search_bounds(mode: QualityMode, target: &CompressionTarget, reasoning: &mut Vec<String>) -> (u8, u8) {
    let target_kb = target.target_kb();
    let bounds = match mode {
        QualityMode::Quality => (70, 95),
        QualityMode::Size => (25, 70),
        QualityMode::Balanced if target_kb > 150.0 => (50, 85),
        QualityMode::Balanced if target_kb > 80.0 => (40, 80),
        QualityMode::Balanced => (30, 70),
    };
    reasoning.push(format!(
        "Search quality {}-{} for a {:.0} KB budget",
        bounds.0, bounds.1, target_kb
    ));
    bounds
}

fn select_enhancement(profile: &ContentProfile, mode: QualityMode, reasoning: &mut Vec<String>) -> Enhancement {
    if mode == QualityMode::Quality && profile.color_complexity != ColorComplexity::Low {
        reasoning.push("Quality mode on detailed content: light sharpening before encoding".to_string());
        Enhancement::Sharpen
    } else {
        Enhancement::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(width: u32, height: u32, complexity: ColorComplexity, aspect: AspectClass) -> ContentProfile {
        ContentProfile {
            has_transparency: false,
            transparent_pixel_ratio: 0.0,
            color_complexity: complexity,
            aspect_class: aspect,
            width,
            height,
        }
    }

    fn target(bytes: u64) -> CompressionTarget {
        CompressionTarget::from_bytes(bytes).unwrap()
    }

    #[test]
    fn test_transparency_routes_to_png() {
        let config = Config::default();
        let mut p = profile(1920, 1080, ColorComplexity::High, AspectClass::Landscape);
        p.has_transparency = true;
        p.transparent_pixel_ratio = 0.5;

        for bytes in [100, 50 * 1024, 10 * 1024 * 1024] {
            assert_eq!(decide(&p, &target(bytes), &config).format, OutputFormat::Png);
        }
    }

    #[test]
    fn test_sparse_transparency_does_not_force_png() {
        let config = Config::default();
        let mut p = profile(800, 600, ColorComplexity::Low, AspectClass::Other);
        p.has_transparency = true;
        p.transparent_pixel_ratio = 0.05;
        assert_eq!(decide(&p, &target(100_000), &config).format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_small_image_favors_quality() {
        let config = Config::default();
        let p = profile(300, 300, ColorComplexity::Medium, AspectClass::Square);
        let plan = decide(&p, &target(100_000), &config);
        assert_eq!(plan.format, OutputFormat::Jpeg);
        assert_eq!(plan.quality_mode, QualityMode::Quality);
        assert_eq!((plan.search_low, plan.search_high), (70, 95));
        assert_eq!(plan.enhancement, Enhancement::Sharpen);
    }

    #[test]
    fn test_square_high_complexity_is_webp_balanced() {
        let config = Config::default();
        let p = profile(1080, 1080, ColorComplexity::High, AspectClass::Square);
        let plan = decide(&p, &target(100 * 1024), &config);
        assert_eq!(plan.format, OutputFormat::WebP);
        assert_eq!(plan.quality_mode, QualityMode::Balanced);
        assert_eq!(plan.enhancement, Enhancement::None);
    }

    #[test]
    fn test_balanced_bounds_follow_budget() {
        let config = Config::default();
        let p = profile(1920, 1080, ColorComplexity::Medium, AspectClass::Landscape);

        let plan = decide(&p, &target(200 * 1024), &config);
        assert_eq!((plan.search_low, plan.search_high), (50, 85));

        let plan = decide(&p, &target(100 * 1024), &config);
        assert_eq!((plan.search_low, plan.search_high), (40, 80));

        // Exactly 80 KB is not "> 80"
        let plan = decide(&p, &target(80 * 1024), &config);
        assert_eq!((plan.search_low, plan.search_high), (30, 70));
    }

    #[test]
    fn test_mode_hint_overrides() {
        let config = Config::default();
        let p = profile(300, 200, ColorComplexity::Medium, AspectClass::Other);
        let t = target(100_000).with_mode_hint(QualityMode::Size);
        let plan = decide(&p, &t, &config);
        assert_eq!(plan.quality_mode, QualityMode::Size);
        assert_eq!((plan.search_low, plan.search_high), (25, 70));
        assert!(plan.reasoning.iter().any(|r| r.contains("Caller requested")));
    }

    #[test]
    fn test_small_landscape_favors_quality() {
        let config = Config::default();
        let p = profile(640, 360, ColorComplexity::Low, AspectClass::Landscape);
        let plan = decide(&p, &target(100_000), &config);
        assert_eq!(plan.quality_mode, QualityMode::Quality);
        assert_eq!((plan.search_low, plan.search_high), (70, 95));
        assert_eq!(plan.enhancement, Enhancement::None);
        assert!(plan.reasoning.iter().any(|r| r.contains("short edge 360px")));

        // Same shape at full size goes back to balanced
        let p = profile(1920, 1080, ColorComplexity::Low, AspectClass::Landscape);
        assert_eq!(decide(&p, &target(100_000), &config).quality_mode, QualityMode::Balanced);
    }

    #[test]
    fn test_large_other_aspect_is_balanced() {
        let config = Config::default();
        let p = profile(1080, 1920, ColorComplexity::Low, AspectClass::Other);
        assert_eq!(decide(&p, &target(500_000), &config).quality_mode, QualityMode::Balanced);
    }

    #[test]
    fn test_decide_is_deterministic() {
        let config = Config::default();
        let p = profile(640, 480, ColorComplexity::Medium, AspectClass::Other);
        let t = target(60_000);
        let first = decide(&p, &t, &config);
        let second = decide(&p, &t, &config);
        assert_eq!(first, second);
        assert!(first.search_low <= first.search_high);
        // format, mode, bounds, sharpening
        assert_eq!(first.reasoning.len(), 4);
    }
}
