//! # Quality Scorer Module
//!
//! Score deterministico in `[0,1]` che approssima l'accettabilità percettiva
//! di un tentativo di encoding.
//!
//! ```text
//! score = clamp01((quality/100 + size_term + format_term + mode_bonus + complexity_bonus) / 4)
//! size_term = 1 − encoded_size / (width × height × 3)
//! ```
//!
//! ## Limiti:
//! È un proxy euristico, non una metrica percettiva: non decodifica il
//! risultato e non lo confronta con l'originale (niente SSIM/PSNR). Costa
//! poche operazioni aritmetiche per tentativo.
//!
//! ## Tetto dello score:
//! Il massimo teorico è 0.8125 (q=100, dimensione zero, WebP, Quality, High).
//! Dentro i bound Quality (q ≤ 95) il tetto scende a 0.775 per JPEG e a 0.8
//! per WebP: con `early_accept_score` = 0.8 l'early accept non scatta mai e la
//! soglia va abbassata per avere effetto.

use crate::analyzer::{ColorComplexity, ContentProfile};
use crate::decision::{EncodingPlan, OutputFormat, QualityMode};

fn format_term(format: OutputFormat) -> f64 {
    match format {
        OutputFormat::WebP => 1.1,
        OutputFormat::Png => 0.9,
        OutputFormat::Jpeg => 1.0,
    }
}

fn complexity_bonus(complexity: ColorComplexity) -> f64 {
    match complexity {
        ColorComplexity::High => 0.05,
        ColorComplexity::Medium => 0.02,
        ColorComplexity::Low => 0.0,
    }
}

/// Rough bytes-per-pixel proxy; negative when the output is larger than raw RGB.
fn size_term(profile: &ContentProfile, encoded_size: usize) -> f64 {
    let raw_size = profile.pixel_count() as f64 * 3.0;
    if raw_size == 0.0 {
        return 0.0;
    }
    1.0 - encoded_size as f64 / raw_size
}

/// Score one encode attempt
pub fn score(profile: &ContentProfile, encoded_size: usize, quality: u8, plan: &EncodingPlan) -> f64 {
    let mode_bonus = if plan.quality_mode == QualityMode::Quality { 0.1 } else { 0.0 };

    let raw = (quality as f64 / 100.0
        + size_term(profile, encoded_size)
        + format_term(plan.format)
        + mode_bonus
        + complexity_bonus(profile.color_complexity))
        / 4.0;

    raw.clamp(0.0, 1.0)
}
