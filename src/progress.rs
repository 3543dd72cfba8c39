//! # Progress Tracking Module
//!
//! Questo modulo gestisce il feedback visivo durante la binary search.
//!
//! ## Responsabilità:
//! - Progress bar con `indicatif`, un tick per ogni tentativo di encoding
//! - Spinner per le fasi indeterminate (lettura e decodifica)
//! - Riepilogo finale di un job (`CompressionSummary`)
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:02] [=========>----------] 5/11 q=62 → 98.20 KB ✅
//! ```

use crate::search::{AttemptRecord, CompressionResult};
use crate::utils::{calculate_reduction, format_size};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for one compression job
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a progress bar sized for the worst-case number of attempts
    pub fn new(max_attempts: u64) -> Self {
        let bar = ProgressBar::new(max_attempts);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Tick the bar for one search attempt
    pub fn record_attempt(&self, record: &AttemptRecord) {
        self.update(&attempt_message(record));
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

/// One-line description of an attempt
pub fn attempt_message(record: &AttemptRecord) -> String {
    match record.size_bytes {
        Some(size) => format!(
            "q={} → {} {}",
            record.quality,
            format_size(size as u64),
            if record.fits { "✅" } else { "⬆️ over budget" }
        ),
        None => format!("q={} → encode failed", record.quality),
    }
}

/// Final figures of a compression job
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionSummary {
    pub original_size: u64,
    pub final_size: u64,
    pub target_size: u64,
    /// Encoded size over original size
    pub compression_ratio: f64,
    pub format: String,
    pub quality_used: u8,
    pub quality_score: f64,
    pub attempts: usize,
    pub meets_target: bool,
}

impl CompressionSummary {
    pub fn from_result(result: &CompressionResult, original_size: u64) -> Self {
        Self {
            original_size,
            final_size: result.size_bytes as u64,
            target_size: result.target_size_bytes,
            compression_ratio: result.compression_ratio(original_size),
            format: result.format().to_string(),
            quality_used: result.quality_used,
            quality_score: result.quality_score,
            attempts: result.attempts.len(),
            meets_target: result.meets_target(),
        }
    }

    pub fn reduction_percent(&self) -> f64 {
        calculate_reduction(self.original_size, self.final_size)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "{} q{} | {} → {} ({:.2}%, ratio {:.2}) | target {} {} | score {:.3} | {} attempts",
            self.format,
            self.quality_used,
            format_size(self.original_size),
            format_size(self.final_size),
            self.reduction_percent(),
            self.compression_ratio,
            format_size(self.target_size),
            if self.meets_target { "met" } else { "missed" },
            self.quality_score,
            self.attempts
        )
    }
}
