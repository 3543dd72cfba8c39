//! # Compression Target Module
//!
//! Definisce il budget in byte richiesto dal chiamante e i preset disponibili.
//!
//! ## Responsabilità:
//! - `CompressionPreset`: i sei preset (YouTube, Instagram, Web Banner, Email, Social, Custom)
//! - `CompressionTarget`: budget in byte + eventuale hint di modalità
//! - Validazione: il budget deve essere > 0

use crate::decision::QualityMode;
use crate::error::CompressError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named byte budgets offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionPreset {
    YoutubeThumbnail,
    InstagramPost,
    WebBanner,
    EmailAttachment,
    SocialMedia,
    /// Arbitrary budget in kilobytes
    Custom(u64),
}

impl CompressionPreset {
    /// Budget of the preset in KB (1 KB = 1024 bytes)
    pub fn target_kb(&self) -> u64 {
        match self {
            Self::YoutubeThumbnail => 50,
            Self::InstagramPost => 100,
            Self::WebBanner => 200,
            Self::EmailAttachment => 150,
            Self::SocialMedia => 80,
            Self::Custom(kb) => *kb,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::YoutubeThumbnail => "YouTube Thumbnail",
            Self::InstagramPost => "Instagram Post",
            Self::WebBanner => "Web Banner",
            Self::EmailAttachment => "Email Attachment",
            Self::SocialMedia => "Social Media",
            Self::Custom(_) => "Custom",
        }
    }
}

impl fmt::Display for CompressionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} KB)", self.label(), self.target_kb())
    }
}

/// Byte budget the compressed output should not exceed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionTarget {
    pub target_size_bytes: u64,
    /// Overrides the mode derived from the content profile
    pub mode_hint: Option<QualityMode>,
}

impl CompressionTarget {
    pub fn from_bytes(target_size_bytes: u64) -> Result<Self, CompressError> {
        if target_size_bytes == 0 {
            return Err(CompressError::Validation(
                "Target size must be greater than 0 bytes".to_string(),
            ));
        }
        Ok(Self {
            target_size_bytes,
            mode_hint: None,
        })
    }

    pub fn from_kb(target_kb: u64) -> Result<Self, CompressError> {
        Self::from_bytes(target_kb.saturating_mul(1024))
    }

    pub fn from_preset(preset: CompressionPreset) -> Result<Self, CompressError> {
        Self::from_kb(preset.target_kb())
    }

    pub fn with_mode_hint(mut self, mode: QualityMode) -> Self {
        self.mode_hint = Some(mode);
        self
    }

    pub fn target_kb(&self) -> f64 {
        self.target_size_bytes as f64 / 1024.0
    }

    /// Caller contract check, repeated before every search
    pub fn validate(&self) -> Result<(), CompressError> {
        if self.target_size_bytes == 0 {
            return Err(CompressError::Validation(
                "Target size must be greater than 0 bytes".to_string(),
            ));
        }
        Ok(())
    }
}
