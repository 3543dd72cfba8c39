//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione del motore di compressione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutte le soglie euristiche del motore
//! - Fornisce validazione robusta dei parametri
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `sample_window`: Lato della finestra di campionamento top-left (default: 100)
//! - `complexity_sample_limit`: Pixel massimi per la complessità colore (default: 1000)
//! - `high_complexity_threshold` / `medium_complexity_threshold`: Soglie varianza (50 / 25)
//! - `square_tolerance` / `landscape_ratio`: Classi di aspect ratio (0.1 / 1.2)
//! - `png_transparency_ratio`: Quota di pixel trasparenti che forza PNG (0.1)
//! - `small_image_edge`: Lato minimo sotto cui si privilegia la qualità (500)
//! - `early_accept_score`: Score oltre cui la modalità Quality si ferma (0.8).
//!   Con i bound Quality di default (70-95) lo score massimo è 0.775 per JPEG
//!   e 0.8 esatto per WebP (con dimensione zero): la soglia di default non viene
//!   mai superata. Per rendere attivo l'early accept va abbassata (es. 0.75).
//! - `max_iterations`: Iterazioni massime della binary search (10)
//! - `min_quality`: Qualità minima mai inviata all'encoder (10)
//! - `jpeg_quality_boost` / `jpeg_quality_cap`: Inflazione qualità JPEG (1.1 / 95)
//! - `background`: Colore su cui si compone l'alpha per JPEG (default: bianco)
//! - `sharpen_sigma` / `sharpen_threshold`: Parametri unsharp mask
//! - `json_output`: Output JSON per uso programmatico (default: false)
//!
//! Le soglie sono costanti empiriche, non derivate: vanno trattate come tuning.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     early_accept_score: 0.75,
//!     max_iterations: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::CompressError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable heuristics and runtime options for the compression engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Side of the top-left analysis window, in pixels
    pub sample_window: u32,
    /// Upper bound on pixels visited by the color complexity pass
    pub complexity_sample_limit: usize,
    /// Color variance above which content counts as High complexity
    pub high_complexity_threshold: f64,
    /// Color variance above which content counts as Medium complexity
    pub medium_complexity_threshold: f64,
    /// Max distance of width/height from 1.0 for a Square image
    pub square_tolerance: f64,
    /// Width/height ratio above which an image is Landscape
    pub landscape_ratio: f64,
    /// Transparent pixel ratio above which PNG is chosen
    pub png_transparency_ratio: f64,
    /// Images whose short edge is below this favor fidelity
    pub small_image_edge: u32,
    /// Score above which a Quality-mode search accepts the current attempt.
    /// Never exceeded at the default of 0.8 with quality capped at 95; lower it to enable early accept.
    pub early_accept_score: f64,
    /// Maximum bisection steps before the search is forced to finish
    pub max_iterations: u32,
    /// Lowest quality ever passed to an encoder
    pub min_quality: u8,
    /// Multiplier applied to the nominal quality for JPEG
    pub jpeg_quality_boost: f64,
    /// Ceiling for the boosted JPEG quality
    pub jpeg_quality_cap: u8,
    /// RGB background used when flattening alpha for JPEG
    pub background: [u8; 3],
    /// Unsharp mask sigma for the Sharpen enhancement
    pub sharpen_sigma: f32,
    /// Unsharp mask threshold for the Sharpen enhancement
    pub sharpen_threshold: i32,
    /// Output progress and results as JSON lines for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_window: 100,
            complexity_sample_limit: 1000,
            high_complexity_threshold: 50.0,
            medium_complexity_threshold: 25.0,
            square_tolerance: 0.1,
            landscape_ratio: 1.2,
            png_transparency_ratio: 0.1,
            small_image_edge: 500,
            early_accept_score: 0.8,
            max_iterations: 10,
            min_quality: 10,
            jpeg_quality_boost: 1.1,
            jpeg_quality_cap: 95,
            background: [255, 255, 255],
            sharpen_sigma: 0.8,
            sharpen_threshold: 2,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), CompressError> {
        if self.sample_window == 0 {
            return Err(CompressError::Config("Sample window must be greater than 0".to_string()));
        }

        if self.complexity_sample_limit == 0 {
            return Err(CompressError::Config("Complexity sample limit must be greater than 0".to_string()));
        }

        if self.medium_complexity_threshold < 0.0
            || self.high_complexity_threshold < self.medium_complexity_threshold
            || self.high_complexity_threshold > 128.0
        {
            return Err(CompressError::Config(
                "Complexity thresholds must satisfy 0 <= medium <= high <= 128".to_string(),
            ));
        }

        if self.square_tolerance < 0.0 || self.landscape_ratio <= 1.0 {
            return Err(CompressError::Config(
                "Square tolerance must be >= 0 and landscape ratio must be > 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.png_transparency_ratio) {
            return Err(CompressError::Config("PNG transparency ratio must be between 0.0 and 1.0".to_string()));
        }

        if !(0.0..=1.0).contains(&self.early_accept_score) {
            return Err(CompressError::Config("Early accept score must be between 0.0 and 1.0".to_string()));
        }

        if self.max_iterations == 0 {
            return Err(CompressError::Config("Max iterations must be greater than 0".to_string()));
        }

        if self.min_quality == 0 || self.min_quality > 100 {
            return Err(CompressError::Config("Minimum quality must be between 1 and 100".to_string()));
        }

        if self.jpeg_quality_boost <= 0.0 {
            return Err(CompressError::Config("JPEG quality boost must be positive".to_string()));
        }

        if self.jpeg_quality_cap == 0 || self.jpeg_quality_cap > 100 {
            return Err(CompressError::Config("JPEG quality cap must be between 1 and 100".to_string()));
        }

        if self.sharpen_sigma < 0.0 {
            return Err(CompressError::Config("Sharpen sigma must be >= 0".to_string()));
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
