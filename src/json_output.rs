//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per uso programmatico.
//!
//! ## Responsabilità:
//! - Emette una riga JSON per ogni evento della compressione
//! - Espone al chiamante formato, dimensione, qualità e traccia delle decisioni
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio compressione (input, budget, configurazione)
//! - `attempt`: Un tentativo di encoding della binary search
//! - `complete`: Risultato finale con reasoning
//! - `cancelled`: Job interrotto dal chiamante
//! - `error`: Errore durante l'elaborazione

use crate::search::{AttemptRecord, CompressionResult, Termination};
use crate::utils::calculate_reduction;
use crate::Config;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio della compressione
    #[serde(rename = "start")]
    Start {
        input: PathBuf,
        original_size: u64,
        target_size_bytes: u64,
        config: JsonConfig,
    },

    /// Un tentativo della ricerca
    #[serde(rename = "attempt")]
    Attempt {
        iteration: u32,
        quality: u8,
        size_bytes: Option<usize>,
        quality_score: f64,
        fits: bool,
    },

    /// Compressione completata
    #[serde(rename = "complete")]
    Complete {
        output: Option<PathBuf>,
        format: String,
        mime_type: String,
        quality_used: u8,
        size_bytes: usize,
        target_size_bytes: u64,
        meets_target: bool,
        quality_score: f64,
        termination: Termination,
        original_size: u64,
        reduction_percent: f64,
        attempts: usize,
        reasoning: Vec<String>,
    },

    /// Job cancellato
    #[serde(rename = "cancelled")]
    Cancelled { input: PathBuf },

    /// Errore generale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub max_iterations: u32,
    pub early_accept_score: f64,
    pub min_quality: u8,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(input: PathBuf, original_size: u64, target_size_bytes: u64, config: JsonConfig) -> Self {
        Self::Start {
            input,
            original_size,
            target_size_bytes,
            config,
        }
    }

    pub fn attempt(record: &AttemptRecord) -> Self {
        Self::Attempt {
            iteration: record.iteration,
            quality: record.quality,
            size_bytes: record.size_bytes,
            quality_score: record.quality_score,
            fits: record.fits,
        }
    }

    pub fn complete(result: &CompressionResult, output: Option<PathBuf>, original_size: u64) -> Self {
        Self::Complete {
            output,
            format: result.format().to_string(),
            mime_type: result.format().mime_type().to_string(),
            quality_used: result.quality_used,
            size_bytes: result.size_bytes,
            target_size_bytes: result.target_size_bytes,
            meets_target: result.meets_target(),
            quality_score: result.quality_score,
            termination: result.termination,
            original_size,
            reduction_percent: calculate_reduction(original_size, result.size_bytes as u64),
            attempts: result.attempts.len(),
            reasoning: result.plan.reasoning.clone(),
        }
    }

    pub fn cancelled(input: PathBuf) -> Self {
        Self::Cancelled { input }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

/// Converti Config in JsonConfig
impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_iterations: config.max_iterations,
            early_accept_score: config.early_accept_score,
            min_quality: config.min_quality,
        }
    }
}
