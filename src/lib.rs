//! # Smart Image Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! Data un'immagine e un budget in byte, sceglie formato e modalità in base al
//! contenuto e cerca la qualità più alta che rientra nel budget.
//!
//! ## Architettura dei moduli:
//! - `config`: Euristiche configurabili e validazione parametri
//! - `error`: Tipi di errore custom
//! - `target`: Budget in byte e preset
//! - `analyzer`: Profilo del contenuto (trasparenza, complessità colore, aspetto)
//! - `decision`: Formato, modalità e bound della ricerca
//! - `encoder`: Adapter verso i codec JPEG/PNG/WebP
//! - `scorer`: Score euristico di qualità per tentativo
//! - `search`: Binary search limitata sulla qualità
//! - `compressor`: Orchestratore del job
//! - `progress` / `json_output`: Feedback per la CLI
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use smart_image_compressor::{CompressionPreset, CompressionTarget, Compressor, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("photo.png")?;
//! let target = CompressionTarget::from_preset(CompressionPreset::InstagramPost)?;
//! let mut compressor = Compressor::new(Config::default())?;
//! if let Some(result) = compressor.compress(&bytes, &target)?.into_result() {
//!     println!("{} at q{}: {} bytes", result.format(), result.quality_used, result.size_bytes);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod compressor;
pub mod config;
pub mod decision;
pub mod encoder;
pub mod error;
pub mod json_output;
pub mod progress;
pub mod scorer;
pub mod search;
pub mod target;
pub mod utils;

pub use analyzer::{AspectClass, ColorComplexity, ContentAnalyzer, ContentProfile};
pub use compressor::{Compressor, Preparation};
pub use config::Config;
pub use decision::{EncodingPlan, Enhancement, OutputFormat, QualityMode};
pub use encoder::{CodecEncoder, EncodedImage, EncoderAdapter};
pub use error::CompressError;
pub use search::{AttemptRecord, CompressionResult, SearchOutcome, Termination};
pub use target::{CompressionPreset, CompressionTarget};
