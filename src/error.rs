//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di decodifica/codifica del crate `image`
//! - `Encode`: Fallimento di un singolo tentativo di encoding
//! - `Validation`: Violazione del contratto del chiamante (buffer vuoto, target zero)
//! - `Config`: Parametri di configurazione fuori range
//!
//! ## Cosa NON è un errore:
//! - Analisi fallita: l'analyzer ritorna un profilo di default
//! - Target irraggiungibile: risultato valido con `size_bytes` oltre il budget
//! - Cancellazione: esito distinto (`SearchOutcome::Cancelled`)
//!
//! ## Esempio:
//! ```rust,ignore
//! if bytes.is_empty() {
//!     return Err(CompressError::Validation("input buffer is empty".to_string()));
//! }
//! ```

use crate::decision::OutputFormat;

/// Custom error types for target-size compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{format} encoding failed: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },

    #[error("Input validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CompressError {
    pub fn encode(format: OutputFormat, message: impl Into<String>) -> Self {
        Self::Encode {
            format,
            message: message.into(),
        }
    }
}
