//! # Compressor Orchestrator Module
//!
//! Orchestratore principale che collega analisi, decisione e ricerca.
//!
//! ## Flusso:
//! 1. Validazione input (buffer non vuoto, target > 0)
//! 2. Decodifica con `image::load_from_memory`
//! 3. `ContentAnalyzer` → `ContentProfile`
//! 4. `decide` → `EncodingPlan`
//! 5. Preparazione copia di lavoro (sharpen / composizione alpha)
//! 6. `SearchEngine` → `SearchOutcome`
//!
//! ## Concorrenza:
//! Un singolo job è strettamente sequenziale. `compress_in_background` sposta
//! il job su un worker bloccante di tokio per non bloccare il runtime; job
//! indipendenti non condividono stato mutabile e possono girare in parallelo.
//!
//! ## Cancellazione:
//! Via broadcast channel, controllato all'inizio di ogni iterazione.

use crate::analyzer::{ContentAnalyzer, ContentProfile};
use crate::config::Config;
use crate::decision::{decide, EncodingPlan};
use crate::encoder::{prepare_working_image, CodecEncoder, EncoderAdapter};
use crate::error::CompressError;
use crate::search::{AttemptRecord, SearchEngine, SearchJob, SearchOutcome};
use crate::target::CompressionTarget;
use anyhow::Result;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Analysis and plan for one image, computed before the search
#[derive(Debug, Clone, PartialEq)]
pub struct Preparation {
    pub profile: ContentProfile,
    pub plan: EncodingPlan,
}

/// Entry point for compressing a single image to a byte budget
pub struct Compressor {
    config: Config,
    encoder: Arc<dyn EncoderAdapter>,
    stop_receiver: Option<broadcast::Receiver<()>>,
}

impl Compressor {
    /// Creates a compressor with the in-memory codec encoder.
    ///
    /// # Errors
    /// Returns an error if the configuration does not validate.
    pub fn new(config: Config) -> Result<Self, CompressError> {
        let encoder = Arc::new(CodecEncoder::new(&config));
        Self::with_encoder(config, encoder)
    }

    /// Creates a compressor around a custom encoder implementation.
    pub fn with_encoder(config: Config, encoder: Arc<dyn EncoderAdapter>) -> Result<Self, CompressError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder,
            stop_receiver: None,
        })
    }

    /// Creates a compressor that stops when a message arrives on `stop_receiver`.
    ///
    /// # Example
    /// ```rust,ignore
    /// let (stop_sender, stop_receiver) = Compressor::create_cancellation_channel(1);
    /// let compressor = Compressor::new_with_cancellation(Config::default(), stop_receiver)?;
    ///
    /// // To stop compression:
    /// stop_sender.send(()).unwrap();
    /// ```
    pub fn new_with_cancellation(config: Config, stop_receiver: broadcast::Receiver<()>) -> Result<Self, CompressError> {
        let mut compressor = Self::new(config)?;
        compressor.stop_receiver = Some(stop_receiver);
        Ok(compressor)
    }

    pub fn create_cancellation_channel(capacity: usize) -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
        broadcast::channel(capacity)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze and plan without encoding anything
    pub fn prepare(&self, image: &DynamicImage, target: &CompressionTarget) -> Result<Preparation, CompressError> {
        target.validate()?;
        let profile = ContentAnalyzer::new(&self.config).analyze(image);
        let plan = decide(&profile, target, &self.config);
        Ok(Preparation { profile, plan })
    }

    /// Compress raw image bytes in any container the `image` crate decodes
    pub fn compress(&mut self, bytes: &[u8], target: &CompressionTarget) -> Result<SearchOutcome, CompressError> {
        self.compress_with_observer(bytes, target, &mut |_| {})
    }

    pub fn compress_with_observer(
        &mut self,
        bytes: &[u8],
        target: &CompressionTarget,
        observer: &mut dyn FnMut(&AttemptRecord),
    ) -> Result<SearchOutcome, CompressError> {
        if bytes.is_empty() {
            return Err(CompressError::Validation("Input image buffer is empty".to_string()));
        }
        target.validate()?;

        let image = image::load_from_memory(bytes)?;
        debug!("Decoded {} byte input as {}x{} {:?}", bytes.len(), image.width(), image.height(), image.color());

        self.compress_image(&image, target, observer)
    }

    /// Compress an already decoded image
    pub fn compress_image(
        &mut self,
        image: &DynamicImage,
        target: &CompressionTarget,
        observer: &mut dyn FnMut(&AttemptRecord),
    ) -> Result<SearchOutcome, CompressError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CompressError::Validation("Input image has no pixels".to_string()));
        }

        let Preparation { profile, plan } = self.prepare(image, target)?;
        for reason in &plan.reasoning {
            debug!("Decision: {}", reason);
        }

        let working = prepare_working_image(image, &plan, &self.config);
        let job = SearchJob {
            image: &working,
            profile: &profile,
            plan: &plan,
            target,
        };

        let mut engine = SearchEngine::new(self.encoder.as_ref(), &self.config).with_observer(observer);
        if let Some(receiver) = self.stop_receiver.as_mut() {
            engine = engine.with_cancellation(receiver);
        }
        engine.run(&job)
    }

    /// Run the search on a blocking worker so async callers are not stalled.
    pub async fn compress_in_background<F>(
        mut self,
        bytes: Vec<u8>,
        target: CompressionTarget,
        mut observer: F,
    ) -> Result<SearchOutcome>
    where
        F: FnMut(&AttemptRecord) + Send + 'static,
    {
        let outcome = tokio::task::spawn_blocking(move || self.compress_with_observer(&bytes, &target, &mut observer))
            .await
            .map_err(|e| anyhow::anyhow!("Compression worker failed: {}", e))??;
        Ok(outcome)
    }

    /// Read an image file and compress it in the background
    pub async fn compress_file<F>(self, path: &Path, target: CompressionTarget, observer: F) -> Result<SearchOutcome>
    where
        F: FnMut(&AttemptRecord) + Send + 'static,
    {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        info!("Compressing {} ({} bytes) to {} bytes", path.display(), bytes.len(), target.target_size_bytes);
        self.compress_in_background(bytes, target, observer).await
    }
}
