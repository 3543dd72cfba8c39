//! # Search Engine Module
//!
//! Binary search limitata sulla qualità per avvicinarsi al budget in byte.
//!
//! ## Macchina a stati:
//! ```text
//! Searching ──► Converged   (low ≥ high, oppure early accept in modalità Quality)
//!     │
//!     ├───────► Exhausted   (raggiunto il limite di iterazioni)
//!     │
//!     └───────► Cancelled   (segnale di stop ricevuto tra due iterazioni)
//! ```
//!
//! ## Convenzione di ordinamento:
//! Qualità più alta ⇒ file più grande o uguale. Quindi:
//! - tentativo dentro il budget → registrato come candidato, si cerca nella
//!   metà alta (`low = mid + 1`) per recuperare qualità
//! - tentativo fuori budget (o fallito) → si cerca nella metà bassa (`high = mid`)
//!
//! `low ≤ high` vale ad ogni passo; al massimo `max_iterations + 1` encode.
//!
//! ## Garanzie:
//! - Il risultato è il tentativo con qualità più alta dentro il budget;
//!   se il budget non viene mai rispettato, il tentativo più piccolo
//! - Target irraggiungibile → risultato valido con `size_bytes > target`
//! - Encode fallito → trattato come dimensione infinita, nessun retry
//! - Errore solo se nessun tentativo ha prodotto byte

use crate::analyzer::ContentProfile;
use crate::config::Config;
use crate::decision::{EncodingPlan, OutputFormat, QualityMode};
use crate::encoder::EncoderAdapter;
use crate::error::CompressError;
use crate::scorer;
use crate::target::CompressionTarget;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Default cap on bisection steps
pub const MAX_ITERATIONS: u32 = 10;

/// Bounds of the remaining quality interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub low: u8,
    pub high: u8,
    pub iteration: u32,
}

impl SearchState {
    pub fn from_plan(plan: &EncodingPlan) -> Self {
        Self {
            low: plan.search_low.min(plan.search_high),
            high: plan.search_low.max(plan.search_high),
            iteration: 0,
        }
    }
}

/// One encode call as seen by the search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub iteration: u32,
    pub quality: u8,
    /// `None` when the encoder failed
    pub size_bytes: Option<usize>,
    pub quality_score: f64,
    pub fits: bool,
}

/// How the search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The interval collapsed
    Converged,
    /// Quality mode accepted a good-enough attempt
    EarlyAccept,
    /// The iteration cap was reached
    Exhausted,
    /// Lossless format: a single encode decides the size
    Lossless,
}

/// Final output of a search
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub encoded_bytes: Vec<u8>,
    pub quality_used: u8,
    pub size_bytes: usize,
    pub quality_score: f64,
    pub plan: EncodingPlan,
    pub target_size_bytes: u64,
    pub termination: Termination,
    pub attempts: Vec<AttemptRecord>,
}

impl CompressionResult {
    pub fn format(&self) -> OutputFormat {
        self.plan.format
    }

    pub fn meets_target(&self) -> bool {
        self.size_bytes as u64 <= self.target_size_bytes
    }

    pub fn file_extension(&self) -> &'static str {
        self.plan.format.extension()
    }

    /// Encoded size over the original size (lower is better)
    pub fn compression_ratio(&self, original_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            self.size_bytes as f64 / original_size as f64
        }
    }

    pub fn reasoning(&self) -> &[String] {
        &self.plan.reasoning
    }
}

/// Terminal outcome of `SearchEngine::run`
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Completed(CompressionResult),
    Cancelled,
}

impl SearchOutcome {
    pub fn into_result(self) -> Option<CompressionResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Everything a search needs to know about the image being compressed
pub struct SearchJob<'a> {
    /// Working copy, already enhanced and composited
    pub image: &'a DynamicImage,
    pub profile: &'a ContentProfile,
    pub plan: &'a EncodingPlan,
    pub target: &'a CompressionTarget,
}

enum SearchStep {
    Searching(SearchState),
    Done(CompressionResult),
}

struct Candidate {
    quality: u8,
    bytes: Vec<u8>,
    score: f64,
}

/// Best attempts seen so far plus the full trace
#[derive(Default)]
struct Candidates {
    best_fit: Option<Candidate>,
    smallest: Option<Candidate>,
    attempts: Vec<AttemptRecord>,
    last_error: Option<CompressError>,
}

impl Candidates {
    fn tried(&self, quality: u8) -> bool {
        self.attempts.iter().any(|a| a.quality == quality)
    }

    fn offer(&mut self, candidate: Candidate, fits: bool) {
        if fits {
            let better = self
                .best_fit
                .as_ref()
                .map_or(true, |best| candidate.quality > best.quality);
            if better {
                self.best_fit = Some(candidate);
            }
            // Once something fits the oversized fallback is never returned
            self.smallest = None;
        } else if self.best_fit.is_none() {
            let smaller = self
                .smallest
                .as_ref()
                .map_or(true, |small| candidate.bytes.len() < small.bytes.len());
            if smaller {
                self.smallest = Some(candidate);
            }
        }
    }
}

/// Drives an encoder toward a byte budget
pub struct SearchEngine<'a> {
    encoder: &'a dyn EncoderAdapter,
    config: &'a Config,
    stop_receiver: Option<&'a mut broadcast::Receiver<()>>,
    observer: Option<&'a mut (dyn FnMut(&AttemptRecord) + 'a)>,
}

impl<'a> SearchEngine<'a> {
    pub fn new(encoder: &'a dyn EncoderAdapter, config: &'a Config) -> Self {
        Self {
            encoder,
            config,
            stop_receiver: None,
            observer: None,
        }
    }

    /// Poll `stop_receiver` at the top of every iteration
    pub fn with_cancellation(mut self, stop_receiver: &'a mut broadcast::Receiver<()>) -> Self {
        self.stop_receiver = Some(stop_receiver);
        self
    }

    /// Called once per encode attempt, in order
    pub fn with_observer(mut self, observer: &'a mut (dyn FnMut(&AttemptRecord) + 'a)) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Checks if a stop signal has been received.
    fn should_stop(&mut self) -> bool {
        if let Some(receiver) = self.stop_receiver.as_mut() {
            match receiver.try_recv() {
                Ok(_) => return true,
                Err(broadcast::error::TryRecvError::Empty) => return false,
                // Signal was sent but we missed it, treat as stop
                Err(broadcast::error::TryRecvError::Lagged(_)) => return true,
                // Sender was dropped, continue processing
                Err(broadcast::error::TryRecvError::Closed) => return false,
            }
        }
        false
    }

    /// Run the search to completion or cancellation.
    ///
    /// # Errors
    /// Only for caller contract violations (zero target) or when not a
    /// single encode attempt produced any bytes.
    pub fn run(&mut self, job: &SearchJob<'_>) -> Result<SearchOutcome, CompressError> {
        job.target.validate()?;
        let mut candidates = Candidates::default();

        if !job.plan.format.is_lossy() {
            if self.should_stop() {
                info!("Search cancelled before the first encode");
                return Ok(SearchOutcome::Cancelled);
            }
            let quality = job.plan.search_high.max(self.config.min_quality);
            self.attempt(job, &mut candidates, quality, 0);
            return self
                .finish(job, candidates, Termination::Lossless)
                .map(SearchOutcome::Completed);
        }

        let mut state = SearchState::from_plan(job.plan);
        loop {
            if self.should_stop() {
                info!("Search cancelled at iteration {} (quality {}-{})", state.iteration, state.low, state.high);
                return Ok(SearchOutcome::Cancelled);
            }

            match self.step(job, state, &mut candidates)? {
                SearchStep::Searching(next) => state = next,
                SearchStep::Done(result) => return Ok(SearchOutcome::Completed(result)),
            }
        }
    }

    fn step(
        &mut self,
        job: &SearchJob<'_>,
        state: SearchState,
        candidates: &mut Candidates,
    ) -> Result<SearchStep, CompressError> {
        debug_assert!(state.low <= state.high);

        if state.low >= state.high || state.iteration >= self.config.max_iterations {
            let termination = if state.low >= state.high {
                Termination::Converged
            } else {
                Termination::Exhausted
            };
            let quality = state.low.max(self.config.min_quality);
            if !candidates.tried(quality) {
                self.attempt(job, candidates, quality, state.iteration);
            }
            return self
                .finish(job, std::mem::take(candidates), termination)
                .map(SearchStep::Done);
        }

        let mid = ((state.low as u16 + state.high as u16) / 2) as u8;
        let attempt = self.attempt(job, candidates, mid.max(self.config.min_quality), state.iteration);

        if attempt.fits {
            if job.plan.quality_mode == QualityMode::Quality && attempt.quality_score > self.config.early_accept_score {
                debug!("Quality {} scored {:.3}, accepting early", attempt.quality, attempt.quality_score);
                return self
                    .finish(job, std::mem::take(candidates), Termination::EarlyAccept)
                    .map(SearchStep::Done);
            }
            Ok(SearchStep::Searching(SearchState {
                low: mid + 1,
                high: state.high,
                iteration: state.iteration + 1,
            }))
        } else {
            Ok(SearchStep::Searching(SearchState {
                low: state.low,
                high: mid,
                iteration: state.iteration + 1,
            }))
        }
    }

    fn attempt(
        &mut self,
        job: &SearchJob<'_>,
        candidates: &mut Candidates,
        quality: u8,
        iteration: u32,
    ) -> AttemptRecord {
        let record = match self.encoder.encode(job.image, job.plan.format, quality) {
            Ok(encoded) => {
                let size = encoded.size();
                let quality_score = scorer::score(job.profile, size, quality, job.plan);
                let fits = size as u64 <= job.target.target_size_bytes;
                candidates.offer(
                    Candidate {
                        quality,
                        bytes: encoded.bytes,
                        score: quality_score,
                    },
                    fits,
                );
                AttemptRecord {
                    iteration,
                    quality,
                    size_bytes: Some(size),
                    quality_score,
                    fits,
                }
            }
            Err(e) => {
                warn!("Encode at quality {} failed, treating as oversized: {}", quality, e);
                candidates.last_error = Some(e);
                AttemptRecord {
                    iteration,
                    quality,
                    size_bytes: None,
                    quality_score: 0.0,
                    fits: false,
                }
            }
        };

        debug!(
            "Attempt {}: quality {} -> {:?} bytes (target {}), score {:.3}, fits={}",
            iteration, quality, record.size_bytes, job.target.target_size_bytes, record.quality_score, record.fits
        );

        if let Some(observer) = self.observer.as_mut() {
            observer(&record);
        }
        candidates.attempts.push(record.clone());
        record
    }

    fn finish(
        &self,
        job: &SearchJob<'_>,
        candidates: Candidates,
        termination: Termination,
    ) -> Result<CompressionResult, CompressError> {
        let Candidates {
            best_fit,
            smallest,
            attempts,
            last_error,
        } = candidates;

        let chosen = match best_fit.or(smallest) {
            Some(candidate) => candidate,
            None => {
                return Err(last_error.unwrap_or_else(|| {
                    CompressError::encode(job.plan.format, "no encode attempt produced output")
                }))
            }
        };

        let result = CompressionResult {
            size_bytes: chosen.bytes.len(),
            encoded_bytes: chosen.bytes,
            quality_used: chosen.quality,
            quality_score: chosen.score,
            plan: job.plan.clone(),
            target_size_bytes: job.target.target_size_bytes,
            termination,
            attempts,
        };

        if result.meets_target() {
            info!(
                "{:?}: {} at quality {} -> {} bytes (target {}), score {:.3}, {} attempts",
                termination,
                result.format(),
                result.quality_used,
                result.size_bytes,
                result.target_size_bytes,
                result.quality_score,
                result.attempts.len()
            );
        } else {
            warn!(
                "{:?}: target {} bytes unreachable, smallest {} output is {} bytes at quality {}",
                termination,
                result.target_size_bytes,
                result.format(),
                result.size_bytes,
                result.quality_used
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AspectClass, ColorComplexity, ContentAnalyzer};
    use crate::decision::{decide, Enhancement};
    use crate::encoder::{CodecEncoder, EncodedImage};
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Size grows linearly with quality: `quality * bytes_per_step`
    struct LinearEncoder {
        bytes_per_step: usize,
        fail_above: Option<u8>,
        calls: AtomicUsize,
        stop_after: Option<(usize, broadcast::Sender<()>)>,
    }

    impl LinearEncoder {
        fn new(bytes_per_step: usize) -> Self {
            Self {
                bytes_per_step,
                fail_above: None,
                calls: AtomicUsize::new(0),
                stop_after: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EncoderAdapter for LinearEncoder {
        fn encode(&self, _image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<EncodedImage, CompressError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((after, sender)) = &self.stop_after {
                if call == *after {
                    let _ = sender.send(());
                }
            }
            if self.fail_above.map_or(false, |limit| quality > limit) {
                return Err(CompressError::encode(format, "simulated failure"));
            }
            Ok(EncodedImage {
                bytes: vec![0u8; quality as usize * self.bytes_per_step],
                format,
                quality,
            })
        }
    }

    fn profile(width: u32, height: u32) -> ContentProfile {
        ContentProfile {
            has_transparency: false,
            transparent_pixel_ratio: 0.0,
            color_complexity: ColorComplexity::Medium,
            aspect_class: AspectClass::Landscape,
            width,
            height,
        }
    }

    fn plan(format: OutputFormat, mode: QualityMode, low: u8, high: u8) -> EncodingPlan {
        EncodingPlan {
            format,
            quality_mode: mode,
            reasoning: vec!["test plan".to_string()],
            search_low: low,
            search_high: high,
            enhancement: Enhancement::None,
        }
    }

    fn run_search(
        encoder: &dyn EncoderAdapter,
        config: &Config,
        plan: &EncodingPlan,
        target_bytes: u64,
    ) -> Result<SearchOutcome, CompressError> {
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let profile = profile(1000, 1000);
        let target = CompressionTarget::from_bytes(target_bytes).unwrap();
        let job = SearchJob {
            image: &image,
            profile: &profile,
            plan,
            target: &target,
        };
        SearchEngine::new(encoder, config).run(&job)
    }

    #[test]
    fn test_finds_highest_quality_within_budget() {
        let config = Config::default();
        let encoder = LinearEncoder::new(1000);
        let plan = plan(OutputFormat::Jpeg, QualityMode::Balanced, 30, 70);

        let result = run_search(&encoder, &config, &plan, 55_000).unwrap().into_result().unwrap();
        assert_eq!(result.quality_used, 55);
        assert_eq!(result.size_bytes, 55_000);
        assert!(result.meets_target());
        assert_eq!(result.termination, Termination::Converged);
        assert_eq!(result.attempts.len(), encoder.calls());
        assert!(encoder.calls() <= MAX_ITERATIONS as usize + 1);
    }

    #[test]
    fn test_attempts_stay_within_bounds() {
        let config = Config::default();
        let encoder = LinearEncoder::new(997);
        let plan = plan(OutputFormat::WebP, QualityMode::Balanced, 40, 80);

        let result = run_search(&encoder, &config, &plan, 61_234).unwrap().into_result().unwrap();
        assert!(result.attempts.iter().all(|a| (40..=80).contains(&a.quality)));
        // The chosen quality fits and the next one up does not
        assert!(result.size_bytes <= 61_234);
        assert!((result.quality_used as usize + 1) * 997 > 61_234);
    }

    #[test]
    fn test_unreachable_target_returns_smallest_attempt() {
        let config = Config::default();
        let encoder = LinearEncoder::new(1000);
        let plan = plan(OutputFormat::Jpeg, QualityMode::Balanced, 30, 70);

        let result = run_search(&encoder, &config, &plan, 100).unwrap().into_result().unwrap();
        assert!(!result.meets_target());
        assert!(result.size_bytes > 100);
        assert_eq!(result.quality_used, 30);
        assert_eq!(result.size_bytes, 30_000);
        assert!(encoder.calls() <= MAX_ITERATIONS as usize + 1);
    }

    #[test]
    fn test_termination_within_iteration_cap() {
        let config = Config::default();
        for target in [1, 999, 10_000, 42_424, 69_999, 70_000, 1_000_000] {
            let encoder = LinearEncoder::new(1000);
            let plan = plan(OutputFormat::Jpeg, QualityMode::Size, 0, 100);
            run_search(&encoder, &config, &plan, target).unwrap();
            assert!(encoder.calls() <= config.max_iterations as usize + 1, "target {}", target);
        }
    }

    #[test]
    fn test_exhausted_when_cap_is_small() {
        let config = Config {
            max_iterations: 2,
            ..Default::default()
        };
        let encoder = LinearEncoder::new(1000);
        let plan = plan(OutputFormat::Jpeg, QualityMode::Balanced, 10, 90);

        let result = run_search(&encoder, &config, &plan, 45_000).unwrap().into_result().unwrap();
        assert_eq!(result.termination, Termination::Exhausted);
        assert!(encoder.calls() <= 3);
        assert!(result.meets_target());
    }

    #[test]
    fn test_encode_failures_push_search_down() {
        let config = Config::default();
        let mut encoder = LinearEncoder::new(1000);
        encoder.fail_above = Some(60);
        let plan = plan(OutputFormat::WebP, QualityMode::Balanced, 50, 85);

        let result = run_search(&encoder, &config, &plan, 1_000_000).unwrap().into_result().unwrap();
        assert_eq!(result.quality_used, 60);
        assert!(result.attempts.iter().any(|a| a.size_bytes.is_none()));
    }

    #[test]
    fn test_all_encodes_failing_is_an_error() {
        let config = Config::default();
        let mut encoder = LinearEncoder::new(1000);
        encoder.fail_above = Some(0);
        let plan = plan(OutputFormat::Jpeg, QualityMode::Balanced, 30, 70);

        let outcome = run_search(&encoder, &config, &plan, 50_000);
        assert!(matches!(outcome, Err(CompressError::Encode { .. })));
    }

    #[test]
    fn test_quality_mode_accepts_early() {
        let config = Config {
            early_accept_score: 0.7,
            ..Default::default()
        };
        let encoder = LinearEncoder::new(10);
        let plan = plan(OutputFormat::WebP, QualityMode::Quality, 70, 95);

        let result = run_search(&encoder, &config, &plan, 100_000).unwrap().into_result().unwrap();
        assert_eq!(result.termination, Termination::EarlyAccept);
        assert_eq!(encoder.calls(), 1);
        assert_eq!(result.quality_used, 82);
        assert!(result.quality_score > 0.7);
    }

    #[test]
    fn test_balanced_mode_never_accepts_early() {
        let config = Config {
            early_accept_score: 0.0,
            ..Default::default()
        };
        let encoder = LinearEncoder::new(10);
        let plan = plan(OutputFormat::WebP, QualityMode::Balanced, 50, 85);

        let result = run_search(&encoder, &config, &plan, 100_000).unwrap().into_result().unwrap();
        assert_ne!(result.termination, Termination::EarlyAccept);
        assert_eq!(result.quality_used, 85);
    }

    #[test]
    fn test_lossless_format_encodes_once() {
        let config = Config::default();
        let encoder = LinearEncoder::new(1000);
        let plan = plan(OutputFormat::Png, QualityMode::Balanced, 30, 70);

        let result = run_search(&encoder, &config, &plan, 10).unwrap().into_result().unwrap();
        assert_eq!(encoder.calls(), 1);
        assert_eq!(result.termination, Termination::Lossless);
        assert_eq!(result.quality_used, 70);
    }

    #[test]
    fn test_cancelled_before_start() {
        let config = Config::default();
        let encoder = LinearEncoder::new(1000);
        let plan = plan(OutputFormat::Jpeg, QualityMode::Balanced, 30, 70);
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let profile = profile(100, 100);
        let target = CompressionTarget::from_bytes(50_000).unwrap();
        let job = SearchJob {
            image: &image,
            profile: &profile,
            plan: &plan,
            target: &target,
        };

        let (sender, mut receiver) = broadcast::channel(1);
        sender.send(()).unwrap();
        let outcome = SearchEngine::new(&encoder, &config)
            .with_cancellation(&mut receiver)
            .run(&job)
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(encoder.calls(), 0);
    }

    #[test]
    fn test_cancelled_between_iterations() {
        let config = Config::default();
        let (sender, mut receiver) = broadcast::channel(1);
        let mut encoder = LinearEncoder::new(1000);
        encoder.stop_after = Some((2, sender));
        let plan = plan(OutputFormat::Jpeg, QualityMode::Balanced, 30, 70);
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let profile = profile(100, 100);
        let target = CompressionTarget::from_bytes(50_000).unwrap();
        let job = SearchJob {
            image: &image,
            profile: &profile,
            plan: &plan,
            target: &target,
        };

        let outcome = SearchEngine::new(&encoder, &config)
            .with_cancellation(&mut receiver)
            .run(&job)
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Cancelled);
        assert_eq!(encoder.calls(), 2);
    }

    #[test]
    fn test_observer_sees_every_attempt() {
        let config = Config::default();
        let encoder = LinearEncoder::new(1000);
        let plan = plan(OutputFormat::Jpeg, QualityMode::Balanced, 30, 70);
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let profile = profile(100, 100);
        let target = CompressionTarget::from_bytes(42_000).unwrap();
        let job = SearchJob {
            image: &image,
            profile: &profile,
            plan: &plan,
            target: &target,
        };

        let seen = Mutex::new(Vec::new());
        let mut observer = |record: &AttemptRecord| seen.lock().unwrap().push(record.quality);
        let result = SearchEngine::new(&encoder, &config)
            .with_observer(&mut observer)
            .run(&job)
            .unwrap()
            .into_result()
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), result.attempts.len());
        assert_eq!(seen[0], 50);
    }

    #[test]
    fn test_zero_target_fails_fast() {
        let config = Config::default();
        let encoder = LinearEncoder::new(1000);
        let plan = plan(OutputFormat::Jpeg, QualityMode::Balanced, 30, 70);
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let profile = profile(100, 100);
        let target = CompressionTarget {
            target_size_bytes: 0,
            mode_hint: None,
        };
        let job = SearchJob {
            image: &image,
            profile: &profile,
            plan: &plan,
            target: &target,
        };

        assert!(matches!(
            SearchEngine::new(&encoder, &config).run(&job),
            Err(CompressError::Validation(_))
        ));
        assert_eq!(encoder.calls(), 0);
    }

    #[test]
    fn test_unreachable_target_on_large_photo() {
        // 4000x3000 opaque photo-like content against a 100 byte budget
        let config = Config::default();
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(4000, 3000, |x, y| {
            Rgb([(x % 251) as u8, (y % 241) as u8, ((x * 7 + y * 13) % 256) as u8])
        }));
        let profile = ContentAnalyzer::new(&config).analyze(&image);
        let target = CompressionTarget::from_bytes(100).unwrap();
        let plan = decide(&profile, &target, &config);
        assert_ne!(plan.format, OutputFormat::Png);

        // Size model proportional to pixel count keeps the test fast
        let encoder = LinearEncoder::new(4000 * 3000 / 200);
        let job = SearchJob {
            image: &image,
            profile: &profile,
            plan: &plan,
            target: &target,
        };
        let result = SearchEngine::new(&encoder, &config)
            .run(&job)
            .unwrap()
            .into_result()
            .unwrap();

        assert!(result.size_bytes as u64 > target.target_size_bytes);
        assert_eq!(result.quality_used, plan.search_low);
        assert!(encoder.calls() <= MAX_ITERATIONS as usize + 1);
    }

    /// Counts calls into the real codecs
    struct CountingEncoder {
        inner: CodecEncoder,
        calls: AtomicUsize,
    }

    impl EncoderAdapter for CountingEncoder {
        fn encode(&self, image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<EncodedImage, CompressError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.encode(image, format, quality)
        }
    }

    #[test]
    #[ignore = "encodes a 12 MP image several times; run with --ignored"]
    fn test_unreachable_target_with_real_codecs() {
        let config = Config::default();
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(4000, 3000, |x, y| {
            Rgb([(x % 251) as u8, (y % 241) as u8, ((x * 7 + y * 13) % 256) as u8])
        }));
        let profile = ContentAnalyzer::new(&config).analyze(&image);
        let target = CompressionTarget::from_bytes(100).unwrap();
        let plan = decide(&profile, &target, &config);
        assert!(plan.format.is_lossy());

        let encoder = CountingEncoder {
            inner: CodecEncoder::new(&config),
            calls: AtomicUsize::new(0),
        };
        let job = SearchJob {
            image: &image,
            profile: &profile,
            plan: &plan,
            target: &target,
        };
        let result = SearchEngine::new(&encoder, &config)
            .run(&job)
            .unwrap()
            .into_result()
            .unwrap();

        assert!(!result.meets_target());
        assert_eq!(result.quality_used, plan.search_low);
        assert_eq!(result.termination, Termination::Converged);
        assert!(encoder.calls.load(Ordering::SeqCst) <= MAX_ITERATIONS as usize + 1);

        // Every attempt was oversized and the smallest one was kept
        let smallest = result.attempts.iter().filter_map(|a| a.size_bytes).min().unwrap();
        assert_eq!(result.size_bytes, smallest);
        assert!(result.attempts.iter().all(|a| !a.fits));
    }
}
