//! # Smart Image Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (file JSON opzionale)
//! - Avvio della compressione e scrittura atomica del risultato
//! - Ctrl-C → segnale di cancellazione sul broadcast channel
//!
//! ## Esempio di utilizzo:
//! ```bash
//! smart-compress photo.png --preset instagram-post
//! smart-compress banner.jpg --target-kb 120 --mode quality --json
//! ```

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use smart_image_compressor::json_output::{JsonConfig, JsonMessage};
use smart_image_compressor::progress::{CompressionSummary, ProgressManager};
use smart_image_compressor::utils::{default_output_path, format_size};
use smart_image_compressor::{
    CompressionPreset, CompressionResult, CompressionTarget, Compressor, Config, QualityMode, SearchOutcome,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    YoutubeThumbnail,
    InstagramPost,
    WebBanner,
    EmailAttachment,
    SocialMedia,
}

impl From<PresetArg> for CompressionPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::YoutubeThumbnail => Self::YoutubeThumbnail,
            PresetArg::InstagramPost => Self::InstagramPost,
            PresetArg::WebBanner => Self::WebBanner,
            PresetArg::EmailAttachment => Self::EmailAttachment,
            PresetArg::SocialMedia => Self::SocialMedia,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Balanced,
    Quality,
    Size,
}

impl From<ModeArg> for QualityMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Balanced => Self::Balanced,
            ModeArg::Quality => Self::Quality,
            ModeArg::Size => Self::Size,
        }
    }
}

#[derive(Parser)]
#[command(name = "smart-compress")]
#[command(about = "Compress an image to a target file size with content-aware format selection")]
#[command(group(ArgGroup::new("budget").required(true).args(["preset", "target_kb", "target_bytes"])))]
struct Args {
    /// Image to compress (JPEG, PNG or WebP)
    input: PathBuf,

    /// Named size budget
    #[arg(short, long, value_enum)]
    preset: Option<PresetArg>,

    /// Size budget in kilobytes (1 KB = 1024 bytes)
    #[arg(short = 'k', long)]
    target_kb: Option<u64>,

    /// Size budget in bytes
    #[arg(short = 'b', long)]
    target_bytes: Option<u64>,

    /// Force the search mode instead of deriving it from the content
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Output file (default: <input stem>_compressed.<format extension>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file overriding the default heuristics
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output progress and results as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn target(&self) -> Result<CompressionTarget> {
        let target = if let Some(bytes) = self.target_bytes {
            CompressionTarget::from_bytes(bytes)?
        } else if let Some(kb) = self.target_kb {
            CompressionTarget::from_kb(kb)?
        } else if let Some(preset) = self.preset {
            CompressionTarget::from_preset(preset.into())?
        } else {
            return Err(anyhow::anyhow!("A size budget is required"));
        };

        Ok(match self.mode {
            Some(mode) => target.with_mode_hint(mode.into()),
            None => target,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // JSON mode keeps stdout clean: logs go to stderr and only warnings pass
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else if args.json {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let json = args.json;
    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) if json => {
            JsonMessage::error(e.to_string(), e.chain().nth(1).map(|s| s.to_string())).emit();
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}

async fn run(args: Args) -> Result<()> {
    if !args.input.exists() {
        return Err(anyhow::anyhow!("Input file does not exist: {}", args.input.display()));
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    config.json_output = args.json;

    let target = args.target()?;
    let json = config.json_output;

    let spinner = (!json).then(|| ProgressManager::spinner(&format!("Reading {}", args.input.display())));
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()));
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let bytes = bytes?;
    let original_size = bytes.len() as u64;

    let (stop_sender, stop_receiver) = Compressor::create_cancellation_channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current attempt");
            let _ = stop_sender.send(());
        }
    });

    let max_attempts = u64::from(config.max_iterations) + 1;
    let compressor = Compressor::new_with_cancellation(config.clone(), stop_receiver)?;

    let outcome = if json {
        JsonMessage::start(args.input.clone(), original_size, target.target_size_bytes, JsonConfig::from(&config)).emit();
        compressor
            .compress_in_background(bytes, target, |record| JsonMessage::attempt(record).emit())
            .await?
    } else {
        info!("🎯 Target: {}", format_size(target.target_size_bytes));
        let progress = ProgressManager::new(max_attempts);
        let observer_progress = progress.clone();
        let outcome = compressor
            .compress_in_background(bytes, target, move |record| observer_progress.record_attempt(record))
            .await;
        match &outcome {
            Ok(SearchOutcome::Completed(result)) => progress.finish(&format!("Done at q{}", result.quality_used)),
            Ok(SearchOutcome::Cancelled) => progress.finish("Cancelled"),
            Err(_) => progress.finish("Failed"),
        }
        outcome?
    };

    let result = match outcome {
        SearchOutcome::Completed(result) => result,
        SearchOutcome::Cancelled => {
            if json {
                JsonMessage::cancelled(args.input.clone()).emit();
            } else {
                warn!("Compression of {} cancelled, nothing written", args.input.display());
            }
            return Ok(());
        }
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, result.file_extension()));
    write_output(&output, &result)?;

    if json {
        JsonMessage::complete(&result, Some(output), original_size).emit();
    } else {
        for reason in result.reasoning() {
            info!("  • {}", reason);
        }
        let summary = CompressionSummary::from_result(&result, original_size);
        info!("✅ {}", summary.format_summary());
        if !summary.meets_target {
            warn!("Target not reachable, wrote the smallest result found");
        }
        info!("💾 Saved to {}", output.display());
    }

    Ok(())
}

/// Write the encoded bytes next to their destination, then rename into place
fn write_output(output: &Path, result: &CompressionResult) -> Result<()> {
    let parent = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(&result.encoded_bytes)?;
    temp.flush()?;
    temp.persist(output)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", output.display(), e.error))?;
    Ok(())
}
