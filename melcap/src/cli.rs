//! CLI argument definitions using clap.

use crate::context::DEFAULT_MAX_GAP_S;
use clap::{Parser, Subcommand, ValueEnum};
use eyre::Result;
use melcap_asr::chunk::ChunkConfig;
use std::path::PathBuf;

/// Parakeet TDT 0.6B v3 exported to ONNX.
pub const DEFAULT_MODEL_ID: &str = "istupakov/parakeet-tdt-0.6b-v3-onnx";

#[derive(Debug, Parser)]
#[command(name = "melcap")]
#[command(about = "Burn word-synchronised captions into videos")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Align speech and burn styled captions into the video
    Burn(crate::burn::Args),

    /// Align speech and write the subtitle document without burning
    Ass(crate::ass::Args),

    /// Render one frame of a video with a subtitle document applied
    Preview(crate::preview::Args),
}

/// Where the alignment model comes from.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelSource {
    /// Local directory if it exists, otherwise Hugging Face
    #[default]
    Auto,
    /// Local directory
    Path,
    /// Hugging Face cache only, no network
    Cache,
    /// Hugging Face Hub, downloading as needed
    Api,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ModelArgs {
    /// Model repository id or local directory
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// How to resolve the model id
    #[arg(long, value_enum, default_value_t = ModelSource::Auto)]
    pub model_source: ModelSource,
}

/// Phrase and font overrides.
#[derive(clap::Args, Clone, Debug)]
pub struct LayoutArgs {
    /// Words per phrase (default: 3 portrait, 5 landscape)
    #[arg(long)]
    pub words_per_phrase: Option<usize>,

    /// Silence in seconds that starts a new phrase
    #[arg(long, default_value_t = DEFAULT_MAX_GAP_S)]
    pub max_gap_s: f64,

    /// Font family (default: per language)
    #[arg(long)]
    pub font: Option<String>,

    /// Extra font directory for measuring and rendering
    #[arg(long)]
    pub fonts_dir: Option<PathBuf>,
}

/// Inputs shared by every command that produces captions.
#[derive(clap::Args, Clone, Debug)]
pub struct CaptionArgs {
    /// Input video
    #[arg(long)]
    pub video: PathBuf,

    /// Reference transcript (default: transcribe)
    #[arg(long)]
    pub reference_text: Option<PathBuf>,

    /// ISO language code (default: auto)
    #[arg(long)]
    pub language: Option<String>,

    /// Caption style: cinematic, pro_pop, drift_up, typewriter, netflix, karaoke_box
    #[arg(long, default_value = "cinematic")]
    pub style: String,

    /// Pre-aligned words JSON; skips extraction and alignment
    #[arg(long)]
    pub words: Option<PathBuf>,

    /// Pre-extracted 16 kHz wav; skips extraction
    #[arg(long, conflicts_with = "words")]
    pub wav: Option<PathBuf>,

    /// Also write the phrases as SRT
    #[arg(long)]
    pub srt: Option<PathBuf>,

    /// Working directory (default: fresh temporary directory)
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Keep the working directory and intermediate files
    #[arg(long)]
    pub keep: bool,

    #[command(flatten)]
    pub layout: LayoutArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub chunk_config: ChunkConfig,
}

/// Execute CLI command - separated for testing.
pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Burn(args) => crate::burn::execute(args.try_into()?),
        Commands::Ass(args) => crate::ass::execute(args.try_into()?),
        Commands::Preview(args) => crate::preview::execute(args.try_into()?),
    }
}
