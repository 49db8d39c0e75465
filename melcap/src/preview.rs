//! Preview subcommand - render one frame with subtitles applied.

use crate::burner::{self, BurnOptions};
use eyre::{Result, bail};
use melcap_asr::media::Muxer;
use std::path::PathBuf;

#[derive(clap::Args, Clone, Debug)]
pub struct Args {
    /// Input video
    #[arg(long)]
    pub video: PathBuf,

    /// Subtitle document to apply
    #[arg(long)]
    pub subtitles: PathBuf,

    /// Timestamp of the frame in seconds
    #[arg(long, default_value_t = 0.0)]
    pub at: f64,

    /// Output PNG (default: <input>_preview.png)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Extra font directory for rendering
    #[arg(long)]
    pub fonts_dir: Option<PathBuf>,
}

/// Resolved configuration for a preview frame.
#[derive(Debug)]
pub struct Config {
    pub video: PathBuf,
    pub subtitles: PathBuf,
    pub at: f64,
    pub out: PathBuf,
    pub options: BurnOptions,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        if !args.at.is_finite() || args.at < 0.0 {
            bail!("--at must be a non-negative number of seconds, got {}", args.at);
        }

        let out = args.out.unwrap_or_else(|| {
            let stem = args
                .video
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "video".to_string());
            args.video.with_file_name(format!("{stem}_preview.png"))
        });

        Ok(Self {
            video: args.video,
            subtitles: args.subtitles,
            at: args.at,
            out,
            options: BurnOptions {
                fonts_dir: args.fonts_dir,
            },
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let muxer = Muxer::locate()?;

    burner::preview(
        &muxer,
        &config.video,
        &config.subtitles,
        config.at,
        &config.out,
        &config.options,
    )?;

    println!("{}", config.out.display());

    Ok(())
}
