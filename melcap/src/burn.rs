//! Burn subcommand - align speech and burn styled captions into the video.

use crate::burner::default_output_path;
use crate::cli::CaptionArgs;
use crate::config::CaptionConfig;
use crate::pipeline::{Pipeline, Target};
use eyre::Result;
use std::path::PathBuf;

#[derive(clap::Args, Clone, Debug)]
pub struct Args {
    #[command(flatten)]
    pub caption: CaptionArgs,

    /// Output video (default: <input>_captioned.<ext>)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Resolved configuration for burning.
#[derive(Debug)]
pub struct Config {
    pub caption: CaptionConfig,
    pub out: PathBuf,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let caption = CaptionConfig::try_from(args.caption)?;
        let out = args
            .out
            .unwrap_or_else(|| default_output_path(&caption.video));

        Ok(Self { caption, out })
    }
}

pub fn execute(config: Config) -> Result<()> {
    tracing::info!(
        input = ?config.caption.video.display(),
        output = ?config.out.display(),
        style = %config.caption.style,
        "burning captions"
    );

    let outcome = Pipeline::new(config.caption)?.run(&Target::Burn { out: config.out })?;

    if let Some(video) = &outcome.video {
        println!("{}", video.display());
    }

    Ok(())
}
