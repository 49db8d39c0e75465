//! Ass subcommand - write the styled subtitle document without burning.

use crate::cli::CaptionArgs;
use crate::config::CaptionConfig;
use crate::pipeline::{Pipeline, Target};
use crate::srt;
use eyre::Result;
use std::path::PathBuf;

#[derive(clap::Args, Clone, Debug)]
pub struct Args {
    #[command(flatten)]
    pub caption: CaptionArgs,

    /// Output subtitle document (default: same as input with .ass extension)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print the first and last phrases to stdout
    #[arg(long)]
    pub preview: bool,
}

/// Resolved configuration for subtitle generation.
#[derive(Debug)]
pub struct Config {
    pub caption: CaptionConfig,
    pub out: PathBuf,
    pub preview: bool,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let caption = CaptionConfig::try_from(args.caption)?;
        let out = args
            .out
            .unwrap_or_else(|| caption.video.with_extension("ass"));

        Ok(Self {
            caption,
            out,
            preview: args.preview,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    tracing::info!(
        input = ?config.caption.video.display(),
        output = ?config.out.display(),
        style = %config.caption.style,
        "generating subtitles"
    );

    let outcome = Pipeline::new(config.caption)?.run(&Target::Subtitles { out: config.out })?;

    if config.preview {
        let subtitles = srt::to_subtitles(&outcome.phrases);
        println!("{}", srt::preview_subtitles(&subtitles, 3, 3));
    }

    Ok(())
}
