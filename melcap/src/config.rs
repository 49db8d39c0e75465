//! Configuration types for resolved CLI arguments.
//!
//! Args structs (for CLI parsing) remain in cli.rs.

use crate::cli::{CaptionArgs, ModelArgs, ModelSource};
use crate::style::StyleProfile;
use eyre::Result;
use hf_hub::Cache;
use hf_hub::api::sync::Api;
use melcap_asr::align::language_code;
use melcap_asr::chunk::ChunkConfig;
use melcap_asr::types::ModelRepo;
use std::path::PathBuf;

/// Resolved model configuration.
///
/// Converted from ModelArgs via TryFrom.
#[derive(Debug)]
pub struct ModelConfig {
    pub repo: ModelRepo,
}

impl TryFrom<ModelArgs> for ModelConfig {
    type Error = eyre::Error;

    fn try_from(args: ModelArgs) -> Result<Self> {
        let repo = match args.model_source {
            ModelSource::Auto => {
                let path = PathBuf::from(&args.model_id);
                if path.is_dir() {
                    ModelRepo::Path(path)
                } else {
                    ModelRepo::Api(Api::new()?.model(args.model_id))
                }
            }
            ModelSource::Path => ModelRepo::Path(PathBuf::from(args.model_id)),
            ModelSource::Cache => ModelRepo::Cache(Cache::from_env().model(args.model_id)),
            ModelSource::Api => ModelRepo::Api(Api::new()?.model(args.model_id)),
        };

        Ok(Self { repo })
    }
}

/// Where timed words come from.
#[derive(Clone, Debug, PartialEq)]
pub enum WordSource {
    /// Extract the soundtrack, then align.
    Video,
    /// Align a pre-extracted wav.
    Wav(PathBuf),
    /// Read words that were aligned elsewhere.
    Words(PathBuf),
}

/// Resolved inputs for a captioning run.
///
/// The model is resolved only when alignment actually runs, so runs fed with
/// pre-aligned words never touch the model cache.
#[derive(Clone, Debug)]
pub struct CaptionConfig {
    pub video: PathBuf,
    pub reference_text: Option<PathBuf>,
    /// Primary language subtag; `None` means auto.
    pub language: Option<String>,
    pub style: StyleProfile,
    pub source: WordSource,
    pub words_per_phrase: Option<usize>,
    pub max_gap_s: f64,
    pub font: Option<String>,
    pub fonts_dir: Option<PathBuf>,
    pub srt: Option<PathBuf>,
    pub workdir: Option<PathBuf>,
    pub keep: bool,
    pub model: ModelArgs,
    pub chunk_config: ChunkConfig,
}

impl TryFrom<CaptionArgs> for CaptionConfig {
    type Error = eyre::Error;

    fn try_from(args: CaptionArgs) -> Result<Self> {
        let style = args.style.parse::<StyleProfile>()?;
        let chunk_config = args.chunk_config.validate()?;

        let source = match (args.words, args.wav) {
            (Some(words), _) => WordSource::Words(words),
            (None, Some(wav)) => WordSource::Wav(wav),
            (None, None) => WordSource::Video,
        };

        Ok(Self {
            video: args.video,
            reference_text: args.reference_text,
            language: args.language.as_deref().and_then(language_code),
            style,
            source,
            words_per_phrase: args.layout.words_per_phrase,
            max_gap_s: args.layout.max_gap_s,
            font: args.layout.font.filter(|f| !f.trim().is_empty()),
            fonts_dir: args.layout.fonts_dir,
            srt: args.srt,
            workdir: args.workdir,
            keep: args.keep,
            model: args.model,
            chunk_config,
        })
    }
}
