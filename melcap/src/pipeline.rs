//! Stage runner from input video to captioned output.
//!
//! Stages run to completion one after another: probe, extract, align,
//! segment, emit, write and burn. The run owns a working directory for its
//! whole lifetime and checks a [`CancelToken`] between stages.

use crate::burner::{self, BurnOptions};
use crate::cli::ModelArgs;
use crate::config::{CaptionConfig, ModelConfig, WordSource};
use crate::context::{RenderContext, contains_devanagari};
use crate::error::Cancelled;
use crate::layout::LayoutOracle;
use crate::segment::{Phrase, segment};
use crate::srt;
use crate::subtitle::emit;
use eyre::{Result, WrapErr};
use melcap_asr::align::{
    AlignMode, Aligner, Alignment, Transcript, align_by_energy, check_language,
};
use melcap_asr::audio::{self, ExtractedAudio, read_audio_mono};
use melcap_asr::chunk::ChunkConfig;
use melcap_asr::error::InputError;
use melcap_asr::media::{MediaInfo, Muxer};
use melcap_asr::models::tdt::TdtModel;
use melcap_asr::types::Word;
use melcap_asr::word_json::{read_words, write_words};
#[allow(unused_imports)]
use ort::execution_providers::*;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Subtitle document written inside the working directory for burning.
pub const SUBTITLES_FILE: &str = "captions.ass";

/// Timed words written after alignment, replayable with `--words`.
pub const WORDS_FILE: &str = "words.json";

/// Language assumed for font policy when Devanagari text shows up.
const DEVANAGARI_FALLBACK_LANGUAGE: &str = "hi";

/// Shared flag that stops a run at the next stage boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Working directory exclusive to one run.
#[derive(Debug)]
pub enum WorkDir {
    /// Fresh temporary directory, removed unless persisted.
    Temp(TempDir),
    /// Directory named by the user; only files the run wrote are removed.
    User(PathBuf),
}

impl WorkDir {
    pub fn create(path: Option<&Path>) -> std::io::Result<Self> {
        match path {
            Some(path) => {
                std::fs::create_dir_all(path)?;
                Ok(Self::User(path.to_path_buf()))
            }
            None => tempfile::Builder::new()
                .prefix("melcap-")
                .tempdir()
                .map(Self::Temp),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Temp(dir) => dir.path(),
            Self::User(path) => path,
        }
    }

    /// Leave everything on disk and return the directory.
    fn persist(self) -> PathBuf {
        match self {
            Self::Temp(dir) => dir.keep(),
            Self::User(path) => path,
        }
    }

    fn discard(self, artefacts: &[PathBuf]) {
        match self {
            Self::Temp(dir) => {
                let path = dir.path().to_path_buf();
                if let Err(e) = dir.close() {
                    warn!(path = ?path.display(), error = %e, "failed to remove working directory");
                }
            }
            Self::User(_) => {
                for file in artefacts {
                    if let Err(e) = std::fs::remove_file(file) {
                        debug!(path = ?file.display(), error = %e, "failed to remove artefact");
                    }
                }
            }
        }
    }
}

/// What the run produces besides the subtitle document.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    /// Burn into a new video at `out`.
    Burn { out: PathBuf },
    /// Write the subtitle document to `out` and stop.
    Subtitles { out: PathBuf },
}

/// Products of a successful run.
#[derive(Debug)]
pub struct Outcome {
    pub subtitles: PathBuf,
    pub video: Option<PathBuf>,
    pub phrases: Vec<Phrase>,
    /// Set when the working directory was kept.
    pub workdir: Option<PathBuf>,
}

/// One captioning run over one input video.
pub struct Pipeline {
    config: CaptionConfig,
    workdir: WorkDir,
    cancel: CancelToken,
    artefacts: Vec<PathBuf>,
}

impl Pipeline {
    pub fn new(config: CaptionConfig) -> Result<Self> {
        let workdir = WorkDir::create(config.workdir.as_deref())
            .wrap_err("failed to create working directory")?;

        debug!(workdir = ?workdir.path().display(), "created working directory");

        Ok(Self {
            config,
            workdir,
            cancel: CancelToken::new(),
            artefacts: Vec::new(),
        })
    }

    /// Token that cancels this run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    /// Run every stage, then keep or clean the working directory.
    ///
    /// A cancelled run always removes its working directory. Otherwise the
    /// directory survives only with `keep`.
    pub fn run(mut self, target: &Target) -> Result<Outcome> {
        let s = Instant::now();
        let result = self.run_stages(target);

        let cancelled = result.as_ref().is_err_and(|e| e.is::<Cancelled>());
        let kept = if self.config.keep && !cancelled {
            let path = self.workdir.persist();
            info!(path = ?path.display(), "kept working directory");
            Some(path)
        } else {
            self.workdir.discard(&self.artefacts);
            None
        };

        let (subtitles, phrases) = result?;

        info!(duration = %format_secs(s.elapsed().as_secs_f32()), "run completed");

        Ok(Outcome {
            subtitles,
            video: match target {
                Target::Burn { out } => Some(out.clone()),
                Target::Subtitles { .. } => None,
            },
            phrases,
            workdir: kept,
        })
    }

    fn checkpoint(&self, stage: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!(stage, "run cancelled");
            return Err(Cancelled.into());
        }
        Ok(())
    }

    fn run_stages(&mut self, target: &Target) -> Result<(PathBuf, Vec<Phrase>)> {
        self.checkpoint("probe")?;

        let muxer = Muxer::locate()?;
        let video = self.config.video.clone();

        let info = muxer.probe(&video)?;
        let (width, height) = frame_size(&info, &video)?;
        debug!(width, height, format = %info.format_name, "probed input");

        let transcript = self
            .config
            .reference_text
            .as_deref()
            .map(Transcript::from_file)
            .transpose()?;

        let hint = self.resolve_language(transcript.as_ref(), &[]);
        let words = self.timed_words(&muxer, transcript.as_ref(), hint.as_deref())?;
        if words.is_empty() {
            warn!("no words to caption; the subtitle document will have no events");
        }

        self.checkpoint("segment")?;

        let s = Instant::now();

        let language = self.resolve_language(transcript.as_ref(), &words);
        let ctx = self.render_context(width, height, language.as_deref());
        let extra_fonts: Vec<PathBuf> = self.config.fonts_dir.iter().cloned().collect();
        let oracle = LayoutOracle::new(&extra_fonts);

        let phrases = segment(&words, &ctx, &oracle);
        let doc = emit(&phrases, self.config.style, &ctx, &oracle)?;

        info!(
            duration = %format_secs(s.elapsed().as_secs_f32()),
            phrases = phrases.len(),
            events = doc.events().len(),
            style = %self.config.style,
            font = %ctx.font_family,
            "captions laid out"
        );

        self.checkpoint("write")?;

        let subtitles = match target {
            Target::Burn { .. } => {
                let path = self.workdir.path().join(SUBTITLES_FILE);
                self.artefacts.push(path.clone());
                path
            }
            Target::Subtitles { out } => out.clone(),
        };

        doc.write(&subtitles)
            .wrap_err_with(|| format!("failed to write subtitles: {:?}", subtitles.display()))?;
        info!(path = ?subtitles.display(), "wrote subtitles");

        if let Some(path) = &self.config.srt {
            srt::write_srt(path, &srt::to_subtitles(&phrases))
                .wrap_err_with(|| format!("failed to write srt: {:?}", path.display()))?;
            info!(path = ?path.display(), "wrote srt sidecar");
        }

        if let Target::Burn { out } = target {
            self.checkpoint("burn")?;

            let s = Instant::now();
            let options = BurnOptions {
                fonts_dir: self.config.fonts_dir.clone(),
            };
            burner::burn(&muxer, &video, &subtitles, out, &options)?;

            info!(duration = %format_secs(s.elapsed().as_secs_f32()), output = ?out.display(), "burn completed");
        }

        Ok((subtitles, phrases))
    }

    /// Words from a JSON file, or from aligning the soundtrack.
    fn timed_words(
        &mut self,
        muxer: &Muxer,
        transcript: Option<&Transcript>,
        language: Option<&str>,
    ) -> Result<Vec<Word>> {
        let wav = match &self.config.source {
            WordSource::Words(path) => {
                let words = read_words(path)?;
                info!(path = ?path.display(), words = words.len(), "loaded pre-aligned words");
                return Ok(words);
            }
            WordSource::Wav(path) => Some(path.clone()),
            WordSource::Video => None,
        };

        // cheap to check, expensive to find out after loading the model
        let mode = check_language(language, transcript.is_some())?;

        self.checkpoint("extract")?;

        let s = Instant::now();

        let (samples, extracted) = match wav {
            Some(path) => (read_audio_mono(&path)?, None),
            None => {
                let extracted = self.extract(muxer)?;
                (extracted.read()?, Some(extracted))
            }
        };

        info!(
            duration = %format_secs(s.elapsed().as_secs_f32()),
            audio_secs = %format_secs(samples.len() as f32 / audio::SAMPLE_RATE as f32),
            "audio ready"
        );

        self.checkpoint("align")?;

        let alignment = match (mode, transcript) {
            (AlignMode::Energy, Some(transcript)) => {
                let s = Instant::now();
                let alignment = align_by_energy(&samples, transcript)?;
                info!(
                    duration = %format_secs(s.elapsed().as_secs_f32()),
                    words = alignment.words.len(),
                    "alignment completed"
                );
                alignment
            }
            _ => align(
                self.config.model.clone(),
                self.config.chunk_config,
                language,
                &samples,
                transcript,
            )?,
        };

        drop(extracted);

        let path = self.workdir.path().join(WORDS_FILE);
        write_words(&path, &alignment.words)?;
        self.artefacts.push(path);

        Ok(alignment.words)
    }

    fn extract(&mut self, muxer: &Muxer) -> Result<ExtractedAudio> {
        let mut extracted = audio::extract(muxer, &self.config.video, self.workdir.path())?;

        if self.config.keep {
            extracted.keep();
        }
        self.artefacts.push(extracted.path().to_path_buf());

        Ok(extracted)
    }

    /// Explicit language first; otherwise Devanagari text implies Hindi.
    fn resolve_language(&self, transcript: Option<&Transcript>, words: &[Word]) -> Option<String> {
        if let Some(language) = &self.config.language {
            return Some(language.clone());
        }

        let devanagari = match transcript {
            Some(transcript) => contains_devanagari(&transcript.text()),
            None => words.iter().any(|w| contains_devanagari(&w.text)),
        };

        devanagari.then(|| {
            debug!("devanagari text detected, using {DEVANAGARI_FALLBACK_LANGUAGE} for font policy");
            DEVANAGARI_FALLBACK_LANGUAGE.to_string()
        })
    }

    fn render_context(&self, width: u32, height: u32, language: Option<&str>) -> RenderContext {
        let mut ctx = RenderContext::new(width, height);

        if let Some(font) = &self.config.font {
            ctx = ctx.with_font(font.clone());
        }
        ctx = ctx
            .with_language(language)
            .with_max_gap(self.config.max_gap_s);
        if let Some(words) = self.config.words_per_phrase {
            ctx = ctx.with_words_per_phrase(words);
        }

        ctx
    }
}

fn frame_size(info: &MediaInfo, video: &Path) -> Result<(u32, u32)> {
    match (info.width, info.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(InputError::NoVideoStream {
            path: video.to_path_buf(),
        }
        .into()),
    }
}

/// Load the model, time the words and release the model again.
fn align(
    model: ModelArgs,
    chunk_config: ChunkConfig,
    language: Option<&str>,
    samples: &[f32],
    transcript: Option<&Transcript>,
) -> Result<Alignment> {
    let s = Instant::now();

    let model = load_model(model, chunk_config)?;

    info!(duration = %format_secs(s.elapsed().as_secs_f32()), "model loaded");

    let s = Instant::now();

    let mut aligner = Aligner::new(model, language)?;
    let alignment = match transcript {
        Some(transcript) => aligner.align_reference(samples, transcript)?,
        None => aligner.transcribe(samples)?,
    };

    info!(
        duration = %format_secs(s.elapsed().as_secs_f32()),
        words = alignment.words.len(),
        dropped = alignment.dropped.len(),
        "alignment completed"
    );

    Ok(alignment)
}

/// Resolve the model repository and load the TDT sessions.
pub fn load_model(args: ModelArgs, chunk_config: ChunkConfig) -> Result<TdtModel> {
    let config = ModelConfig::try_from(args)?;

    info!(repo = ?config.repo, "loading model");

    let model = TdtModel::from_repo(&config.repo, session_builder()?, chunk_config)?;

    Ok(model)
}

/// Session builder with execution providers configured by Cargo features.
///
/// Providers are tried in order; CPU is always available as fallback.
///
/// # Execution Providers
///
/// Enabled via Cargo features:
/// - `cuda` - NVIDIA CUDA
/// - `tensorrt` - NVIDIA TensorRT
/// - `openvino` - Intel OpenVINO
/// - `directml` - DirectML (Windows)
/// - `coreml` - CoreML (macOS)
fn session_builder() -> Result<SessionBuilder> {
    let builder = Session::builder()?.with_execution_providers([
        #[cfg(feature = "cuda")]
        CUDAExecutionProvider::default().build(),
        #[cfg(feature = "tensorrt")]
        TensorRTExecutionProvider::default().build(),
        #[cfg(feature = "openvino")]
        OpenVINOExecutionProvider::default()
            .with_device_type("HETERO:GPU,CPU")
            .with_cache_dir(".cache/ort")
            .with_precision("FP16")
            .build(),
        #[cfg(feature = "directml")]
        DirectMLExecutionProvider::default().build(),
        #[cfg(feature = "coreml")]
        CoreMLExecutionProvider::default().build(),
    ])?;

    Ok(builder)
}

/// Format seconds as a string with two decimal places.
pub fn format_secs(secs: f32) -> String {
    format!("{:.2}s", secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ModelSource;
    use crate::style::StyleProfile;

    fn config(workdir: Option<PathBuf>, keep: bool) -> CaptionConfig {
        CaptionConfig {
            video: PathBuf::from("missing.mp4"),
            reference_text: None,
            language: None,
            style: StyleProfile::Cinematic,
            source: WordSource::Video,
            words_per_phrase: None,
            max_gap_s: 0.55,
            font: None,
            fonts_dir: None,
            srt: None,
            workdir,
            keep,
            model: ModelArgs {
                model_id: "unused".to_string(),
                model_source: ModelSource::Path,
            },
            chunk_config: ChunkConfig::default(),
        }
    }

    fn target() -> Target {
        Target::Subtitles {
            out: PathBuf::from("unused.ass"),
        }
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let other = token.clone();

        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn cancelled_run_removes_temp_workdir() {
        let pipeline = Pipeline::new(config(None, true)).unwrap();
        let workdir = pipeline.workdir().to_path_buf();
        assert!(workdir.is_dir());

        pipeline.cancel_token().cancel();
        let err = pipeline.run(&target()).unwrap_err();

        assert!(err.is::<Cancelled>());
        assert!(!workdir.exists());
    }

    #[test]
    fn cancelled_run_leaves_user_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("work");

        let pipeline = Pipeline::new(config(Some(workdir.clone()), false)).unwrap();
        pipeline.cancel_token().cancel();

        assert!(pipeline.run(&target()).is_err());
        assert!(workdir.is_dir());
    }

    #[test]
    fn explicit_language_wins() {
        let mut config = config(None, false);
        config.language = Some("en".to_string());
        let pipeline = Pipeline::new(config).unwrap();

        let transcript = Transcript::parse("नमस्ते दुनिया").unwrap();

        assert_eq!(
            pipeline.resolve_language(Some(&transcript), &[]).as_deref(),
            Some("en")
        );
    }

    #[test]
    fn devanagari_text_implies_hindi() {
        let pipeline = Pipeline::new(config(None, false)).unwrap();

        let transcript = Transcript::parse("नमस्ते दुनिया").unwrap();
        assert_eq!(
            pipeline.resolve_language(Some(&transcript), &[]).as_deref(),
            Some("hi")
        );

        let words = [Word::new("नमस्ते", 0.0, 0.5)];
        assert_eq!(pipeline.resolve_language(None, &words).as_deref(), Some("hi"));

        let words = [Word::new("hello", 0.0, 0.5)];
        assert_eq!(pipeline.resolve_language(None, &words), None);
    }

    /// Half a second of silence around one second of tone, as a 16 kHz WAV.
    fn write_speech_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: audio::SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let rate = audio::SAMPLE_RATE as usize;

        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..rate * 2 {
            let voiced = (rate / 2..rate * 3 / 2).contains(&i);
            let sample = if voiced { (i as f32 * 0.17).sin() * 0.4 } else { 0.0 };
            writer.write_sample((sample * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn hindi_reference_aligns_without_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("speech.wav");
        write_speech_wav(&wav);

        // the model path does not exist, so loading it would fail
        let mut config = config(None, false);
        config.language = Some("hi".to_string());
        config.source = WordSource::Wav(wav);
        let mut pipeline = Pipeline::new(config).unwrap();

        let transcript = Transcript::parse("नमस्ते दुनिया फिर").unwrap();
        let language = pipeline.resolve_language(Some(&transcript), &[]);
        let words = pipeline
            .timed_words(
                &Muxer::from_paths("ffmpeg", "ffprobe"),
                Some(&transcript),
                language.as_deref(),
            )
            .unwrap();

        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["नमस्ते", "दुनिया", "फिर"]);
        assert!((words[0].start - 0.5).abs() < 1e-6);
        assert!((words[2].end - 1.5).abs() < 1e-6);
        assert!(pipeline.workdir().join(WORDS_FILE).is_file());
    }

    #[test]
    fn devanagari_reference_picks_energy_timing_without_language() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("speech.wav");
        write_speech_wav(&wav);

        let mut config = config(None, false);
        config.source = WordSource::Wav(wav);
        let mut pipeline = Pipeline::new(config).unwrap();

        let transcript = Transcript::parse("नमस्ते दुनिया").unwrap();
        let language = pipeline.resolve_language(Some(&transcript), &[]);
        let words = pipeline
            .timed_words(
                &Muxer::from_paths("ffmpeg", "ffprobe"),
                Some(&transcript),
                language.as_deref(),
            )
            .unwrap();

        assert_eq!(words.len(), 2);
    }

    #[test]
    fn hindi_without_reference_is_unsupported() {
        let mut config = config(None, false);
        config.language = Some("hi".to_string());
        config.source = WordSource::Wav(PathBuf::from("unused.wav"));
        let mut pipeline = Pipeline::new(config).unwrap();

        let err = pipeline
            .timed_words(&Muxer::from_paths("ffmpeg", "ffprobe"), None, Some("hi"))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<melcap_asr::error::Error>(),
            Some(melcap_asr::error::Error::Model(
                melcap_asr::error::ModelError::LanguageUnsupported(_)
            ))
        ));
    }

    #[test]
    fn context_applies_overrides() {
        let mut config = config(None, false);
        config.font = Some("Inter".to_string());
        config.words_per_phrase = Some(2);
        config.max_gap_s = 0.3;
        let pipeline = Pipeline::new(config).unwrap();

        let ctx = pipeline.render_context(1080, 1920, Some("hi"));

        assert_eq!(ctx.font_family, "Inter");
        assert_eq!(ctx.words_per_phrase, 2);
        assert_eq!(ctx.max_gap_s, 0.3);
        assert_eq!(ctx.language.as_deref(), Some("hi"));
    }

    #[test]
    fn missing_video_stream_is_input_error() {
        let info = MediaInfo {
            width: None,
            height: None,
            has_audio: true,
            format_name: "wav".to_string(),
        };

        let err = frame_size(&info, Path::new("a.wav")).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::NoVideoStream { .. })
        ));
    }

    #[test]
    fn formats_seconds() {
        assert_eq!(format_secs(1.234), "1.23s");
    }
}
