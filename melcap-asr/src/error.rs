//! Error types for melcap-asr organized by processing stage.

use ndarray::ShapeError;
use ndarray_stats::errors::MinMaxError;
use std::path::PathBuf;
use thiserror::Error;

/// Caption pipeline error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input media or transcript error
    #[error(transparent)]
    Input(#[from] InputError),

    /// Model loading or inference error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Alignment quality error
    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    /// External muxer error
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Writing run products
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid chunk duration: {duration}s (minimum {min}s)")]
    InvalidChunkDuration { duration: f32, min: f32 },

    #[error("invalid chunk overlap: {overlap}s exceeds duration {duration}s")]
    InvalidChunkOverlap { overlap: f32, duration: f32 },
}

/// Errors caused by what the user handed us.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read input {path:?}: {detail}")]
    Unreadable { path: PathBuf, detail: String },

    #[error("no audio stream in {path:?}")]
    NoAudioStream { path: PathBuf },

    #[error("no video stream in {path:?}")]
    NoVideoStream { path: PathBuf },

    #[error("reference transcript is empty")]
    EmptyTranscript,

    #[error("no timed words found in {path:?}")]
    NoWords { path: PathBuf },

    #[error("invalid sample rate: expected {expected}Hz, got {got}Hz")]
    InvalidSampleRate { expected: u32, got: u32 },

    #[error("invalid channel count: expected mono or stereo, got {0} channels")]
    InvalidChannels(u16),

    #[error(transparent)]
    Hound(#[from] hound::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Model loading and inference errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("language {0:?} is not supported by the alignment model")]
    LanguageUnsupported(String),

    #[error("failed to load model: {0}")]
    LoadFailed(String),

    #[error("missing model output: {name}")]
    MissingOutput { name: String },

    #[error("duration index {index} out of bounds (max {max})")]
    DurationIndexOutOfBounds { index: usize, max: usize },

    #[error("token id {0} is not in the vocabulary")]
    UnknownToken(usize),

    #[error(transparent)]
    Ort(#[from] ort::Error),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    MinMax(#[from] MinMaxError),
}

/// Alignment quality errors.
#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error(
        "alignment unreliable: dropped {} of {total} reference tokens ({:.1}%): {}",
        .dropped.len(),
        percent(.dropped, .total),
        .dropped.join(" ")
    )]
    Unreliable { dropped: Vec<String>, total: usize },
}

/// Failures writing files the run produces.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot serialize {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// External muxer (ffmpeg/ffprobe) errors.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{name} not found in PATH")]
    MuxerNotFound { name: String },

    #[error("muxer rejected the subtitle filter:\n{stderr}")]
    FilterRejected { stderr: String },

    #[error("muxer exited with {status}:\n{stderr}")]
    EncodeFailed { status: String, stderr: String },

    #[error("unexpected ffprobe output: {0}")]
    Probe(String),

    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },
}

/// Result type alias for melcap-asr operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fraction of reference tokens that could not be aligned.
pub fn drop_rate(dropped: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        dropped as f32 / total as f32
    }
}

fn percent(dropped: &[String], total: &usize) -> f32 {
    drop_rate(dropped.len(), *total) * 100.0
}

// Nested From implementations for automatic error conversion chains

// hound::Error → InputError → Error
impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Input(InputError::Hound(e))
    }
}

// serde_json::Error → InputError → Error
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Input(InputError::Json(e))
    }
}

// ort::Error → ModelError → Error
impl From<ort::Error> for Error {
    fn from(e: ort::Error) -> Self {
        Error::Model(ModelError::Ort(e))
    }
}

// ShapeError → ModelError → Error
impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Model(ModelError::Shape(e))
    }
}

// MinMaxError → ModelError → Error
impl From<MinMaxError> for Error {
    fn from(e: MinMaxError) -> Self {
        Error::Model(ModelError::MinMax(e))
    }
}
