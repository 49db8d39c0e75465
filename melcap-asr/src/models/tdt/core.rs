//! TDT model definition, loading and chunked transcription.

use super::merge::merge_chunks;
use super::vocab::Vocabulary;
use super::words::tokens_to_words;
use crate::chunk::ChunkConfig;
use crate::error::{ModelError, Result};
use crate::features::{MelConfig, MelSpectrogram};
use crate::types::{ModelRepo, Word};
use ort::session::Session;
use ort::session::builder::SessionBuilder;

/// Files making up the ONNX export of Parakeet TDT 0.6B v3.
pub const MODEL_FILES: &[&str] = &[
    "encoder-model.onnx",
    "encoder-model.onnx.data",
    "decoder_joint-model.onnx",
    "vocab.txt",
];

/// Token-and-Duration Transducer with encoder and joint decoder sessions.
///
/// The joint decoder predicts a token and how many encoder frames it spans,
/// which gives word timings straight out of greedy decoding.
pub struct TdtModel {
    pub(super) mel: MelSpectrogram,
    pub(super) encoder: Session,
    pub(super) decoder_joint: Session,
    pub(super) vocab: Vocabulary,
    pub(super) durations: Vec<usize>,
    chunk: ChunkConfig,
}

impl TdtModel {
    /// Encoder downsampling of mel frames.
    pub const SUBSAMPLING_FACTOR: usize = 8;

    pub fn new(
        encoder: Session,
        decoder_joint: Session,
        vocab: Vocabulary,
        chunk: ChunkConfig,
    ) -> Self {
        Self {
            mel: MelSpectrogram::new(MelConfig::TDT),
            encoder,
            decoder_joint,
            vocab,
            durations: vec![0, 1, 2, 3, 4],
            chunk,
        }
    }

    /// Load sessions and vocabulary from a model repository.
    pub fn from_repo(
        repo: &ModelRepo,
        session_builder: SessionBuilder,
        chunk: ChunkConfig,
    ) -> Result<Self> {
        let load_failed = |e: eyre::Report| ModelError::LoadFailed(format!("{e:#}"));

        let encoder_path = repo
            .resolve_any(&[
                "encoder-model.onnx",
                "encoder.onnx",
                "encoder-model.int8.onnx",
            ])
            .map_err(load_failed)?;

        let decoder_path = repo
            .resolve_any(&[
                "decoder_joint-model.onnx",
                "decoder_joint.onnx",
                "decoder_joint-model.int8.onnx",
            ])
            .map_err(load_failed)?;

        let vocab_path = repo.resolve("vocab.txt").map_err(load_failed)?;

        tracing::debug!(encoder = ?encoder_path.display(), decoder = ?decoder_path.display(), "loading sessions");

        let encoder = session_builder
            .clone()
            .commit_from_file(&encoder_path)
            .map_err(|e| ModelError::LoadFailed(format!("encoder: {e}")))?;

        let decoder_joint = session_builder
            .commit_from_file(&decoder_path)
            .map_err(|e| ModelError::LoadFailed(format!("decoder: {e}")))?;

        let vocab = Vocabulary::from_file(&vocab_path)?;

        Ok(Self::new(encoder, decoder_joint, vocab, chunk))
    }

    /// Seconds covered by one encoder frame.
    pub fn frame_secs(&self) -> f64 {
        self.mel.config().frame_secs() * Self::SUBSAMPLING_FACTOR as f64
    }

    fn samples_per_frame(&self) -> usize {
        self.mel.config().hop_length * Self::SUBSAMPLING_FACTOR
    }

    /// Transcribe 16 kHz mono samples into timed words.
    ///
    /// Long audio is processed in overlapping windows whose starts fall on
    /// encoder frame boundaries, then merged at frame level.
    pub fn transcribe_words(&mut self, audio: &[f32]) -> Result<Vec<Word>> {
        if audio.is_empty() {
            return Ok(Vec::new());
        }

        let per_frame = self.samples_per_frame();
        let windows: Vec<_> = self.chunk.windows_aligned(audio.len(), per_frame).collect();

        let mut chunks = Vec::with_capacity(windows.len());

        for (i, (range, offset_secs)) in windows.into_iter().enumerate() {
            let frame_offset = range.start / per_frame;

            tracing::debug!(
                chunk = i + 1,
                offset_secs,
                duration_secs = range.len() as f32 / crate::audio::SAMPLE_RATE as f32,
                "transcribing window"
            );

            let features = self.mel.apply(&audio[range]);
            let (encoded, frames) = self.encode(features)?;
            let mut tokens = self.greedy_decode(&encoded, frames)?;

            for token in &mut tokens {
                token.frame_index += frame_offset;
            }

            chunks.push(tokens);
        }

        let tokens = merge_chunks(chunks);

        tokens_to_words(&tokens, &self.vocab, self.frame_secs())
    }
}
