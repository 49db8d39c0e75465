//! Seam between the aligner and the acoustic model.

use crate::error::Result;
use crate::models::tdt::TdtModel;
use crate::types::Word;

/// Speech model producing timed words from 16 kHz mono samples.
///
/// Takes `&mut self` because ONNX Runtime's `Session::run` requires it.
pub trait Transcriber {
    fn transcribe(&mut self, audio: &[f32]) -> Result<Vec<Word>>;
}

impl Transcriber for TdtModel {
    fn transcribe(&mut self, audio: &[f32]) -> Result<Vec<Word>> {
        self.transcribe_words(audio)
    }
}
