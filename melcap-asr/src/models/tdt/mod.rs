//! TDT (Token-and-Duration Transducer) model implementation.

pub mod core;
pub mod inference;
pub mod merge;
pub mod vocab;
pub mod words;

pub use self::core::{MODEL_FILES, TdtModel};

/// Token emitted by the joint decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenDuration {
    pub token_id: usize,
    /// Encoder frame the token was emitted at
    pub frame_index: usize,
    /// Predicted number of frames the token spans
    pub duration: usize,
}

impl TokenDuration {
    pub fn new(token_id: usize, frame_index: usize, duration: usize) -> Self {
        Self {
            token_id,
            frame_index,
            duration,
        }
    }

    /// First frame after the token; zero-duration tokens still occupy their frame.
    pub fn end_frame(&self) -> usize {
        self.frame_index + self.duration.max(1)
    }
}
