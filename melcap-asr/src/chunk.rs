//! Overlapping analysis windows for long narration.

use crate::audio::SAMPLE_RATE;
use crate::error::ConfigError;
use std::ops::Range;

const DEFAULT_WINDOW_SECS: f32 = 240.0;

const DEFAULT_OVERLAP_SECS: f32 = 1.0;

/// Shortest window the encoder handles reliably.
const MIN_WINDOW_SECS: f32 = 5.0;

/// Windowing of long audio before transcription.
#[derive(clap::Args, Clone, Copy, Debug, PartialEq)]
pub struct ChunkConfig {
    /// Analysis window in seconds for long audio
    #[arg(long = "duration", default_value_t = DEFAULT_WINDOW_SECS)]
    pub duration: f32,

    /// Overlap between consecutive windows in seconds
    #[arg(long = "overlap", default_value_t = DEFAULT_OVERLAP_SECS)]
    pub overlap: f32,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_WINDOW_SECS,
            overlap: DEFAULT_OVERLAP_SECS,
        }
    }
}

impl ChunkConfig {
    pub fn new(duration: f32, overlap: f32) -> Self {
        Self { duration, overlap }
    }

    /// Reject windows that are too short or overlaps that swallow the window.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.duration.is_nan() || self.duration < MIN_WINDOW_SECS {
            return Err(ConfigError::InvalidChunkDuration {
                duration: self.duration,
                min: MIN_WINDOW_SECS,
            });
        }
        if self.overlap.is_nan() || self.overlap < 0.0 || self.overlap >= self.duration {
            return Err(ConfigError::InvalidChunkOverlap {
                overlap: self.overlap,
                duration: self.duration,
            });
        }
        Ok(self)
    }

    fn window_samples(&self) -> usize {
        (self.duration * SAMPLE_RATE as f32) as usize
    }

    fn step_samples(&self, align: usize) -> usize {
        let overlap = (self.overlap * SAMPLE_RATE as f32) as usize;
        let step = self.window_samples().saturating_sub(overlap);
        let align = align.max(1);
        (step / align * align).max(align)
    }

    /// Sample ranges covering `len` samples, each paired with its offset in seconds.
    pub fn windows(&self, len: usize) -> Windows {
        self.windows_aligned(len, 1)
    }

    /// Like [`ChunkConfig::windows`], with every window start a multiple of `align` samples.
    pub fn windows_aligned(&self, len: usize, align: usize) -> Windows {
        Windows {
            len,
            window: self.window_samples().max(1),
            step: self.step_samples(align),
            next: Some(0),
        }
    }
}

/// Iterator returned by [`ChunkConfig::windows`].
pub struct Windows {
    len: usize,
    window: usize,
    step: usize,
    next: Option<usize>,
}

impl Iterator for Windows {
    type Item = (Range<usize>, f32);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = (start + self.window).min(self.len);

        // the last window reaches the end; nothing left to cover
        self.next = (end < self.len).then_some(start + self.step);

        Some((start..end, start as f32 / SAMPLE_RATE as f32))
    }
}
