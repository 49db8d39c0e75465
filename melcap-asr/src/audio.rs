//! Audio extraction and WAV loading.
//!
//! Everything downstream assumes 16 kHz mono samples; [`extract`] is the one
//! place a video's soundtrack is brought into that shape.

use crate::error::{InputError, Result};
use crate::media::Muxer;
use hound::{SampleFormat, WavReader, WavSpec};
use std::path::{Path, PathBuf};

/// Expected sample rate for ASR models (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// File name of the extracted track inside the working directory.
pub const EXTRACTED_WAV: &str = "audio_16k_mono.wav";

/// A 16 kHz mono PCM track extracted into a working directory.
///
/// The file is removed when this value is dropped unless [`ExtractedAudio::keep`]
/// was called.
#[derive(Debug)]
pub struct ExtractedAudio {
    path: PathBuf,
    keep: bool,
}

impl ExtractedAudio {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the file on disk after drop.
    pub fn keep(&mut self) {
        self.keep = true;
    }

    /// Load the extracted samples.
    pub fn read(&self) -> Result<Vec<f32>> {
        read_audio_mono(&self.path)
    }
}

impl Drop for ExtractedAudio {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = ?self.path.display(), error = %e, "failed to remove extracted audio");
        }
    }
}

/// Demux the audio of `video` into `workdir` as 16 kHz mono signed 16-bit PCM.
///
/// # Errors
///
/// - [`InputError::Unreadable`] if the muxer cannot open the file
/// - [`InputError::NoAudioStream`] if the file carries no audio
pub fn extract(muxer: &Muxer, video: &Path, workdir: &Path) -> Result<ExtractedAudio> {
    let info = muxer.probe(video)?;

    if !info.has_audio {
        return Err(InputError::NoAudioStream {
            path: video.to_path_buf(),
        }
        .into());
    }

    let path = workdir.join(EXTRACTED_WAV);

    tracing::info!(input = ?video.display(), output = ?path.display(), "extracting audio");

    let mut cmd = muxer.ffmpeg();
    cmd.arg("-i")
        .arg(video)
        .args(["-vn", "-ac", "1", "-ar"])
        .arg(SAMPLE_RATE.to_string())
        .args(["-c:a", "pcm_s16le"])
        .arg(&path);

    if let Err(failure) = muxer.run(&mut cmd)? {
        return Err(InputError::Unreadable {
            path: video.to_path_buf(),
            detail: failure.stderr,
        }
        .into());
    }

    Ok(ExtractedAudio { path, keep: false })
}

/// Load audio from a WAV file.
///
/// Returns samples scaled to `[-1, 1]` and the WAV specification.
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<hound::Result<_>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<hound::Result<_>>()?
        }
    };

    Ok((samples, spec))
}

/// Load audio from a WAV file as mono f32 samples at 16kHz.
///
/// Validates the sample rate and downmixes stereo.
pub fn read_audio_mono(path: impl AsRef<Path>) -> Result<Vec<f32>> {
    let (audio, spec) = load_audio(path)?;

    if spec.sample_rate != SAMPLE_RATE {
        return Err(InputError::InvalidSampleRate {
            expected: SAMPLE_RATE,
            got: spec.sample_rate,
        }
        .into());
    }

    match spec.channels {
        1 => Ok(audio),
        2 => Ok(audio
            .chunks(2)
            .map(|pair| pair.iter().sum::<f32>() / 2.0)
            .collect()),
        n => Err(InputError::InvalidChannels(n).into()),
    }
}
