//! Log-mel feature extraction for the Parakeet encoder.

use ndarray::{Array1, Array2, Axis};
use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;

/// Parameters of a mel-spectrogram front-end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MelConfig {
    pub n_mels: usize,
    pub hop_length: usize,
    pub n_fft: usize,
    pub win_length: usize,
    pub preemphasis: f32,
    pub sample_rate: usize,
}

impl MelConfig {
    /// Front-end of the Parakeet TDT models (128 mel bins, 10 ms hop).
    pub const TDT: Self = Self {
        n_mels: 128,
        hop_length: 160,
        n_fft: 512,
        win_length: 400,
        preemphasis: 0.97,
        sample_rate: 16000,
    };

    /// Seconds covered by one mel frame.
    pub fn frame_secs(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }
}

/// Mel-spectrogram extractor with its window and filterbank precomputed.
pub struct MelSpectrogram {
    config: MelConfig,
    window: Vec<f32>,
    filterbank: Array2<f32>,
}

impl MelSpectrogram {
    pub fn new(config: MelConfig) -> Self {
        Self {
            window: hann_window(config.win_length),
            filterbank: mel_filterbank(config.n_fft, config.n_mels, config.sample_rate),
            config,
        }
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    /// Compute normalised log-mel features shaped `(frames, n_mels)`.
    ///
    /// Audio shorter than one window is zero-padded to a single frame.
    pub fn apply(&self, audio: &[f32]) -> Array2<f32> {
        let mut signal = preemphasis(audio, self.config.preemphasis);
        if signal.len() < self.config.win_length {
            signal.resize(self.config.win_length, 0.0);
        }

        let power = self.power_spectrogram(&signal);
        let mut mel = self
            .filterbank
            .dot(&power)
            .mapv(|x| x.max(1e-10).ln())
            .reversed_axes();

        normalize_columns(&mut mel);
        mel
    }

    /// Power spectrogram shaped `(n_fft / 2 + 1, frames)`.
    fn power_spectrogram(&self, signal: &[f32]) -> Array2<f32> {
        let MelConfig {
            n_fft,
            hop_length,
            win_length,
            ..
        } = self.config;

        let frames = (signal.len() - win_length) / hop_length + 1;
        let bins = n_fft / 2 + 1;
        let mut power = Array2::<f32>::zeros((bins, frames));

        let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
        let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];

        for (frame, mut column) in power.axis_iter_mut(Axis(1)).enumerate() {
            let offset = frame * hop_length;

            buffer.fill(Complex::new(0.0, 0.0));
            for (slot, (sample, w)) in buffer
                .iter_mut()
                .zip(signal[offset..offset + win_length].iter().zip(&self.window))
            {
                *slot = Complex::new(sample * w, 0.0);
            }

            fft.process(&mut buffer);

            for (dst, c) in column.iter_mut().zip(&buffer[..bins]) {
                *dst = c.norm_sqr();
            }
        }

        power
    }
}

/// `y[i] = x[i] - coef * x[i-1]`
fn preemphasis(audio: &[f32], coef: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(audio.len());
    if let Some(&first) = audio.first() {
        out.push(first);
        out.extend(audio.windows(2).map(|w| w[1] - coef * w[0]));
    }
    out
}

fn hann_window(len: usize) -> Vec<f32> {
    let denom = (len.max(2) - 1) as f32;
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / denom).cos())
        .collect()
}

fn hz_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters shaped `(n_mels, n_fft / 2 + 1)`.
fn mel_filterbank(n_fft: usize, n_mels: usize, sample_rate: usize) -> Array2<f32> {
    let bins = n_fft / 2 + 1;
    let max_mel = hz_to_mel(sample_rate as f32 / 2.0);
    let edges: Array1<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f32 / (n_mels + 1) as f32))
        .collect();
    let bin_hz = sample_rate as f32 / n_fft as f32;

    Array2::from_shape_fn((n_mels, bins), |(m, k)| {
        let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
        let freq = k as f32 * bin_hz;
        if freq >= left && freq <= center {
            (freq - left) / (center - left)
        } else if freq > center && freq <= right {
            (right - freq) / (right - center)
        } else {
            0.0
        }
    })
}

/// Zero mean, unit variance per feature column.
fn normalize_columns(features: &mut Array2<f32>) {
    let frames = features.nrows().max(1) as f32;
    for mut column in features.axis_iter_mut(Axis(1)) {
        let mean = column.sum() / frames;
        let var = column.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / frames;
        let std = var.sqrt().max(1e-10);
        column.mapv_inplace(|x| (x - mean) / std);
    }
}
