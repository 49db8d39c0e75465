//! Timing by speech energy, for languages the acoustic model cannot recognise.
//!
//! Speech regions come from frame RMS. Reference tokens are spread over the
//! regions in proportion to their character count, so pauses never carry a
//! token start.

use super::reference::{TokenAlignment, attach_bare_punctuation, normalize_token};
use crate::audio::SAMPLE_RATE;
use crate::types::Word;

/// Samples per analysis frame (20 ms).
const FRAME_LEN: usize = 320;

/// Frames quieter than this fraction of the loudest frame are silence.
const RELATIVE_THRESHOLD: f32 = 0.1;

/// RMS below which a frame is silence however quiet the recording is.
const NOISE_FLOOR: f32 = 1e-3;

/// Pauses shorter than this are bridged.
pub const MIN_PAUSE_SECS: f64 = 0.3;

/// Regions shorter than this are dropped as clicks.
pub const MIN_REGION_SECS: f64 = 0.1;

/// Stretch of audio containing speech, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    pub start: f64,
    pub end: f64,
}

impl Region {
    fn len(&self) -> f64 {
        self.end - self.start
    }
}

fn rms(frame: &[f32]) -> f32 {
    (frame.iter().map(|s| s * s).sum::<f32>() / frame.len().max(1) as f32).sqrt()
}

/// Speech regions of 16 kHz mono `audio`, in order.
pub fn speech_regions(audio: &[f32]) -> Vec<Region> {
    let frame_secs = FRAME_LEN as f64 / SAMPLE_RATE as f64;
    let duration = audio.len() as f64 / SAMPLE_RATE as f64;

    let energies: Vec<f32> = audio.chunks(FRAME_LEN).map(rms).collect();
    let loudest = energies.iter().copied().fold(0.0_f32, f32::max);
    let threshold = (loudest * RELATIVE_THRESHOLD).max(NOISE_FLOOR);

    let mut regions: Vec<Region> = Vec::new();
    let mut open: Option<usize> = None;

    // trailing silent frame closes a region running to the end
    let frames = energies.into_iter().chain(std::iter::once(0.0));
    for (k, energy) in frames.enumerate() {
        match (open, energy >= threshold) {
            (None, true) => open = Some(k),
            (Some(first), false) => {
                let region = Region {
                    start: first as f64 * frame_secs,
                    end: (k as f64 * frame_secs).min(duration),
                };
                match regions.last_mut() {
                    Some(last) if region.start - last.end < MIN_PAUSE_SECS => last.end = region.end,
                    _ => regions.push(region),
                }
                open = None;
            }
            _ => {}
        }
    }

    regions.retain(|r| r.len() >= MIN_REGION_SECS);
    regions
}

/// Point `offset` seconds into the concatenated regions.
///
/// An offset on a region boundary maps to the next region's start when
/// `leading`, otherwise to the earlier region's end.
fn timeline_at(regions: &[Region], offset: f64, leading: bool) -> f64 {
    let mut remaining = offset.max(0.0);

    for (k, region) in regions.iter().enumerate() {
        let len = region.len();
        let inside = if leading {
            remaining < len
        } else {
            remaining <= len
        };
        if inside || k + 1 == regions.len() {
            return (region.start + remaining).min(region.end);
        }
        remaining -= len;
    }

    0.0
}

/// Spread `reference` tokens over `regions` by character count.
///
/// Every token is timed unless there is no speech at all, in which case
/// every token is dropped.
pub fn spread_tokens(reference: &[String], regions: &[Region]) -> TokenAlignment {
    let tokens = attach_bare_punctuation(reference);
    let total = tokens.len();
    let speech: f64 = regions.iter().map(Region::len).sum();

    if total == 0 {
        return TokenAlignment::default();
    }
    if speech <= 0.0 {
        return TokenAlignment {
            words: Vec::new(),
            dropped: tokens,
            total,
        };
    }

    let weights: Vec<usize> = tokens
        .iter()
        .map(|t| normalize_token(t).chars().count().max(1))
        .collect();
    let total_weight: usize = weights.iter().sum();
    let at = |consumed: usize| speech * consumed as f64 / total_weight as f64;

    let mut words = Vec::with_capacity(total);
    let mut dropped = Vec::new();
    let mut consumed = 0;

    for (token, weight) in tokens.iter().zip(weights) {
        let start = timeline_at(regions, at(consumed), true);
        consumed += weight;
        let end = timeline_at(regions, at(consumed), false);

        match Word::checked(token, start, end) {
            Some(word) => words.push(word),
            None => dropped.push(token.clone()),
        }
    }

    TokenAlignment {
        words,
        dropped,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(secs: f64) -> Vec<f32> {
        let n = (secs * SAMPLE_RATE as f64).round() as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    fn silence(secs: f64) -> Vec<f32> {
        vec![0.0; (secs * SAMPLE_RATE as f64).round() as usize]
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn finds_speech_and_bridges_short_pauses() {
        let audio = [
            silence(0.5),
            tone(1.0),
            silence(0.1),
            tone(0.5),
            silence(1.0),
            tone(0.5),
            silence(0.5),
        ]
        .concat();

        let regions = speech_regions(&audio);

        assert_eq!(regions.len(), 2, "{regions:?}");
        assert!(close(regions[0].start, 0.5) && close(regions[0].end, 2.1), "{regions:?}");
        assert!(close(regions[1].start, 3.1) && close(regions[1].end, 3.6), "{regions:?}");
    }

    #[test]
    fn silence_has_no_speech() {
        assert!(speech_regions(&silence(2.0)).is_empty());
        assert!(speech_regions(&[]).is_empty());
    }

    #[test]
    fn region_running_to_the_end_is_closed() {
        let audio = [silence(0.4), tone(0.6)].concat();

        let regions = speech_regions(&audio);

        assert_eq!(regions.len(), 1);
        assert!(close(regions[0].end, 1.0), "{regions:?}");
    }

    #[test]
    fn spreads_by_character_count_and_skips_pauses() {
        let regions = [
            Region {
                start: 0.0,
                end: 1.0,
            },
            Region {
                start: 2.0,
                end: 3.0,
            },
        ];

        let result = spread_tokens(&tokens("aa bb cccc"), &regions);

        assert!(result.dropped.is_empty());
        let spans: Vec<(f64, f64)> = result.words.iter().map(|w| (w.start, w.end)).collect();
        assert_eq!(spans, [(0.0, 0.5), (0.5, 1.0), (2.0, 3.0)]);
    }

    #[test]
    fn devanagari_tokens_are_timed() {
        let regions = [Region {
            start: 0.2,
            end: 1.4,
        }];

        let result = spread_tokens(&tokens("नमस्ते दुनिया।"), &regions);

        assert_eq!(result.total, 2);
        assert!(result.dropped.is_empty());
        assert_eq!(result.words[0].text, "नमस्ते");
        assert_eq!(result.words[0].start, 0.2);
        assert!(close(result.words[1].end, 1.4));
    }

    #[test]
    fn no_speech_drops_every_token() {
        let result = spread_tokens(&tokens("one two"), &[]);

        assert!(result.words.is_empty());
        assert_eq!(result.dropped, ["one", "two"]);
        assert_eq!(result.total, 2);
    }
}
