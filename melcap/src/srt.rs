//! SRT sidecar for phrases.
//!
//! One cue per phrase; wrapped phrases keep their line break.

use crate::segment::Phrase;
use srtlib::{Subtitle, Timestamp};
use std::path::Path;

/// Convert phrases to SRT cues numbered from 1.
pub fn to_subtitles(phrases: &[Phrase]) -> Vec<Subtitle> {
    phrases
        .iter()
        .zip(1..)
        .map(|(phrase, i)| create_subtitle(phrase, i))
        .collect()
}

fn create_subtitle(phrase: &Phrase, index: usize) -> Subtitle {
    Subtitle::new(
        index,
        secs_to_timestamp(phrase.start()),
        secs_to_timestamp(phrase.end()),
        phrase.line_texts().join("\n"),
    )
}

fn secs_to_timestamp(secs: f64) -> Timestamp {
    Timestamp::from_milliseconds((secs.max(0.0) * 1000.0).round() as u32)
}

pub fn write_srt(path: &Path, subtitles: &[Subtitle]) -> std::io::Result<()> {
    std::fs::write(path, display_subtitles(subtitles) + "\n")
}

/// Format subtitles as SRT file content.
pub fn display_subtitles(subtitles: &[Subtitle]) -> String {
    subtitles
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First `head_count` and last `tail_count` cues, with an ellipsis between.
pub fn preview_subtitles(subtitles: &[Subtitle], head_count: usize, tail_count: usize) -> String {
    let total = subtitles.len();

    if total <= head_count + tail_count {
        return display_subtitles(subtitles);
    }

    let mut out = Vec::with_capacity(head_count + tail_count + 1);
    out.extend(subtitles[..head_count].iter().map(|s| s.to_string()));
    out.push("...".to_string());
    out.extend(subtitles[total - tail_count..].iter().map(|s| s.to_string()));
    out.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use melcap_asr::types::Word;

    fn phrase(words: &[(&str, f64, f64)]) -> Phrase {
        Phrase::new(
            words
                .iter()
                .map(|&(text, start, end)| Word::new(text, start, end))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn one_cue_per_phrase() {
        let phrases = vec![
            phrase(&[("Hello", 0.0, 0.4), ("world.", 0.45, 1.1)]),
            phrase(&[("How", 1.5, 1.7), ("are", 1.75, 2.0), ("you?", 2.1, 3.1)]),
        ];

        let subtitles = to_subtitles(&phrases);

        match &subtitles[..] {
            [first, second] => {
                assert_eq!(first.num, 1);
                assert_eq!(first.text, "Hello world.");
                assert_eq!(second.text, "How are you?");
                assert_eq!(second.start_time.to_string(), "00:00:01,500");
                assert_eq!(second.end_time.to_string(), "00:00:03,100");
            }
            _ => panic!("expected 2 cues, got {}", subtitles.len()),
        }
    }

    #[test]
    fn wrapped_phrase_keeps_line_break() {
        let words = vec![
            Word::new("first", 0.0, 0.3),
            Word::new("line", 0.3, 0.6),
            Word::new("second", 0.6, 0.9),
        ];
        let phrases = vec![Phrase::wrapped(words, 2).unwrap()];

        let subtitles = to_subtitles(&phrases);

        assert_eq!(subtitles[0].text, "first line\nsecond");
    }

    #[test]
    fn preview_elides_the_middle() {
        let phrases: Vec<_> = (0..10)
            .map(|i| {
                let start = i as f64;
                phrase(&[(&format!("w{i}"), start, start + 0.5)])
            })
            .collect();

        let subtitles = to_subtitles(&phrases);
        let preview = preview_subtitles(&subtitles, 3, 3);

        assert!(preview.contains("w2"));
        assert!(!preview.contains("w5"));
        assert!(preview.contains("w9"));
        assert_eq!(preview.matches("...").count(), 1);
    }

    #[test]
    fn handles_no_phrases() {
        let subtitles = to_subtitles(&[]);
        assert!(subtitles.is_empty());
        assert_eq!(preview_subtitles(&subtitles, 3, 3), "");
    }
}
