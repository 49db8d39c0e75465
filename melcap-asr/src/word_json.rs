//! Timed-word JSON files: our own flat dump and WhisperX output.

use crate::align::normalize_words;
use crate::error::{InputError, OutputError, Result};
use crate::types::Word;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

#[derive(Deserialize)]
struct RawWord {
    #[serde(alias = "word")]
    text: String,
    start: Option<f64>,
    end: Option<f64>,
}

#[derive(Deserialize)]
struct RawSegment {
    #[serde(default)]
    words: Vec<RawWord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WordFile {
    Flat(Vec<RawWord>),
    WhisperX {
        word_segments: Option<Vec<RawWord>>,
        #[serde(default)]
        segments: Vec<RawSegment>,
    },
}

impl WordFile {
    fn into_raw(self) -> Vec<RawWord> {
        match self {
            WordFile::Flat(words) => words,
            WordFile::WhisperX {
                word_segments: Some(words),
                ..
            } => words,
            WordFile::WhisperX { segments, .. } => {
                segments.into_iter().flat_map(|s| s.words).collect()
            }
        }
    }
}

/// Parse timed words from JSON text.
///
/// Accepts a flat array of `{text|word, start, end}` objects or WhisperX
/// output (`word_segments`, falling back to `segments[].words`). Entries
/// without timings or with empty spans are skipped.
pub fn parse_words(json: &str) -> Result<Vec<Word>> {
    let file: WordFile = serde_json::from_str(json).map_err(InputError::from)?;
    Ok(collect(file))
}

fn collect(file: WordFile) -> Vec<Word> {
    let raw = file.into_raw();
    let listed = raw.len();

    let words: Vec<Word> = raw
        .into_iter()
        .filter_map(|w| Word::checked(&w.text, w.start?, w.end?))
        .collect();

    if words.len() < listed {
        debug!(skipped = listed - words.len(), "skipped untimed words");
    }

    normalize_words(words)
}

/// Read timed words from `path`, failing with [`InputError::NoWords`] if none are usable.
pub fn read_words(path: &Path) -> Result<Vec<Word>> {
    let file = File::open(path).map_err(|e| InputError::Unreadable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let parsed: WordFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| InputError::Unreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let words = collect(parsed);
    if words.is_empty() {
        return Err(InputError::NoWords {
            path: path.to_path_buf(),
        }
        .into());
    }

    Ok(words)
}

/// Write `words` as a pretty-printed flat JSON array.
pub fn write_words(path: &Path, words: &[Word]) -> Result<()> {
    let write_failed = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(write_failed)?);
    serde_json::to_writer_pretty(&mut writer, words).map_err(|source| {
        OutputError::Serialize {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.write_all(b"\n").map_err(write_failed)?;
    writer.flush().map_err(write_failed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn parses_flat_array() {
        let words = parse_words(
            r#"[{"text": "hi", "start": 0.1, "end": 0.4},
                {"word": "there", "start": 0.5, "end": 0.9}]"#,
        )
        .unwrap();

        assert_eq!(
            words,
            vec![Word::new("hi", 0.1, 0.4), Word::new("there", 0.5, 0.9)]
        );
    }

    #[test]
    fn parses_whisperx_segments() {
        let json = r#"{
            "segments": [
                {"text": "one two", "words": [
                    {"word": "one", "start": 0.0, "end": 0.3, "score": 0.9},
                    {"word": "2", "score": 0.1}
                ]},
                {"text": "three", "words": [{"word": "three", "start": 1.0, "end": 1.4}]}
            ]
        }"#;

        let words = parse_words(json).unwrap();

        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["one", "three"]);
    }

    #[test]
    fn prefers_word_segments() {
        let json = r#"{
            "segments": [{"words": [{"word": "ignored", "start": 0.0, "end": 1.0}]}],
            "word_segments": [{"word": "kept", "start": 0.0, "end": 1.0}]
        }"#;

        assert_eq!(parse_words(json).unwrap()[0].text, "kept");
    }

    #[test]
    fn file_without_usable_words_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.json");
        std::fs::write(&path, r#"[{"word": "x", "start": 1.0, "end": 1.0}]"#).unwrap();

        assert!(matches!(
            read_words(&path),
            Err(Error::Input(InputError::NoWords { .. }))
        ));
    }

    #[test]
    fn unwritable_destination_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("words.json");

        assert!(matches!(
            write_words(&path, &[Word::new("a", 0.0, 0.1)]),
            Err(Error::Output(OutputError::Write { .. }))
        ));
    }

    #[test]
    fn written_words_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.json");
        let words = vec![Word::new("Hello,", 0.0, 0.5), Word::new("world", 0.6, 1.0)];

        write_words(&path, &words).unwrap();

        assert_eq!(read_words(&path).unwrap(), words);
    }
}
