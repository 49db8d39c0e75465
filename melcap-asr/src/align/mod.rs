//! Forced alignment: per-word timings from speech, optionally pinned to a reference.

pub mod energy;
pub mod reference;
pub mod transcript;

pub use self::reference::{TokenAlignment, align_tokens};
pub use self::transcript::Transcript;

use crate::error::{AlignmentError, ModelError, Result, drop_rate};
use crate::models::tdt::TdtModel;
use crate::traits::Transcriber;
use crate::types::Word;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Largest fraction of reference tokens that may go untimed.
pub const MAX_DROP_RATE: f32 = 0.05;

/// Languages the multilingual Parakeet TDT v3 checkpoint was trained on.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "hr", "hu", "it", "lt", "lv",
    "mt", "nl", "pl", "pt", "ro", "ru", "sk", "sl", "sv", "uk",
];

/// One model instance per process; its working set is several gigabytes.
static SLOT: Mutex<()> = Mutex::new(());

/// Timed words produced by either alignment entry point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Alignment {
    pub words: Vec<Word>,
    /// Reference tokens that could not be timed; empty for plain transcription.
    pub dropped: Vec<String>,
}

/// Primary subtag of a language hint, lowercased. `auto` means no hint.
pub fn language_code(hint: &str) -> Option<String> {
    let code = hint
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    (!code.is_empty() && code != "auto").then_some(code)
}

/// How words get their timings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignMode {
    /// Recognise the speech with the acoustic model.
    Acoustic,
    /// Spread the reference over detected speech; no model involved.
    Energy,
}

/// Pick the alignment mode before any model is loaded.
///
/// Languages outside [`SUPPORTED_LANGUAGES`] can only be timed against a
/// reference transcript; without one they fail with
/// [`ModelError::LanguageUnsupported`].
pub fn check_language(hint: Option<&str>, has_reference: bool) -> Result<AlignMode> {
    match hint.and_then(language_code) {
        Some(code) if !SUPPORTED_LANGUAGES.contains(&code.as_str()) => {
            if !has_reference {
                return Err(ModelError::LanguageUnsupported(code).into());
            }
            info!(language = %code, "language not recognised by the model, timing by speech energy");
            Ok(AlignMode::Energy)
        }
        _ => Ok(AlignMode::Acoustic),
    }
}

/// Time the tokens of `reference` by spreading them over the speech in `audio`.
///
/// Fails with [`AlignmentError::Unreliable`] when no speech is found.
pub fn align_by_energy(audio: &[f32], reference: &Transcript) -> Result<Alignment> {
    let regions = energy::speech_regions(audio);
    debug!(regions = regions.len(), "detected speech regions");

    let alignment = accept(energy::spread_tokens(reference.tokens(), &regions))?;
    info!(words = alignment.words.len(), "spread reference transcript over speech");

    Ok(alignment)
}

/// Apply the drop-rate ceiling and normalise the timed words.
fn accept(alignment: TokenAlignment) -> Result<Alignment> {
    let TokenAlignment {
        words,
        dropped,
        total,
    } = alignment;

    let rate = drop_rate(dropped.len(), total);
    if rate > MAX_DROP_RATE {
        return Err(AlignmentError::Unreliable { dropped, total }.into());
    }
    if !dropped.is_empty() {
        warn!(
            dropped = dropped.len(),
            total,
            tokens = %dropped.join(" "),
            "some reference tokens could not be timed"
        );
    }

    Ok(Alignment {
        words: normalize_words(words),
        dropped,
    })
}

/// Order words by start and trim each end back to the next start.
///
/// Ties keep their input order. A trim that would leave a word empty is
/// skipped, so equal starts survive untouched.
pub fn normalize_words(mut words: Vec<Word>) -> Vec<Word> {
    words.sort_by(|a, b| a.start.total_cmp(&b.start));

    let starts: Vec<f64> = words.iter().map(|w| w.start).collect();
    for (word, next_start) in words.iter_mut().zip(starts.iter().skip(1)) {
        if word.end > *next_start && *next_start > word.start {
            word.end = *next_start;
        }
    }

    words
}

/// Word-level aligner owning the acoustic model for its lifetime.
///
/// Holds the process-wide model slot: constructing a second aligner blocks
/// until the first is dropped.
pub struct Aligner<M = TdtModel> {
    model: M,
    _slot: MutexGuard<'static, ()>,
}

impl<M: Transcriber> Aligner<M> {
    pub fn new(model: M, language: Option<&str>) -> Result<Self> {
        check_language(language, false)?;

        let slot = SLOT.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("acquired aligner slot");

        Ok(Self { model, _slot: slot })
    }

    /// Transcribe speech and time every recognised word.
    pub fn transcribe(&mut self, audio: &[f32]) -> Result<Alignment> {
        let words = normalize_words(self.model.transcribe(audio)?);
        info!(words = words.len(), "transcribed audio");

        Ok(Alignment {
            words,
            dropped: Vec::new(),
        })
    }

    /// Time the tokens of `reference` against the speech in `audio`.
    ///
    /// Output text is the reference wording. Fails with
    /// [`AlignmentError::Unreliable`] when more than [`MAX_DROP_RATE`] of the
    /// tokens could not be placed.
    pub fn align_reference(&mut self, audio: &[f32], reference: &Transcript) -> Result<Alignment> {
        let heard = normalize_words(self.model.transcribe(audio)?);
        let alignment = accept(align_tokens(reference.tokens(), &heard))?;

        info!(
            words = alignment.words.len(),
            heard = heard.len(),
            "aligned reference transcript"
        );

        Ok(alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Scripted(Vec<Word>);

    impl Transcriber for Scripted {
        fn transcribe(&mut self, _audio: &[f32]) -> Result<Vec<Word>> {
            Ok(self.0.clone())
        }
    }

    fn spaced(words: &[&str]) -> Vec<Word> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| Word::new(*w, i as f64 * 0.4, i as f64 * 0.4 + 0.3))
            .collect()
    }

    #[test]
    fn language_hints() {
        assert_eq!(language_code("en-US").as_deref(), Some("en"));
        assert_eq!(language_code("PT_br").as_deref(), Some("pt"));
        assert_eq!(language_code("auto"), None);
        assert_eq!(check_language(Some("de"), false).unwrap(), AlignMode::Acoustic);
        assert_eq!(check_language(None, false).unwrap(), AlignMode::Acoustic);
        assert!(matches!(
            check_language(Some("hi"), false),
            Err(Error::Model(ModelError::LanguageUnsupported(code))) if code == "hi"
        ));
    }

    #[test]
    fn hindi_with_reference_is_timed_by_energy() {
        assert_eq!(check_language(Some("hi-IN"), true).unwrap(), AlignMode::Energy);
        assert_eq!(check_language(Some("en"), true).unwrap(), AlignMode::Acoustic);
    }

    #[test]
    fn energy_alignment_keeps_reference_wording() {
        let sr = crate::audio::SAMPLE_RATE as usize;
        let mut audio = vec![0.0_f32; sr / 2];
        audio.extend((0..sr).map(|i| 0.3 * (i as f32 * 0.17).sin()));
        audio.extend(vec![0.0_f32; sr / 2]);
        let reference = Transcript::parse("नमस्ते दुनिया फिर").unwrap();

        let alignment = align_by_energy(&audio, &reference).unwrap();

        let texts: Vec<&str> = alignment.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["नमस्ते", "दुनिया", "फिर"]);
        assert!(alignment.dropped.is_empty());
        assert!((alignment.words[0].start - 0.5).abs() < 1e-6);
        assert!((alignment.words[2].end - 1.5).abs() < 1e-6);
    }

    #[test]
    fn energy_alignment_without_speech_is_unreliable() {
        let reference = Transcript::parse("नमस्ते दुनिया").unwrap();

        assert!(matches!(
            align_by_energy(&[0.0; 16000], &reference),
            Err(Error::Alignment(AlignmentError::Unreliable { total: 2, .. }))
        ));
    }

    #[test]
    fn normalizes_order_and_overlap() {
        let words = normalize_words(vec![
            Word::new("b", 1.0, 2.0),
            Word::new("a", 0.0, 1.5),
            Word::new("c", 1.0, 1.2),
        ]);

        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert_eq!(words[0].end, 1.0);
        // equal starts cannot be trimmed
        assert_eq!(words[1].end, 2.0);
    }

    #[test]
    fn reference_wording_replaces_recognised_text() {
        let mut aligner =
            Aligner::new(Scripted(spaced(&["hello", "world"])), Some("en")).unwrap();
        let reference = Transcript::parse("Hello, world!").unwrap();

        let alignment = aligner.align_reference(&[], &reference).unwrap();

        assert_eq!(alignment.words[0].text, "Hello,");
        assert_eq!(alignment.words[1].text, "world!");
        assert!(alignment.dropped.is_empty());
    }

    #[test]
    fn too_many_drops_is_unreliable() {
        let reference: Vec<String> = (0..100).map(|i| format!("token{i}")).collect();
        let heard: Vec<&str> = reference
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 12 != 0)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(heard.len(), 91);

        let mut aligner = Aligner::new(Scripted(spaced(&heard)), None).unwrap();
        let transcript = Transcript::parse(&reference.join(" ")).unwrap();

        match aligner.align_reference(&[], &transcript) {
            Err(Error::Alignment(AlignmentError::Unreliable { dropped, total })) => {
                assert_eq!(total, 100);
                assert_eq!(dropped.len(), 9);
                assert_eq!(dropped[0], "token0");
            }
            other => panic!("expected unreliable alignment, got {other:?}"),
        }
    }

    #[test]
    fn few_drops_are_tolerated() {
        let reference: Vec<String> = (0..100).map(|i| format!("token{i}")).collect();
        let heard: Vec<&str> = reference
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 20 != 7)
            .map(|(_, t)| t.as_str())
            .collect();

        let mut aligner = Aligner::new(Scripted(spaced(&heard)), None).unwrap();
        let transcript = Transcript::parse(&reference.join(" ")).unwrap();

        let alignment = aligner.align_reference(&[], &transcript).unwrap();

        assert_eq!(alignment.dropped.len(), 5);
        assert_eq!(alignment.words.len(), 95);
    }

    #[test]
    fn unsupported_language_fails_before_alignment() {
        let result = Aligner::new(Scripted(Vec::new()), Some("ja"));

        assert!(matches!(
            result,
            Err(Error::Model(ModelError::LanguageUnsupported(_)))
        ));
    }

    #[test]
    fn transcription_output_is_sorted() {
        let mut aligner = Aligner::new(
            Scripted(vec![Word::new("two", 1.0, 1.5), Word::new("one", 0.0, 0.5)]),
            None,
        )
        .unwrap();

        let alignment = aligner.transcribe(&[]).unwrap();

        assert_eq!(alignment.words[0].text, "one");
    }
}
