//! Integration tests for alignment through the public API.

use hf_hub::api::sync::Api;
use melcap_asr::align::{Aligner, Transcript};
use melcap_asr::audio::SAMPLE_RATE;
use melcap_asr::error::{AlignmentError, Error, Result};
use melcap_asr::models::tdt::TdtModel;
use melcap_asr::traits::Transcriber;
use melcap_asr::types::{ModelRepo, Word};
use melcap_asr::word_json::{read_words, write_words};
use ort::session::Session;

const MODEL_ID: &str = "istupakov/parakeet-tdt-0.6b-v3-onnx";

/// Replays fixed words regardless of the audio.
struct Replay(Vec<Word>);

impl Transcriber for Replay {
    fn transcribe(&mut self, _audio: &[f32]) -> Result<Vec<Word>> {
        Ok(self.0.clone())
    }
}

#[test]
fn aligned_words_replay_from_json() {
    let heard = vec![
        Word::new("the", 0.0, 0.2),
        Word::new("newyork", 0.2, 0.9),
        Word::new("office", 1.0, 1.5),
    ];
    let reference = Transcript::parse("The New York office.").unwrap();

    let mut aligner = Aligner::new(Replay(heard), Some("en")).unwrap();
    let alignment = aligner.align_reference(&[], &reference).unwrap();
    drop(aligner);

    let texts: Vec<&str> = alignment.words.iter().map(|w| w.text.as_str()).collect();
    assert_eq!(texts, ["The", "New", "York", "office."]);
    assert!(alignment.dropped.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.json");
    write_words(&path, &alignment.words).unwrap();

    assert_eq!(read_words(&path).unwrap(), alignment.words);
}

#[test]
fn unrelated_speech_is_unreliable() {
    let heard = vec![Word::new("completely", 0.0, 0.5), Word::new("different", 0.6, 1.0)];
    let reference = Transcript::parse("alpha beta gamma delta").unwrap();

    let mut aligner = Aligner::new(Replay(heard), None).unwrap();

    match aligner.align_reference(&[], &reference) {
        Err(Error::Alignment(AlignmentError::Unreliable { dropped, total })) => {
            assert_eq!(total, 4);
            assert!(!dropped.is_empty());
        }
        other => panic!("expected Unreliable, got {other:?}"),
    }
}

#[test]
#[ignore = "network I/O and model download required"]
fn model_transcribes_silence_to_nothing() {
    let repo = ModelRepo::Api(Api::new().unwrap().model(MODEL_ID.to_string()));
    let model = TdtModel::from_repo(&repo, Session::builder().unwrap(), Default::default())
        .expect("failed to load model");

    let silence = vec![0.0_f32; SAMPLE_RATE as usize * 2];

    let mut aligner = Aligner::new(model, None).unwrap();
    let alignment = aligner.transcribe(&silence).unwrap();

    assert!(
        alignment.words.iter().all(|w| w.end > w.start),
        "{:?}",
        alignment.words
    );
}
