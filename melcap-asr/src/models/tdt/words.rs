//! Grouping decoded subword tokens into timed words.

use super::TokenDuration;
use super::vocab::{Vocabulary, WORD_MARKER};
use crate::error::{ModelError, Result};
use crate::types::Word;

struct Pending {
    text: String,
    start_frame: usize,
    end_frame: usize,
}

/// Join SentencePiece tokens into words.
///
/// A piece starting with the word marker opens a new word; any other piece,
/// punctuation included, extends the current one. Tokens predicted with zero
/// duration still cover one frame so every word has a positive span.
pub fn tokens_to_words(
    tokens: &[TokenDuration],
    vocab: &Vocabulary,
    frame_secs: f64,
) -> Result<Vec<Word>> {
    let mut words = Vec::new();
    let mut current: Option<Pending> = None;

    for token in tokens {
        let piece = vocab
            .piece(token.token_id)
            .ok_or(ModelError::UnknownToken(token.token_id))?;

        if Vocabulary::is_control(piece) {
            continue;
        }

        let end_frame = token.end_frame();

        match piece.strip_prefix(WORD_MARKER) {
            Some(rest) => {
                words.extend(current.take().and_then(|p| finish(p, frame_secs)));
                current = Some(Pending {
                    text: rest.to_string(),
                    start_frame: token.frame_index,
                    end_frame,
                });
            }
            None => match current.as_mut() {
                Some(pending) => {
                    pending.text.push_str(piece);
                    pending.end_frame = pending.end_frame.max(end_frame);
                }
                None => {
                    current = Some(Pending {
                        text: piece.to_string(),
                        start_frame: token.frame_index,
                        end_frame,
                    });
                }
            },
        }
    }

    words.extend(current.and_then(|p| finish(p, frame_secs)));

    Ok(words)
}

fn finish(pending: Pending, frame_secs: f64) -> Option<Word> {
    Word::checked(
        &pending.text,
        pending.start_frame as f64 * frame_secs,
        pending.end_frame as f64 * frame_secs,
    )
}
