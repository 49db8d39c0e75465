//! SentencePiece vocabulary shipped as `vocab.txt` next to the ONNX exports.

use crate::error::{ModelError, Result};
use std::path::Path;

/// Marker SentencePiece puts in front of word-initial pieces.
pub const WORD_MARKER: char = '\u{2581}';

const BLANK_PIECE: &str = "<blk>";

/// Token id to piece table.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    pieces: Vec<String>,
    blank_id: usize,
}

impl Vocabulary {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ModelError::LoadFailed(format!("cannot read vocabulary {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Parse `<piece> <id>` lines.
    ///
    /// The blank id is the id of `<blk>` when present, otherwise one past the
    /// largest id. Ids must be smaller than the number of entries.
    pub fn parse(text: &str) -> Result<Self> {
        let entries = text.lines().filter(|line| !line.trim().is_empty()).count();
        let mut pieces: Vec<String> = Vec::new();
        let mut blank_id = None;

        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let (piece, id) = line
                .rsplit_once(' ')
                .and_then(|(piece, id)| Some((piece, id.trim().parse::<usize>().ok()?)))
                .ok_or_else(|| {
                    ModelError::LoadFailed(format!("malformed vocabulary line {}: {line:?}", n + 1))
                })?;

            if id >= entries {
                return Err(ModelError::LoadFailed(format!(
                    "vocabulary id {id} on line {} exceeds {entries} entries",
                    n + 1
                ))
                .into());
            }
            if id >= pieces.len() {
                pieces.resize(id + 1, String::new());
            }
            pieces[id] = piece.to_string();

            if piece == BLANK_PIECE {
                blank_id = Some(id);
            }
        }

        if pieces.is_empty() {
            return Err(ModelError::LoadFailed("empty vocabulary".to_string()).into());
        }

        let blank_id = blank_id.unwrap_or(pieces.len());

        Ok(Self { pieces, blank_id })
    }

    pub fn blank_id(&self) -> usize {
        self.blank_id
    }

    pub fn piece(&self, id: usize) -> Option<&str> {
        self.pieces.get(id).map(String::as_str)
    }

    /// Control pieces such as `<unk>` or `<|nospeech|>` carry no text.
    pub fn is_control(piece: &str) -> bool {
        piece.is_empty() || (piece.starts_with('<') && piece.ends_with('>'))
    }
}
