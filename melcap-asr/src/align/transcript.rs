//! Reference transcripts supplied alongside a video.

use crate::error::{InputError, Result};
use std::path::Path;

/// Whitespace-tokenised reference text.
///
/// Punctuation stays attached to its token and hyphenated forms are one token.
#[derive(Clone, Debug, PartialEq)]
pub struct Transcript {
    tokens: Vec<String>,
}

impl Transcript {
    /// Tokenise `text`, failing with [`InputError::EmptyTranscript`] if nothing remains.
    pub fn parse(text: &str) -> Result<Self> {
        let tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();

        if tokens.is_empty() {
            return Err(InputError::EmptyTranscript.into());
        }

        Ok(Self { tokens })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| InputError::Unreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::parse(&text)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The transcript with whitespace collapsed to single spaces.
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}
