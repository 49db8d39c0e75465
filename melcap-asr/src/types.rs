//! Core types for melcap-asr

use eyre::{Result, WrapErr};
use hf_hub::CacheRepo;
use hf_hub::api::sync::ApiRepo;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A spoken word with its time span in seconds.
///
/// Words handed out by this crate always satisfy `end > start >= 0` and carry
/// non-empty text with whitespace collapsed to single spaces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Build a word from raw parts, rejecting empty text and empty spans.
    pub fn checked(text: &str, start: f64, end: f64) -> Option<Self> {
        let text = collapse_whitespace(text);
        let start = start.max(0.0);
        (!text.is_empty() && start.is_finite() && end.is_finite() && end > start)
            .then(|| Self::new(text, start, end))
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Collapse runs of whitespace to a single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Model repository sources.
#[derive(Debug)]
pub enum ModelRepo {
    /// Local filesystem path
    Path(PathBuf),
    /// HuggingFace cache repository
    Cache(CacheRepo),
    /// HuggingFace API repository
    Api(ApiRepo),
}

impl ModelRepo {
    /// Resolve a file name to its full path in this repository.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        match self {
            ModelRepo::Path(path) => path
                .join(file_name)
                .canonicalize()
                .wrap_err_with(|| format!("failed to resolve model file: {file_name}")),
            ModelRepo::Cache(cache_repo) => cache_repo
                .get(file_name)
                .ok_or_else(|| eyre::eyre!("model file not in cache: {file_name}")),
            ModelRepo::Api(api_repo) => api_repo
                .get(file_name)
                .wrap_err_with(|| format!("failed to download model file: {file_name}")),
        }
    }

    /// Try resolving multiple file names, return first successful match.
    pub fn resolve_any(&self, candidates: &[&str]) -> Result<PathBuf> {
        candidates
            .iter()
            .find_map(|name| self.resolve(name).ok())
            .ok_or_else(|| eyre::eyre!("none of {candidates:?} found in model repository"))
    }
}
