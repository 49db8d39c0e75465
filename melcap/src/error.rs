//! Caption-side errors and the process exit code policy.

use color_eyre::Section;
use eyre::Report;
use melcap_asr::error::{AlignmentError, Error as AsrError, InputError, MediaError, ModelError};
use std::error::Error as StdError;
use std::process::ExitCode;
use thiserror::Error;

/// Errors raised while laying out and styling captions.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("font family {family:?} cannot be resolved to any installed face")]
    FontUnavailable { family: String },

    #[error("unknown caption style {name:?} (expected one of: {expected})")]
    StyleUnknown { name: String, expected: String },
}

/// A run stopped at a stage boundary on request.
#[derive(Debug, Error)]
#[error("run cancelled")]
pub struct Cancelled;

pub const EXIT_GENERIC: u8 = 1;
pub const EXIT_INPUT: u8 = 2;
pub const EXIT_ALIGNMENT: u8 = 3;
pub const EXIT_MUXER: u8 = 4;

/// Exit code for a failed run, from the first typed error in the report chain.
pub fn exit_code(report: &Report) -> u8 {
    report.chain().find_map(classify).unwrap_or(EXIT_GENERIC)
}

pub fn exit_status(report: &Report) -> ExitCode {
    ExitCode::from(exit_code(report))
}

fn classify(cause: &(dyn StdError + 'static)) -> Option<u8> {
    if let Some(err) = cause.downcast_ref::<AsrError>() {
        return Some(match err {
            AsrError::Input(_) => EXIT_INPUT,
            AsrError::Alignment(_) => EXIT_ALIGNMENT,
            AsrError::Media(media) => media_code(media),
            AsrError::Config(_) | AsrError::Model(_) | AsrError::Output(_) => EXIT_GENERIC,
        });
    }
    if cause.downcast_ref::<InputError>().is_some() {
        return Some(EXIT_INPUT);
    }
    if cause.downcast_ref::<AlignmentError>().is_some() {
        return Some(EXIT_ALIGNMENT);
    }
    if let Some(media) = cause.downcast_ref::<MediaError>() {
        return Some(media_code(media));
    }
    None
}

fn media_code(err: &MediaError) -> u8 {
    match err {
        MediaError::MuxerNotFound { .. }
        | MediaError::FilterRejected { .. }
        | MediaError::EncodeFailed { .. }
        | MediaError::Spawn { .. } => EXIT_MUXER,
        MediaError::Probe(_) => EXIT_GENERIC,
    }
}

/// Attach a remediation hint for resource errors the user can fix.
pub fn with_hint(report: Report) -> Report {
    let hint = report.chain().find_map(|cause| {
        match cause.downcast_ref::<AsrError>() {
            Some(AsrError::Media(MediaError::MuxerNotFound { .. })) => {
                Some("install ffmpeg (with libass) and make sure it is on PATH")
            }
            Some(AsrError::Model(ModelError::LanguageUnsupported(_))) => Some(
                "pass --reference-text to time the transcript by speech energy, or --words with timings from another aligner",
            ),
            Some(AsrError::Model(ModelError::LoadFailed(_))) => {
                Some("check --model-id, or pre-download the model and use --model-source path")
            }
            Some(AsrError::Media(MediaError::FilterRejected { .. })) => {
                Some("make sure ffmpeg was built with --enable-libass")
            }
            _ => match cause.downcast_ref::<RenderError>() {
                Some(RenderError::FontUnavailable { .. }) => {
                    Some("install the font, point --fonts-dir at it, or omit --font")
                }
                _ => None,
            },
        }
    });

    match hint {
        Some(hint) => report.suggestion(hint),
        None => report,
    }
}
