//! melcap-asr: speech side of the caption pipeline.
//!
//! Extracts a 16 kHz mono track from a video with ffmpeg, transcribes it with
//! the Parakeet TDT ONNX model and produces per-word timings, optionally
//! pinned to a reference transcript.
//!
//! # Quick Start
//!
//! ```ignore
//! use melcap_asr::align::{Aligner, Transcript};
//! use melcap_asr::audio;
//! use melcap_asr::media::Muxer;
//! use melcap_asr::models::tdt::TdtModel;
//!
//! let muxer = Muxer::locate()?;
//! let extracted = audio::extract(&muxer, "talk.mp4".as_ref(), workdir)?;
//! let model = TdtModel::from_repo(&repo, Session::builder()?, Default::default())?;
//!
//! let mut aligner = Aligner::new(model, Some("en"))?;
//! let reference = Transcript::parse("Hello, world!")?;
//! let alignment = aligner.align_reference(&extracted.read()?, &reference)?;
//! ```

pub mod align;
pub mod audio;
pub mod chunk;
pub mod error;
pub mod features;
pub mod media;
pub mod models;
pub mod traits;
pub mod types;
pub mod word_json;
