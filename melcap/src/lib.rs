//! melcap: word-synchronised, styled captions burned into videos.
//!
//! Timed words from [`melcap_asr`] are grouped into on-screen phrases,
//! rendered as an ASS subtitle document in one of several styles and burned
//! into the video with ffmpeg.
//!
//! # Quick Start
//!
//! ```ignore
//! use melcap::context::RenderContext;
//! use melcap::layout::LayoutOracle;
//! use melcap::segment::segment;
//! use melcap::style::StyleProfile;
//! use melcap::subtitle::emit;
//!
//! let ctx = RenderContext::new(1080, 1920).with_language(Some("en"));
//! let oracle = LayoutOracle::new(&[]);
//!
//! let phrases = segment(&words, &ctx, &oracle);
//! let doc = emit(&phrases, StyleProfile::Cinematic, &ctx, &oracle)?;
//! doc.write("captions.ass".as_ref())?;
//! ```

pub mod ass;
pub mod burn;
pub mod burner;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod preview;
pub mod segment;
pub mod srt;
pub mod style;
pub mod subtitle;
