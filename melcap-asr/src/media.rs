//! Wrappers around the ffmpeg and ffprobe binaries.
//!
//! Every invocation of the external muxer goes through [`Muxer`] so binary
//! lookup, diagnostic capture and filter-graph path escaping live in one place.

use crate::error::{InputError, MediaError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Maximum amount of muxer diagnostics carried in errors.
pub const STDERR_TAIL_BYTES: usize = 2048;

/// Located ffmpeg and ffprobe executables.
#[derive(Clone, Debug)]
pub struct Muxer {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

/// Stream layout of an input file as reported by ffprobe.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_audio: bool,
    pub format_name: String,
}

/// A muxer run that exited unsuccessfully.
#[derive(Debug)]
pub struct MuxerFailure {
    pub status: ExitStatus,
    /// Last [`STDERR_TAIL_BYTES`] of the diagnostic output
    pub stderr: String,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
}

impl Muxer {
    /// Find ffmpeg and ffprobe on `PATH`.
    pub fn locate() -> Result<Self> {
        let find = |name: &str| {
            which::which(name).map_err(|_| MediaError::MuxerNotFound {
                name: name.to_string(),
            })
        };

        let muxer = Self {
            ffmpeg: find("ffmpeg")?,
            ffprobe: find("ffprobe")?,
        };

        tracing::debug!(ffmpeg = ?muxer.ffmpeg.display(), ffprobe = ?muxer.ffprobe.display(), "located muxer");

        Ok(muxer)
    }

    pub fn from_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// An ffmpeg command with overwrite enabled and the banner and stdin disabled.
    pub fn ffmpeg(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-hide_banner", "-nostdin"]);
        cmd
    }

    /// Run a prepared muxer command, capturing its diagnostics.
    ///
    /// The outer result carries spawn failures; the inner one a non-zero exit.
    pub fn run(&self, cmd: &mut Command) -> Result<std::result::Result<(), MuxerFailure>> {
        tracing::debug!(?cmd, "running muxer");

        let output = cmd.output().map_err(|source| MediaError::Spawn {
            name: cmd.get_program().to_string_lossy().into_owned(),
            source,
        })?;

        if output.status.success() {
            return Ok(Ok(()));
        }

        Ok(Err(MuxerFailure {
            status: output.status,
            stderr: stderr_tail(&output.stderr, STDERR_TAIL_BYTES),
        }))
    }

    /// Inspect the streams of a media file.
    ///
    /// Fails with [`InputError::Unreadable`] when ffprobe cannot open the file.
    pub fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "stream=codec_type,width,height:format=format_name",
            "-of",
            "json",
        ])
        .arg(path);

        tracing::debug!(?cmd, "probing media");

        let output = cmd.output().map_err(|source| MediaError::Spawn {
            name: "ffprobe".to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(InputError::Unreadable {
                path: path.to_path_buf(),
                detail: stderr_tail(&output.stderr, STDERR_TAIL_BYTES),
            }
            .into());
        }

        parse_probe(&output.stdout)
    }
}

fn parse_probe(stdout: &[u8]) -> Result<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::Probe(format!("invalid json: {e}")))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    Ok(MediaInfo {
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        has_audio: probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
        format_name: probe
            .format
            .and_then(|f| f.format_name)
            .unwrap_or_default(),
    })
}

/// Map a failed subtitle-filter run to the matching muxer error.
pub fn classify_filter_failure(failure: MuxerFailure) -> MediaError {
    const FILTER_MARKERS: &[&str] = &[
        "Unable to open",
        "Error initializing filter",
        "Error parsing",
        "No such filter",
        "libass",
        "Parsed_subtitles",
    ];

    if FILTER_MARKERS.iter().any(|m| failure.stderr.contains(m)) {
        MediaError::FilterRejected {
            stderr: failure.stderr,
        }
    } else {
        MediaError::EncodeFailed {
            status: failure.status.to_string(),
            stderr: failure.stderr,
        }
    }
}

/// Quoted filter-graph argument naming `path`.
///
/// The path is made absolute first. This is the only place filter-graph
/// escaping happens; burn and preview both call it.
pub fn escape_filter_path(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    quote_filter_arg(&escape_filter_value(&absolute.to_string_lossy()))
}

/// Escape an option value for the filter's own option parser.
///
/// Backslashes become forward slashes; colons and single quotes get a
/// backslash.
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => out.push('/'),
            ':' => out.push_str("\\:"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out
}

/// Single-quote an escaped value for the filter-graph parser.
///
/// Quotes cannot be escaped inside a quoted run, so each one closes the run,
/// is emitted as `\'` and reopens it.
pub fn quote_filter_arg(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Keep the last `limit` bytes of diagnostic output, cut on a character boundary.
pub fn stderr_tail(bytes: &[u8], limit: usize) -> String {
    let mut start = bytes.len().saturating_sub(limit);
    while start < bytes.len() && (bytes[start] & 0b1100_0000) == 0b1000_0000 {
        start += 1;
    }
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}
