//! Burning the subtitle document into the video with ffmpeg.

use melcap_asr::error::Result;
use melcap_asr::media::{Muxer, classify_filter_failure, escape_filter_path};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Extension used when the input has none.
const DEFAULT_EXTENSION: &str = "mp4";

#[derive(Clone, Debug, Default)]
pub struct BurnOptions {
    /// Extra font directory handed to libass.
    pub fonts_dir: Option<PathBuf>,
}

/// `subtitles` filter expression for the given document.
pub fn subtitles_filter(subtitles: &Path, options: &BurnOptions) -> String {
    let mut filter = format!("subtitles={}", escape_filter_path(subtitles));

    if let Some(dir) = &options.fonts_dir {
        filter.push_str(&format!(":fontsdir={}", escape_filter_path(dir)));
    }

    filter
}

/// Video encoder arguments chosen by the output extension.
pub fn video_codec_args(out: &Path) -> Vec<&'static str> {
    let extension = out
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "webm" => vec!["-c:v", "libvpx-vp9", "-b:v", "0", "-crf", "32"],
        ext => {
            let mut args = vec![
                "-c:v", "libx264", "-preset", "medium", "-crf", "18", "-pix_fmt", "yuv420p",
            ];
            if matches!(ext, "mp4" | "mov" | "m4v") {
                args.extend(["-movflags", "+faststart"]);
            }
            args
        }
    }
}

/// `<stem>_captioned.<ext>` next to the input.
pub fn default_output_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let extension = video
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    video.with_file_name(format!("{stem}_captioned.{extension}"))
}

fn burn_command(
    muxer: &Muxer,
    video: &Path,
    subtitles: &Path,
    out: &Path,
    options: &BurnOptions,
) -> Command {
    let mut cmd = muxer.ffmpeg();
    cmd.arg("-i")
        .arg(video)
        .arg("-vf")
        .arg(subtitles_filter(subtitles, options))
        .args(["-map", "0:v:0", "-map", "0:a?"])
        .args(video_codec_args(out))
        .args(["-c:a", "copy"])
        .arg(out);
    cmd
}

fn preview_command(
    muxer: &Muxer,
    video: &Path,
    subtitles: &Path,
    at_secs: f64,
    out_png: &Path,
    options: &BurnOptions,
) -> Command {
    // -copyts keeps source timestamps so the filter renders the events at `at_secs`
    let mut cmd = muxer.ffmpeg();
    cmd.arg("-ss")
        .arg(format!("{:.3}", at_secs.max(0.0)))
        .arg("-copyts")
        .arg("-i")
        .arg(video)
        .arg("-vf")
        .arg(subtitles_filter(subtitles, options))
        .args(["-frames:v", "1"])
        .arg(out_png);
    cmd
}

/// Re-encode `video` with `subtitles` burned in, copying audio through.
///
/// # Errors
///
/// - [`MediaError::FilterRejected`] when libass or the filter refuses the document
/// - [`MediaError::EncodeFailed`] for any other non-zero exit
///
/// [`MediaError::FilterRejected`]: melcap_asr::error::MediaError::FilterRejected
/// [`MediaError::EncodeFailed`]: melcap_asr::error::MediaError::EncodeFailed
pub fn burn(
    muxer: &Muxer,
    video: &Path,
    subtitles: &Path,
    out: &Path,
    options: &BurnOptions,
) -> Result<()> {
    tracing::info!(input = ?video.display(), output = ?out.display(), "burning subtitles");

    let mut cmd = burn_command(muxer, video, subtitles, out, options);

    muxer
        .run(&mut cmd)?
        .map_err(|failure| classify_filter_failure(failure).into())
}

/// Render the frame at `at_secs` with subtitles into a PNG.
pub fn preview(
    muxer: &Muxer,
    video: &Path,
    subtitles: &Path,
    at_secs: f64,
    out_png: &Path,
    options: &BurnOptions,
) -> Result<()> {
    tracing::info!(at_secs, output = ?out_png.display(), "rendering preview frame");

    let mut cmd = preview_command(muxer, video, subtitles, at_secs, out_png, options);

    muxer
        .run(&mut cmd)?
        .map_err(|failure| classify_filter_failure(failure).into())
}
