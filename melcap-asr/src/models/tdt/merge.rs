//! Stitching token streams of overlapping windows.

use super::TokenDuration;

/// Concatenate per-window token streams whose frame indices are already absolute.
///
/// Tokens of a later window that start before the previous stream's last
/// token ended were already decoded from the overlap and are skipped.
pub fn merge_chunks<I>(chunks: I) -> Vec<TokenDuration>
where
    I: IntoIterator<Item = Vec<TokenDuration>>,
{
    chunks.into_iter().fold(Vec::new(), |mut merged, next| {
        let covered = merged.last().map_or(0, TokenDuration::end_frame);
        merged.extend(next.into_iter().filter(|t| t.frame_index >= covered));
        merged
    })
}
