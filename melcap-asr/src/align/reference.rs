//! Global alignment of a reference transcript against recognised words.
//!
//! The reference wording always wins; the recognised words only contribute
//! timings. Tokens the recogniser heard as a different word are kept when the
//! two are close enough or when exact matches pin the slot on both sides.
//! Tokens that were fused or split by the recogniser are recovered by
//! distributing the shared interval proportionally to character count.

use crate::types::Word;

/// Minimum similarity for a substituted token to inherit the recognised timing.
pub const MIN_SIMILARITY: f32 = 0.5;

/// Result of aligning reference tokens to recognised words.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenAlignment {
    /// Reference tokens with timings, in reference order.
    pub words: Vec<Word>,
    /// Reference tokens that could not be timed.
    pub dropped: Vec<String>,
    /// Number of reference tokens that took part in alignment.
    pub total: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Match(usize, usize),
    Sub(usize, usize),
    /// Reference token with no recognised counterpart.
    Gap(usize),
    /// Recognised word with no reference counterpart.
    Extra(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Span {
    start: f64,
    end: f64,
}

/// Lowercased alphanumeric content of a token.
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Character-level similarity in `[0, 1]`, 1 meaning identical.
pub fn similarity(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());

    if longest == 0 {
        return 1.0;
    }

    1.0 - levenshtein(&a, &b) as f32 / longest as f32
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = (diag + usize::from(ca != cb)).min(above + 1).min(row[j] + 1);
            diag = above;
        }
    }

    row[b.len()]
}

/// Align `reference` tokens to `hypothesis` words.
///
/// Tokens without alphanumeric content (a lone dash, an ampersand) carry no
/// acoustic evidence; they are attached to the preceding token's text, or to
/// the following one when they lead the transcript.
pub fn align_tokens(reference: &[String], hypothesis: &[Word]) -> TokenAlignment {
    let tokens = attach_bare_punctuation(reference);
    if tokens.is_empty() {
        return TokenAlignment::default();
    }

    let ref_keys: Vec<String> = tokens.iter().map(|t| normalize_token(t)).collect();
    let hyp_keys: Vec<String> = hypothesis.iter().map(|w| normalize_token(&w.text)).collect();

    let ops = edit_script(&ref_keys, &hyp_keys);
    let spans = resolve(&ops, &ref_keys, &hyp_keys, hypothesis);

    let mut words = Vec::with_capacity(tokens.len());
    let mut dropped = Vec::new();

    for (token, span) in tokens.iter().zip(spans) {
        match span.and_then(|s| Word::checked(token, s.start, s.end)) {
            Some(word) => words.push(word),
            None => dropped.push(token.clone()),
        }
    }

    TokenAlignment {
        words,
        dropped,
        total: tokens.len(),
    }
}

pub(crate) fn attach_bare_punctuation(reference: &[String]) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::with_capacity(reference.len());
    let mut leading = String::new();

    for token in reference {
        if !normalize_token(token).is_empty() {
            let mut owned = std::mem::take(&mut leading);
            if !owned.is_empty() {
                owned.push(' ');
            }
            owned.push_str(token);
            tokens.push(owned);
            continue;
        }

        match tokens.last_mut() {
            Some(prev) => {
                prev.push(' ');
                prev.push_str(token);
            }
            None => {
                if !leading.is_empty() {
                    leading.push(' ');
                }
                leading.push_str(token);
            }
        }
    }

    tokens
}

/// Half-width of the diagonal band searched for the edit script.
pub const BAND_RADIUS: usize = 400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Diag,
    Up,
    Left,
}

/// Columns of row `i` inside the band, inclusive.
fn band(i: usize, n: usize, m: usize, radius: usize) -> (usize, usize) {
    let center = if n == 0 { m } else { i * m / n };
    (center.saturating_sub(radius), (center + radius).min(m))
}

/// Minimum-cost edit script turning `reference` into `hypothesis`.
///
/// Matches cost nothing; substitutions and gaps cost one. Ties prefer the
/// diagonal, then reference gaps, so the script is deterministic.
///
/// Only cells within [`BAND_RADIUS`] of the scaled diagonal are filled, and
/// only one traceback step is kept per cell, so memory grows with the
/// transcript length rather than its square. The radius widens when one side
/// is much longer than the other so the band stays connected.
fn edit_script(reference: &[String], hypothesis: &[String]) -> Vec<Op> {
    let (n, m) = (reference.len(), hypothesis.len());
    let radius = BAND_RADIUS.max(m.div_ceil(n.max(1)));

    let at = |row: &[u32], lo: usize, j: usize| {
        j.checked_sub(lo)
            .and_then(|k| row.get(k))
            .copied()
            .unwrap_or(u32::MAX)
    };

    let mut steps: Vec<Step> = Vec::new();
    let mut rows: Vec<(usize, usize)> = Vec::with_capacity(n + 1);
    let mut prev: Vec<u32> = Vec::new();
    let mut prev_lo = 0;

    for i in 0..=n {
        let (lo, hi) = band(i, n, m, radius);
        rows.push((lo, steps.len()));

        let mut row: Vec<u32> = Vec::with_capacity(hi - lo + 1);
        for j in lo..=hi {
            let (cost, step) = if i == 0 {
                (j as u32, Step::Left)
            } else if j == 0 {
                (i as u32, Step::Up)
            } else {
                let sub = u32::from(reference[i - 1] != hypothesis[j - 1]);
                let diag = at(&prev[..], prev_lo, j - 1).saturating_add(sub);
                let up = at(&prev[..], prev_lo, j).saturating_add(1);
                let left = at(&row[..], lo, j - 1).saturating_add(1);
                let best = diag.min(up).min(left);

                let step = if diag == best {
                    Step::Diag
                } else if up == best {
                    Step::Up
                } else {
                    Step::Left
                };
                (best, step)
            };

            row.push(cost);
            steps.push(step);
        }

        prev = row;
        prev_lo = lo;
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);

    while i > 0 || j > 0 {
        let (lo, offset) = rows[i];

        match steps[offset + j - lo] {
            Step::Diag => {
                ops.push(if reference[i - 1] == hypothesis[j - 1] {
                    Op::Match(i - 1, j - 1)
                } else {
                    Op::Sub(i - 1, j - 1)
                });
                i -= 1;
                j -= 1;
            }
            Step::Up => {
                ops.push(Op::Gap(i - 1));
                i -= 1;
            }
            Step::Left => {
                ops.push(Op::Extra(j - 1));
                j -= 1;
            }
        }
    }

    ops.reverse();
    ops
}

fn resolve(
    ops: &[Op],
    ref_keys: &[String],
    hyp_keys: &[String],
    hypothesis: &[Word],
) -> Vec<Option<Span>> {
    let mut spans: Vec<Option<Span>> = vec![None; ref_keys.len()];
    let span_of = |j: usize| Span {
        start: hypothesis[j].start,
        end: hypothesis[j].end,
    };

    for (k, op) in ops.iter().enumerate() {
        match *op {
            Op::Match(i, j) => spans[i] = Some(span_of(j)),
            Op::Sub(i, j) => {
                if let Some((lo, hi)) = fused_group(ops, k, ref_keys, &hyp_keys[j]) {
                    split_proportionally(&mut spans, ref_keys, lo, hi, span_of(j));
                } else if let Some(span) = split_word(ops, k, i, ref_keys, hyp_keys, hypothesis)
                {
                    spans[i] = Some(span);
                } else if similarity(&ref_keys[i], &hyp_keys[j]) >= MIN_SIMILARITY
                    || pinned(ops, k)
                {
                    spans[i] = Some(span_of(j));
                }
            }
            Op::Gap(_) | Op::Extra(_) => {}
        }
    }

    spans
}

/// Reference tokens around a substitution that the recogniser fused into one word.
fn fused_group(ops: &[Op], k: usize, ref_keys: &[String], hyp_key: &str) -> Option<(usize, usize)> {
    let Op::Sub(i, _) = ops[k] else {
        return None;
    };

    let gap_at = |idx: Option<usize>| match idx.and_then(|idx| ops.get(idx)) {
        Some(Op::Gap(r)) => Some(*r),
        _ => None,
    };

    let mut before = Vec::new();
    for back in 1..=2 {
        match gap_at(k.checked_sub(back)) {
            Some(r) => before.push(r),
            None => break,
        }
    }
    let mut after = Vec::new();
    for ahead in 1..=2 {
        match gap_at(Some(k + ahead)) {
            Some(r) => after.push(r),
            None => break,
        }
    }

    let lo_min = before.last().copied().unwrap_or(i);
    let hi_max = after.last().copied().unwrap_or(i);

    // smallest groups first
    let mut candidates: Vec<(usize, usize)> = (lo_min..=i)
        .flat_map(|lo| (i..=hi_max).map(move |hi| (lo, hi)))
        .filter(|&(lo, hi)| hi > lo)
        .collect();
    candidates.sort_by_key(|&(lo, hi)| hi - lo);

    candidates.into_iter().find(|&(lo, hi)| {
        let joined: String = ref_keys[lo..=hi].concat();
        joined == hyp_key
    })
}

/// A reference token the recogniser split across this and a neighbouring extra word.
fn split_word(
    ops: &[Op],
    k: usize,
    i: usize,
    ref_keys: &[String],
    hyp_keys: &[String],
    hypothesis: &[Word],
) -> Option<Span> {
    let Op::Sub(_, j) = ops[k] else {
        return None;
    };

    if let Some(Op::Extra(next)) = ops.get(k + 1)
        && format!("{}{}", hyp_keys[j], hyp_keys[*next]) == ref_keys[i]
    {
        return Some(Span {
            start: hypothesis[j].start,
            end: hypothesis[*next].end,
        });
    }

    if let Some(Op::Extra(prev)) = k.checked_sub(1).and_then(|p| ops.get(p))
        && format!("{}{}", hyp_keys[*prev], hyp_keys[j]) == ref_keys[i]
    {
        return Some(Span {
            start: hypothesis[*prev].start,
            end: hypothesis[j].end,
        });
    }

    None
}

/// Both neighbours of the operation are exact matches or transcript boundaries.
fn pinned(ops: &[Op], k: usize) -> bool {
    let anchored = |op: Option<&Op>| matches!(op, None | Some(Op::Match(..)));

    anchored(k.checked_sub(1).and_then(|p| ops.get(p))) && anchored(ops.get(k + 1))
}

fn split_proportionally(
    spans: &mut [Option<Span>],
    ref_keys: &[String],
    lo: usize,
    hi: usize,
    whole: Span,
) {
    let total: usize = ref_keys[lo..=hi].iter().map(|k| k.chars().count()).sum();
    let length = whole.end - whole.start;
    let mut consumed = 0;

    for i in lo..=hi {
        let start = whole.start + length * consumed as f64 / total as f64;
        consumed += ref_keys[i].chars().count();
        let end = whole.start + length * consumed as f64 / total as f64;
        spans[i] = Some(Span { start, end });
    }
}
