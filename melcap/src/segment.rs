//! Groups timed words into caption phrases of at most two lines.

use crate::context::RenderContext;
use crate::layout::TextMeasure;
use melcap_asr::types::Word;
use std::ops::Range;
use tracing::debug;

/// Words rendered together as one caption, wrapped onto one or two lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Phrase {
    words: Vec<Word>,
    /// Index of the first word on the second line
    line_break: Option<usize>,
}

impl Phrase {
    /// Single-line phrase; `None` when `words` is empty.
    pub fn new(words: Vec<Word>) -> Option<Self> {
        (!words.is_empty()).then_some(Self {
            words,
            line_break: None,
        })
    }

    /// Two-line phrase broken before `words[line_break]`.
    pub fn wrapped(words: Vec<Word>, line_break: usize) -> Option<Self> {
        (line_break > 0 && line_break < words.len()).then_some(Self {
            words,
            line_break: Some(line_break),
        })
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn start(&self) -> f64 {
        self.words.first().map_or(0.0, |w| w.start)
    }

    pub fn end(&self) -> f64 {
        self.words.last().map_or(0.0, |w| w.end)
    }

    pub fn line_break(&self) -> Option<usize> {
        self.line_break
    }

    /// The words of each line, in order.
    pub fn lines(&self) -> Vec<&[Word]> {
        match self.line_break {
            Some(at) => {
                let (first, second) = self.words.split_at(at);
                vec![first, second]
            }
            None => vec![&self.words[..]],
        }
    }

    /// Line index and position within that line of word `index`.
    pub fn locate(&self, index: usize) -> (usize, usize) {
        match self.line_break {
            Some(at) if index >= at => (1, index - at),
            _ => (0, index),
        }
    }

    /// Plain text of each line.
    pub fn line_texts(&self) -> Vec<String> {
        self.lines().into_iter().map(join_words).collect()
    }
}

pub(crate) fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Phrase segmentation under a render context.
pub struct Segmenter<'a> {
    ctx: &'a RenderContext,
    measure: &'a dyn TextMeasure,
}

impl<'a> Segmenter<'a> {
    pub fn new(ctx: &'a RenderContext, measure: &'a dyn TextMeasure) -> Self {
        Self { ctx, measure }
    }

    /// Split `words` into phrases.
    ///
    /// A silence of at least `max_gap_s` or a full word budget closes a
    /// phrase. Phrases too wide for one line are broken at the middle word;
    /// phrases too wide for two lines are segmented again with half the
    /// budget.
    pub fn segment(&self, words: &[Word]) -> Vec<Phrase> {
        let mut phrases = Vec::new();

        for range in group(words, self.ctx.words_per_phrase, self.ctx.max_gap_s) {
            self.wrap(&words[range], self.ctx.words_per_phrase, &mut phrases);
        }

        debug!(
            words = words.len(),
            phrases = phrases.len(),
            "segmented words into phrases"
        );

        phrases
    }

    fn fits(&self, words: &[Word]) -> bool {
        let width = self.measure.measure(
            &join_words(words),
            &self.ctx.font_family,
            self.ctx.font_size as f32,
        );
        width <= self.ctx.line_budget_px()
    }

    fn wrap(&self, words: &[Word], budget: usize, out: &mut Vec<Phrase>) {
        let n = words.len();
        let mid = n.div_ceil(2);

        if self.fits(words) {
            out.extend(Phrase::new(words.to_vec()));
            return;
        }

        if n >= 2 && self.fits(&words[..mid]) && self.fits(&words[mid..]) {
            out.extend(Phrase::wrapped(words.to_vec(), mid));
            return;
        }

        let smaller = (budget.min(n) / 2).max(2);
        let groups = if n > 2 {
            group(words, smaller, self.ctx.max_gap_s)
        } else {
            Vec::new()
        };

        // overlapping words cannot be separated; accept the overflow
        if groups.len() < 2 {
            debug!(
                words = n,
                text = %join_words(words),
                "phrase overflows two lines; keeping it"
            );
            out.extend(Phrase::wrapped(words.to_vec(), mid).or_else(|| Phrase::new(words.to_vec())));
            return;
        }

        for range in groups {
            self.wrap(&words[range], smaller, out);
        }
    }
}

/// Convenience wrapper around [`Segmenter::segment`].
pub fn segment(words: &[Word], ctx: &RenderContext, measure: &dyn TextMeasure) -> Vec<Phrase> {
    Segmenter::new(ctx, measure).segment(words)
}

/// Index ranges of consecutive words forming phrases.
///
/// A break is never placed before a word that starts while the previous
/// word is still running, so consecutive phrases never overlap.
fn group(words: &[Word], budget: usize, max_gap: f64) -> Vec<Range<usize>> {
    let budget = budget.max(1);
    let mut groups = Vec::new();
    let mut start = 0;

    for (i, pair) in words.windows(2).enumerate() {
        let (prev, word) = (&pair[0], &pair[1]);
        let next = i + 1;

        if word.start < prev.end {
            continue;
        }

        let silence = word.start - prev.end >= max_gap;
        let full = next - start >= budget;

        if silence || full {
            groups.push(start..next);
            start = next;
        }
    }

    if start < words.len() {
        groups.push(start..words.len());
    }

    groups
}
