//! ASS (Advanced SubStation Alpha) subtitle generation.
//!
//! Every phrase becomes one base event on layer 0 showing the wrapped
//! phrase, plus one highlight event per word on layer 1. A highlight event
//! renders the whole phrase again with every other word fully transparent,
//! so the active word is laid out exactly like its base-layer twin and the
//! line never reflows while words light up.

use crate::context::{FontChoice, RenderContext};
use crate::error::RenderError;
use crate::layout::{FontLookup, TextMeasure};
use crate::segment::{Phrase, join_words};
use crate::style::{Colour, Effect, Motion, Recipe, StyleProfile};
use melcap_asr::types::Word;
use std::fmt::{self, Write as _};
use std::path::Path;
use tracing::debug;

/// Vertical gap between the two lines of a phrase.
pub const LINE_GAP_PX: u32 = 14;

/// Highlights shorter than this are stretched to stay visible.
pub const MIN_VISIBLE_CS: u32 = 8;

/// Upper bound of a stretched highlight, from the word start.
pub const STRETCHED_CS: u32 = 12;

const SIDE_MARGIN: u32 = 80;
const TRANSPARENT: &str = "\\alpha&HFF&";
const OPAQUE: &str = "\\alpha&H00&";

/// Round seconds to whole centiseconds, the resolution of ASS timestamps.
///
/// Rounds through milliseconds so values like `1.235` land on `124`
/// despite binary representation error. Negative input clamps to zero.
pub fn centiseconds(secs: f64) -> u32 {
    let ms = (secs.max(0.0) * 1000.0).round() as u64;
    ((ms + 5) / 10).min(u64::from(u32::MAX)) as u32
}

/// Format centiseconds as `H:MM:SS.cc`.
pub fn format_cs(cs: u32) -> String {
    let hours = cs / 360_000;
    let minutes = cs / 6_000 % 60;
    let seconds = cs / 100 % 60;
    format!("{hours}:{minutes:02}:{seconds:02}.{:02}", cs % 100)
}

/// Format seconds as an ASS timestamp.
pub fn format_ass_time(secs: f64) -> String {
    format_cs(centiseconds(secs))
}

/// Escape characters that ASS would read as override syntax.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            _ => out.push(c),
        }
    }
    out
}

/// Compact decimal for override tags: at most two decimals, no trailing zeros.
fn num(value: f64) -> String {
    format!("{}", (value * 100.0).round() / 100.0 + 0.0)
}

/// Event role, in drawing order at equal start time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Base,
    Backdrop,
    Highlight,
}

/// One `Dialogue` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub layer: u32,
    pub start_cs: u32,
    pub end_cs: u32,
    pub style: &'static str,
    pub text: String,
    /// Index of the phrase the event belongs to
    pub phrase: usize,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dialogue: {},{},{},{},,0,0,0,,{}",
            self.layer,
            format_cs(self.start_cs),
            format_cs(self.end_cs),
            self.style,
            self.text
        )
    }
}

/// `[Script Info]` fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptInfo {
    pub play_res_x: u32,
    pub play_res_y: u32,
}

/// One `Style:` line of the `[V4+ Styles]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleLine {
    pub name: &'static str,
    pub font_name: String,
    pub font_size: u32,
    pub primary: Colour,
    pub secondary: Colour,
    pub outline_colour: Colour,
    pub back: Colour,
    pub outline: u32,
    pub shadow: u32,
    pub margin_lr: u32,
    pub margin_v: u32,
}

impl fmt::Display for StyleLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Style: {name},{font},{size},{primary},{secondary},{outline_colour},{back},-1,0,0,0,100,100,0,0,1,{outline},{shadow},2,{ml},{mr},{mv},1",
            name = self.name,
            font = self.font_name,
            size = self.font_size,
            primary = self.primary,
            secondary = self.secondary,
            outline_colour = self.outline_colour,
            back = self.back,
            outline = self.outline,
            shadow = self.shadow,
            ml = self.margin_lr,
            mr = self.margin_lr,
            mv = self.margin_v,
        )
    }
}

/// A complete subtitle document. Rendered with `Display`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtitleDoc {
    info: ScriptInfo,
    styles: Vec<StyleLine>,
    events: Vec<Event>,
}

impl SubtitleDoc {
    pub fn info(&self) -> ScriptInfo {
        self.info
    }

    pub fn styles(&self) -> &[StyleLine] {
        &self.styles
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_string())
    }
}

impl fmt::Display for SubtitleDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Script Info]")?;
        writeln!(f, "; Script generated by melcap")?;
        writeln!(f, "ScriptType: v4.00+")?;
        writeln!(f, "PlayResX: {}", self.info.play_res_x)?;
        writeln!(f, "PlayResY: {}", self.info.play_res_y)?;
        writeln!(f, "WrapStyle: 2")?;
        writeln!(f, "ScaledBorderAndShadow: yes")?;
        writeln!(f)?;

        writeln!(f, "[V4+ Styles]")?;
        writeln!(
            f,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
        )?;
        for style in &self.styles {
            writeln!(f, "{style}")?;
        }
        writeln!(f)?;

        writeln!(f, "[Events]")?;
        writeln!(
            f,
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
        )?;
        for event in &self.events {
            writeln!(f, "{event}")?;
        }

        Ok(())
    }
}

/// Motion shared by all layers of a phrase, resumable at an offset.
struct Envelope {
    x: f64,
    y: f64,
    motion: Motion,
}

impl Envelope {
    /// Position tags for an event starting `offset` ms into the phrase.
    fn position(&self, offset: u32) -> String {
        match self.motion {
            Motion::Rise { px, ms, .. } if offset < ms => {
                let progress = f64::from(offset) / f64::from(ms);
                let y_from = self.y + f64::from(px) * (1.0 - progress);
                format!(
                    "\\an2\\move({x},{y_from},{x},{y},0,{rest})",
                    x = num(self.x),
                    y_from = num(y_from),
                    y = num(self.y),
                    rest = ms - offset,
                )
            }
            _ => format!("\\an2\\pos({},{})", num(self.x), num(self.y)),
        }
    }

    /// Scale in percent `offset` ms into the phrase, if the motion scales.
    fn scale_at(&self, offset: u32) -> Option<f64> {
        match self.motion {
            Motion::Rise {
                ms,
                scale_to: Some(to),
                ..
            } => {
                let progress = f64::from(offset.min(ms)) / f64::from(ms);
                Some(100.0 + (f64::from(to) - 100.0) * progress)
            }
            _ => None,
        }
    }

    /// Scale tags continuing the envelope from `offset`; empty without scaling.
    fn scale_tags(&self, offset: u32) -> String {
        match self.motion {
            Motion::Rise {
                ms,
                scale_to: Some(to),
                ..
            } if offset < ms => {
                let now = num(self.scale_at(offset).unwrap_or(100.0));
                format!(
                    "\\fscx{now}\\fscy{now}\\t(0,{rest},\\fscx{to}\\fscy{to})",
                    rest = ms - offset
                )
            }
            Motion::Rise {
                scale_to: Some(to),
                ..
            } => format!("\\fscx{to}\\fscy{to}"),
            _ => String::new(),
        }
    }
}

/// Builds a [`SubtitleDoc`] from phrases for one style and render context.
pub struct Emitter<'a> {
    ctx: &'a RenderContext,
    measure: &'a dyn TextMeasure,
    recipe: Recipe,
    envelope: Envelope,
}

impl<'a> Emitter<'a> {
    /// Fails with [`RenderError::FontUnavailable`] when an explicitly
    /// requested family is absent from a populated font database.
    pub fn new(
        style: StyleProfile,
        ctx: &'a RenderContext,
        measure: &'a dyn TextMeasure,
    ) -> Result<Self, RenderError> {
        if ctx.font_choice == FontChoice::Explicit
            && measure.lookup(&ctx.font_family) == FontLookup::Missing
        {
            return Err(RenderError::FontUnavailable {
                family: ctx.font_family.clone(),
            });
        }

        let recipe = style.recipe();
        let (x, y) = ctx.anchor();

        Ok(Self {
            ctx,
            measure,
            recipe,
            envelope: Envelope {
                x: f64::from(x),
                y: f64::from(y),
                motion: recipe.motion,
            },
        })
    }

    pub fn emit(&self, phrases: &[Phrase]) -> SubtitleDoc {
        let mut events = Vec::new();

        for (index, phrase) in phrases.iter().enumerate() {
            self.emit_phrase(index, phrase, &mut events);
        }

        // stable: base, then backdrop, then highlight at equal start
        events.sort_by_key(|e| (e.start_cs, e.kind));

        debug!(
            phrases = phrases.len(),
            events = events.len(),
            "emitted subtitle events"
        );

        SubtitleDoc {
            info: ScriptInfo {
                play_res_x: self.ctx.video_w,
                play_res_y: self.ctx.video_h,
            },
            styles: self.styles(),
            events,
        }
    }

    fn styles(&self) -> Vec<StyleLine> {
        let base = StyleLine {
            name: "Base",
            font_name: self.ctx.font_family.clone(),
            font_size: self.ctx.font_size,
            primary: Colour::WHITE,
            secondary: Colour::WHITE,
            outline_colour: Colour::BLACK,
            back: self.recipe.back_colour,
            outline: self.recipe.outline,
            shadow: self.recipe.shadow,
            margin_lr: SIDE_MARGIN,
            margin_v: self.ctx.bottom_margin,
        };
        let highlight = StyleLine {
            name: "Highlight",
            primary: self.recipe.emphasis,
            ..base.clone()
        };

        vec![base, highlight]
    }

    fn emit_phrase(&self, index: usize, phrase: &Phrase, events: &mut Vec<Event>) {
        let start_cs = centiseconds(phrase.start());
        let end_cs = centiseconds(phrase.end()).max(start_cs + 1);

        let lines: Vec<String> = phrase
            .line_texts()
            .iter()
            .map(|line| escape_text(line))
            .collect();

        events.push(Event {
            kind: EventKind::Base,
            layer: 0,
            start_cs,
            end_cs,
            style: "Base",
            text: format!(
                "{{{}{}}}{}",
                self.envelope.position(0),
                self.envelope.scale_tags(0),
                lines.join("\\N")
            ),
            phrase: index,
        });

        for (target, span) in highlight_spans(phrase, start_cs, end_cs)
            .into_iter()
            .enumerate()
        {
            let Some((h_start, h_end)) = span else {
                continue;
            };
            let offset = (h_start - start_cs) * 10;

            if let Effect::Box { .. } = self.recipe.effect {
                events.push(Event {
                    kind: EventKind::Backdrop,
                    layer: 1,
                    start_cs: h_start,
                    end_cs: h_end,
                    style: "Base",
                    text: self.backdrop(phrase, target),
                    phrase: index,
                });
            }

            events.push(Event {
                kind: EventKind::Highlight,
                layer: 1,
                start_cs: h_start,
                end_cs: h_end,
                style: "Highlight",
                text: self.highlight_text(phrase, target, offset),
                phrase: index,
            });
        }
    }

    /// The whole phrase with only word `target` visible.
    fn highlight_text(&self, phrase: &Phrase, target: usize, offset: u32) -> String {
        let words = phrase.words();
        let mut text = String::new();

        text.push('{');
        text.push_str(&self.envelope.position(offset));
        text.push_str(&self.envelope.scale_tags(offset));
        if let Effect::ScaleIn {
            fade_in, fade_out, ..
        } = self.recipe.effect
        {
            let _ = write!(text, "\\fad({fade_in},{fade_out})");
        }
        text.push_str(TRANSPARENT);
        text.push('}');

        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                text.push_str(if phrase.line_break() == Some(i) {
                    "\\N"
                } else {
                    " "
                });
            }

            if i == target {
                let _ = write!(text, "{{{}}}", self.target_tags(word, offset));
            }

            text.push_str(&escape_text(&word.text));

            if i == target && i + 1 < words.len() {
                let _ = write!(text, "{{{}}}", self.reset_tags(offset));
            }
        }

        text
    }

    fn target_tags(&self, word: &Word, offset: u32) -> String {
        let mut tags = String::from(OPAQUE);

        match self.recipe.effect {
            Effect::Swap | Effect::Box { .. } => {}
            Effect::Pop { peak, ms } => {
                let now = self.envelope.scale_at(offset).unwrap_or(100.0);
                let settled = self.envelope.scale_at(offset + ms).unwrap_or(100.0);
                let popped = num(now * f64::from(peak) / 100.0);
                let settled = num(settled);
                let _ = write!(
                    tags,
                    "\\fscx{popped}\\fscy{popped}\\t(0,{ms},\\fscx{settled}\\fscy{settled})"
                );
                if let Motion::Rise {
                    ms: motion_ms,
                    scale_to: Some(to),
                    ..
                } = self.recipe.motion
                    && offset + ms < motion_ms
                {
                    let _ = write!(
                        tags,
                        "\\t({ms},{rest},\\fscx{to}\\fscy{to})",
                        rest = motion_ms - offset
                    );
                }
            }
            Effect::ScaleIn { from, ms, .. } => {
                let _ = write!(
                    tags,
                    "\\fscx{from}\\fscy{from}\\t(0,{ms},\\fscx100\\fscy100)"
                );
            }
            Effect::KaraokeFill => {
                let word_ms = (word.duration() * 1000.0).round().max(0.0) as u32;
                let _ = write!(tags, "\\kf{}", (word_ms / 10).max(1));
            }
        }

        tags
    }

    /// Tags restoring the invisible state after the target word.
    fn reset_tags(&self, offset: u32) -> String {
        let mut tags = String::from(TRANSPARENT);

        match self.recipe.effect {
            Effect::Pop { .. } => match self.envelope.scale_at(offset) {
                Some(_) => tags.push_str(&self.envelope.scale_tags(offset)),
                None => tags.push_str("\\fscx100\\fscy100"),
            },
            Effect::ScaleIn { .. } => tags.push_str("\\fscx100\\fscy100"),
            Effect::KaraokeFill => tags.push_str("\\k0"),
            Effect::Swap | Effect::Box { .. } => {}
        }

        tags
    }

    /// Rounded rectangle drawn behind word `target`.
    fn backdrop(&self, phrase: &Phrase, target: usize) -> String {
        let Effect::Box {
            colour,
            radius,
            pad_x,
            pad_y,
        } = self.recipe.effect
        else {
            return String::new();
        };

        let family = &self.ctx.font_family;
        let size = self.ctx.font_size as f32;
        let lines = phrase.lines();
        let (line, position) = phrase.locate(target);
        let line_words = lines[line];

        let line_h = self.ctx.font_size + LINE_GAP_PX;
        let total_h = lines.len() as u32 * line_h - LINE_GAP_PX;
        let (centre_x, bottom_y) = self.ctx.anchor();
        let top_y = bottom_y as f32 - total_h as f32 + (line as u32 * line_h) as f32;

        let line_w = self.measure.measure(&join_words(line_words), family, size);
        let prefix_w = if position == 0 {
            0.0
        } else {
            let prefix = format!("{} ", join_words(&line_words[..position]));
            self.measure.measure(&prefix, family, size)
        };
        let word_w = self
            .measure
            .measure(&line_words[position].text, family, size);

        let x = centre_x as f32 - line_w / 2.0 + prefix_w - pad_x as f32;
        let y = top_y - pad_y as f32;
        let w = (word_w.round() as u32) + 2 * pad_x;
        let h = self.ctx.font_size + 2 * pad_y;

        format!(
            "{{\\an7\\pos({},{})\\1c{}{}\\bord0\\shad0\\p1}}{}{{\\p0}}",
            x.round() as i32,
            y.round() as i32,
            colour.tag(),
            OPAQUE,
            rounded_rect(w, h, radius)
        )
    }
}

/// Emit `phrases` in `style`. Pure: equal inputs give byte-identical documents.
pub fn emit(
    phrases: &[Phrase],
    style: StyleProfile,
    ctx: &RenderContext,
    measure: &dyn TextMeasure,
) -> Result<SubtitleDoc, RenderError> {
    Ok(Emitter::new(style, ctx, measure)?.emit(phrases))
}

/// Quantised highlight interval of every word, `None` where nothing is left.
///
/// Highlights start no earlier than the previous highlight ended and end no
/// later than the next word starts or the phrase ends. Words under
/// [`MIN_VISIBLE_CS`] are stretched towards [`STRETCHED_CS`].
fn highlight_spans(phrase: &Phrase, base_start: u32, base_end: u32) -> Vec<Option<(u32, u32)>> {
    let words = phrase.words();
    let mut floor = base_start;

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let word_start = centiseconds(word.start);
            let next_start = words.get(i + 1).map(|next| centiseconds(next.start));

            let mut end = centiseconds(word.end);
            if end.saturating_sub(word_start) < MIN_VISIBLE_CS {
                let limit = next_start.unwrap_or(base_end);
                end = end.max(limit.min(word_start + STRETCHED_CS));
            }
            if let Some(next_start) = next_start {
                end = end.min(next_start);
            }
            end = end.min(base_end);

            let start = word_start.max(floor);
            (end > start).then(|| {
                floor = end;
                (start, end)
            })
        })
        .collect()
}

/// ASS drawing of a `w`×`h` rectangle with corners of radius `r`.
fn rounded_rect(w: u32, h: u32, r: u32) -> String {
    let r = r.min(w.min(h) / 2);
    if r == 0 {
        return format!("m 0 0 l {w} 0 l {w} {h} l 0 {h} l 0 0");
    }

    let half = r / 2;
    format!(
        "m {r} 0 l {a} 0 b {b} 0 {w} {half} {w} {r} l {w} {c} b {w} {d} {b} {h} {a} {h} l {r} {h} b {half} {h} 0 {d} 0 {c} l 0 {r} b 0 {half} {half} 0 {r} 0",
        a = w - r,
        b = w - half,
        c = h - r,
        d = h - half,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DEVANAGARI_FONT;
    use crate::segment::segment;

    struct FixedAdvance {
        em: f32,
        lookup: FontLookup,
    }

    impl TextMeasure for FixedAdvance {
        fn measure(&self, text: &str, _family: &str, size: f32) -> f32 {
            text.chars().count() as f32 * self.em * size
        }

        fn lookup(&self, _family: &str) -> FontLookup {
            self.lookup
        }
    }

    const HALF_EM: FixedAdvance = FixedAdvance {
        em: 0.5,
        lookup: FontLookup::Found,
    };

    fn w(text: &str, start: f64, end: f64) -> Word {
        Word::new(text, start, end)
    }

    fn landscape() -> RenderContext {
        RenderContext::new(1920, 1080)
    }

    fn one_two() -> Phrase {
        Phrase::new(vec![w("one", 0.0, 0.3), w("two", 0.3, 0.6)]).unwrap()
    }

    fn of_kind(doc: &SubtitleDoc, kind: EventKind) -> Vec<&Event> {
        doc.events().iter().filter(|e| e.kind == kind).collect()
    }

    fn sample_words() -> Vec<Word> {
        let mut words = Vec::new();
        let mut t = 0.0;
        for i in 0..30 {
            let len = match i % 5 {
                0 => 0.03,
                1 => 0.41,
                2 => 0.2,
                3 => 0.55,
                _ => 0.12,
            };
            words.push(w(&format!("word{i}"), t, t + len));
            t += len + if i % 9 == 8 { 0.8 } else { 0.04 };
        }
        words
    }

    #[test]
    fn formats_timestamps() {
        assert_eq!(format_ass_time(3661.235), "1:01:01.24");
        assert_eq!(format_ass_time(-2.0), "0:00:00.00");
        assert_eq!(format_ass_time(0.005), "0:00:00.01");
        assert_eq!(format_ass_time(59.999), "0:01:00.00");
    }

    #[test]
    fn escapes_override_characters() {
        assert_eq!(escape_text(r"a\b {c}"), r"a\\b \{c\}");
    }

    #[test]
    fn highlight_renders_whole_phrase() {
        let ctx = landscape();
        let doc = emit(&[one_two()], StyleProfile::Netflix, &ctx, &HALF_EM).unwrap();

        let base = of_kind(&doc, EventKind::Base);
        let highlights = of_kind(&doc, EventKind::Highlight);

        match (&base[..], &highlights[..]) {
            ([base], [first, second]) => {
                assert_eq!((base.start_cs, base.end_cs), (0, 60));
                assert_eq!(base.text, "{\\an2\\pos(960,1000)}one two");
                assert_eq!((first.start_cs, first.end_cs), (0, 30));
                assert_eq!((second.start_cs, second.end_cs), (30, 60));
                assert_eq!(
                    first.text,
                    "{\\an2\\pos(960,1000)\\alpha&HFF&}{\\alpha&H00&}one{\\alpha&HFF&} two"
                );
                assert_eq!(
                    second.text,
                    "{\\an2\\pos(960,1000)\\alpha&HFF&}one {\\alpha&H00&}two"
                );
            }
            _ => panic!("unexpected events: {:#?}", doc.events()),
        }
    }

    #[test]
    fn document_layout() {
        let ctx = landscape();
        let doc = emit(&[one_two()], StyleProfile::Netflix, &ctx, &HALF_EM).unwrap();
        let text = doc.to_string();

        assert!(text.starts_with("[Script Info]\n"));
        assert!(text.contains("PlayResX: 1920\nPlayResY: 1080\nWrapStyle: 2\n"));
        assert!(text.contains(
            "Style: Base,Arial,46,&H00FFFFFF,&H00FFFFFF,&H00000000,&H64000000,-1,0,0,0,100,100,0,0,1,2,1,2,80,80,80,1"
        ));
        assert!(text.contains("Style: Highlight,Arial,46,&H0000FFFF,"));
        assert!(text.contains("Dialogue: 0,0:00:00.00,0:00:00.60,Base,,0,0,0,,"));
        assert!(text.contains("Dialogue: 1,0:00:00.30,0:00:00.60,Highlight,,0,0,0,,"));
    }

    #[test]
    fn base_precedes_highlight_at_equal_start() {
        let doc = emit(&[one_two()], StyleProfile::Cinematic, &landscape(), &HALF_EM).unwrap();

        let kinds: Vec<EventKind> = doc.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [EventKind::Base, EventKind::Highlight, EventKind::Highlight]
        );
    }

    #[test]
    fn stretches_short_words() {
        let phrase = Phrase::new(vec![
            w("a", 0.0, 0.05),
            w("b", 0.5, 0.52),
            w("c", 0.58, 0.9),
        ])
        .unwrap();

        let spans = highlight_spans(&phrase, 0, 90);

        assert_eq!(spans, [Some((0, 12)), Some((50, 58)), Some((58, 90))]);
    }

    #[test]
    fn never_shortens_long_enough_words() {
        let phrase = Phrase::new(vec![w("a", 0.0, 0.3), w("b", 0.5, 0.9)]).unwrap();

        assert_eq!(
            highlight_spans(&phrase, 0, 90),
            [Some((0, 30)), Some((50, 90))]
        );
    }

    #[test]
    fn overlapping_words_do_not_overlap_highlights() {
        let phrase = Phrase::new(vec![
            w("a", 0.0, 0.5),
            w("b", 0.0, 0.4),
            w("c", 0.2, 0.6),
        ])
        .unwrap();

        let spans = highlight_spans(&phrase, 0, 60);

        assert_eq!(spans, [None, Some((0, 20)), Some((20, 60))]);
    }

    #[test]
    fn highlights_stay_inside_base_and_apart() {
        let words = sample_words();
        let ctx = RenderContext::new(1080, 1920);
        let phrases = segment(&words, &ctx, &HALF_EM);

        for style in StyleProfile::ALL {
            let doc = emit(&phrases, style, &ctx, &HALF_EM).unwrap();
            let bases = of_kind(&doc, EventKind::Base);

            for h in of_kind(&doc, EventKind::Highlight) {
                assert!(
                    bases.iter().any(|b| b.phrase == h.phrase
                        && b.start_cs <= h.start_cs
                        && h.end_cs <= b.end_cs),
                    "{style}: uncovered highlight {h:?}"
                );
                assert!(h.start_cs < h.end_cs);
            }

            for p in 0..phrases.len() {
                let mut spans: Vec<(u32, u32)> = of_kind(&doc, EventKind::Highlight)
                    .iter()
                    .filter(|h| h.phrase == p)
                    .map(|h| (h.start_cs, h.end_cs))
                    .collect();
                spans.sort();
                for pair in spans.windows(2) {
                    assert!(pair[0].1 <= pair[1].0, "{style}: overlap {pair:?}");
                }
            }

            let starts: Vec<u32> = doc.events().iter().map(|e| e.start_cs).collect();
            assert!(starts.windows(2).all(|s| s[0] <= s[1]));
        }
    }

    #[test]
    fn emission_is_idempotent() {
        let words = sample_words();
        let ctx = landscape();
        let phrases = segment(&words, &ctx, &HALF_EM);

        for style in StyleProfile::ALL {
            let first = emit(&phrases, style, &ctx, &HALF_EM).unwrap().to_string();
            let second = emit(&phrases, style, &ctx, &HALF_EM).unwrap().to_string();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn cinematic_resumes_envelope() {
        let phrase = Phrase::new(vec![w("slow", 0.0, 1.0), w("rise", 1.0, 2.0)]).unwrap();
        let doc = emit(&[phrase], StyleProfile::Cinematic, &landscape(), &HALF_EM).unwrap();

        let base = &of_kind(&doc, EventKind::Base)[0];
        assert!(base.text.starts_with(
            "{\\an2\\move(960,1040,960,1000,0,3000)\\fscx100\\fscy100\\t(0,3000,\\fscx105\\fscy105)"
        ));

        let second = &of_kind(&doc, EventKind::Highlight)[1];
        assert!(second.text.starts_with(
            "{\\an2\\move(960,1026.67,960,1000,0,2000)\\fscx101.67\\fscy101.67\\t(0,2000,\\fscx105\\fscy105)"
        ));
        assert!(second.text.contains("\\fscx107.77\\fscy107.77\\t(0,150,\\fscx101.92\\fscy101.92)"));
    }

    #[test]
    fn typewriter_fill_uses_word_duration() {
        let phrase = Phrase::new(vec![
            w("type", 0.0, 0.37),
            w("it", 0.4, 0.403),
        ])
        .unwrap();
        let doc = emit(&[phrase], StyleProfile::Typewriter, &landscape(), &HALF_EM).unwrap();

        let highlights = of_kind(&doc, EventKind::Highlight);
        assert!(highlights[0].text.contains("{\\alpha&H00&\\kf37}type{\\alpha&HFF&\\k0}"));
        assert!(highlights[1].text.contains("\\kf1}it"));
    }

    #[test]
    fn pro_pop_scales_and_fades() {
        let doc = emit(&[one_two()], StyleProfile::ProPop, &landscape(), &HALF_EM).unwrap();

        let first = &of_kind(&doc, EventKind::Highlight)[0];
        assert!(first.text.contains("\\fad(250,150)"));
        assert!(first.text.contains("\\fscx85\\fscy85\\t(0,250,\\fscx100\\fscy100)}one"));
        assert!(first.text.contains("{\\alpha&HFF&\\fscx100\\fscy100} two"));
    }

    #[test]
    fn karaoke_box_draws_behind_word() {
        let ctx = landscape();
        let doc = emit(&[one_two()], StyleProfile::KaraokeBox, &ctx, &HALF_EM).unwrap();

        let kinds: Vec<EventKind> = doc.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                EventKind::Base,
                EventKind::Backdrop,
                EventKind::Highlight,
                EventKind::Backdrop,
                EventKind::Highlight
            ]
        );

        // "one two" is 7 * 23 = 161 px wide, centred on 960; "one " is 92 px
        let boxes = of_kind(&doc, EventKind::Backdrop);
        assert!(boxes[0].text.starts_with("{\\an7\\pos(862,944)\\1c&H0000FF&"));
        assert!(boxes[1].text.starts_with("{\\an7\\pos(954,944)"));
        assert!(boxes[0].text.contains("\\p1}m 12 0 l 93 0 b 99 0 105 6 105 12"));
        assert!(boxes[0].text.ends_with("{\\p0}"));
        assert_eq!(doc.styles()[1].primary, Colour::WHITE);
    }

    #[test]
    fn devanagari_run_declares_devanagari_font() {
        let ctx = RenderContext::new(1080, 1920).with_language(Some("hi"));
        let phrase = Phrase::new(vec![w("नमस्ते", 0.0, 0.5)]).unwrap();

        let doc = emit(&[phrase], StyleProfile::Cinematic, &ctx, &HALF_EM).unwrap();

        assert!(doc.to_string().contains(&format!("Style: Base,{DEVANAGARI_FONT},")));
    }

    #[test]
    fn missing_explicit_font_is_an_error() {
        let ctx = landscape().with_font("Imaginary Sans");
        let missing = FixedAdvance {
            em: 0.5,
            lookup: FontLookup::Missing,
        };

        assert!(matches!(
            emit(&[one_two()], StyleProfile::Netflix, &ctx, &missing),
            Err(RenderError::FontUnavailable { family }) if family == "Imaginary Sans"
        ));
    }

    #[test]
    fn font_check_is_skipped_without_database() {
        let ctx = landscape().with_font("Imaginary Sans");
        let empty = FixedAdvance {
            em: 0.5,
            lookup: FontLookup::NoDatabase,
        };

        assert!(emit(&[one_two()], StyleProfile::Netflix, &ctx, &empty).is_ok());
    }

    #[test]
    fn user_text_is_escaped_in_events() {
        let phrase = Phrase::new(vec![w("{odd}", 0.0, 0.5)]).unwrap();

        let doc = emit(&[phrase], StyleProfile::Netflix, &landscape(), &HALF_EM).unwrap();

        assert!(doc.events()[0].text.ends_with("\\{odd\\}"));
    }
}
