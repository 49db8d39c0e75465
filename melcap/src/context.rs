//! Per-run layout policy derived from the video resolution and language.

use melcap_asr::align::language_code;

/// Default silence gap that starts a new phrase.
pub const DEFAULT_MAX_GAP_S: f64 = 0.55;

/// Family used for scripts without special requirements.
pub const DEFAULT_FONT: &str = "Arial";

/// Family used when the run language is written in Devanagari.
pub const DEVANAGARI_FONT: &str = "Noto Sans Devanagari";

/// Average advance of a glyph as a fraction of the font size.
pub const AVERAGE_ADVANCE_EM: f32 = 0.55;

const DEVANAGARI_LANGUAGES: &[&str] = &[
    "hi", "mr", "ne", "sa", "mai", "kok", "bho", "mag", "new", "doi", "brx",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Square frames count as portrait.
    pub fn of(width: u32, height: u32) -> Self {
        if height >= width {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }
}

/// How the font family was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontChoice {
    /// Picked by language policy; may fall back silently.
    Default,
    /// Named by the user; must resolve.
    Explicit,
}

/// True for ISO codes of languages usually written in Devanagari.
pub fn is_devanagari_language(code: &str) -> bool {
    language_code(code).is_some_and(|code| DEVANAGARI_LANGUAGES.contains(&code.as_str()))
}

/// True when `text` contains Devanagari letters.
pub fn contains_devanagari(text: &str) -> bool {
    text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c))
}

/// Layout policy for one run. Built once, then only read.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderContext {
    pub video_w: u32,
    pub video_h: u32,
    pub orientation: Orientation,
    pub font_family: String,
    pub font_choice: FontChoice,
    pub font_size: u32,
    pub bottom_margin: u32,
    pub max_chars_per_line: usize,
    pub words_per_phrase: usize,
    pub max_gap_s: f64,
    pub language: Option<String>,
}

impl RenderContext {
    pub fn new(video_w: u32, video_h: u32) -> Self {
        let orientation = Orientation::of(video_w, video_h);
        let h = video_h as f64;

        let (font_size, bottom_margin, max_chars_per_line, words_per_phrase) = match orientation {
            Orientation::Portrait => ((h * 0.045).round().clamp(40.0, 56.0), 150, 26, 3),
            Orientation::Landscape => ((h * 0.070).round().clamp(30.0, 46.0), 80, 38, 5),
        };

        Self {
            video_w,
            video_h,
            orientation,
            font_family: DEFAULT_FONT.to_string(),
            font_choice: FontChoice::Default,
            font_size: font_size as u32,
            bottom_margin,
            max_chars_per_line,
            words_per_phrase,
            max_gap_s: DEFAULT_MAX_GAP_S,
            language: None,
        }
    }

    /// Set the run language; a default font follows the language's script.
    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.language = language.and_then(language_code);

        if self.font_choice == FontChoice::Default {
            let devanagari = self.language.as_deref().is_some_and(is_devanagari_language);
            self.font_family = if devanagari {
                DEVANAGARI_FONT
            } else {
                DEFAULT_FONT
            }
            .to_string();
        }

        self
    }

    pub fn with_font(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self.font_choice = FontChoice::Explicit;
        self
    }

    pub fn with_words_per_phrase(mut self, words: usize) -> Self {
        self.words_per_phrase = words.max(1);
        self
    }

    pub fn with_max_gap(mut self, secs: f64) -> Self {
        self.max_gap_s = if secs.is_finite() { secs.max(0.0) } else { DEFAULT_MAX_GAP_S };
        self
    }

    /// Widest line in pixels that still fits the character budget.
    pub fn line_budget_px(&self) -> f32 {
        self.max_chars_per_line as f32 * AVERAGE_ADVANCE_EM * self.font_size as f32
    }

    /// Anchor of the bottom-centred caption block.
    pub fn anchor(&self) -> (u32, u32) {
        (
            self.video_w / 2,
            self.video_h.saturating_sub(self.bottom_margin),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portrait_defaults() {
        let ctx = RenderContext::new(1080, 1920);

        assert_eq!(ctx.orientation, Orientation::Portrait);
        // round(1920 * 0.045) = 86, clamped
        assert_eq!(ctx.font_size, 56);
        assert_eq!(ctx.bottom_margin, 150);
        assert_eq!(ctx.max_chars_per_line, 26);
        assert_eq!(ctx.words_per_phrase, 3);
        assert_eq!(ctx.max_gap_s, 0.55);
        assert_eq!(ctx.anchor(), (540, 1770));
    }

    #[test]
    fn landscape_defaults() {
        let ctx = RenderContext::new(1280, 720);

        assert_eq!(ctx.orientation, Orientation::Landscape);
        // round(720 * 0.070) = 50, clamped
        assert_eq!(ctx.font_size, 46);
        assert_eq!(ctx.bottom_margin, 80);
        assert_eq!(ctx.max_chars_per_line, 38);
        assert_eq!(ctx.words_per_phrase, 5);
    }

    #[test]
    fn small_frames_hit_the_lower_clamp() {
        assert_eq!(RenderContext::new(320, 240).font_size, 30);
        assert_eq!(RenderContext::new(480, 640).font_size, 40);
        assert_eq!(RenderContext::new(640, 360).font_size, 30);
        // round(1000 * 0.045) = 45
        assert_eq!(RenderContext::new(600, 1000).font_size, 45);
    }

    #[test]
    fn square_is_portrait() {
        assert_eq!(Orientation::of(1080, 1080), Orientation::Portrait);
    }

    #[test]
    fn devanagari_language_selects_devanagari_font() {
        let ctx = RenderContext::new(1080, 1920).with_language(Some("hi-IN"));

        assert_eq!(ctx.language.as_deref(), Some("hi"));
        assert_eq!(ctx.font_family, DEVANAGARI_FONT);
        assert_eq!(ctx.font_choice, FontChoice::Default);
    }

    #[test]
    fn explicit_font_survives_language() {
        let ctx = RenderContext::new(1080, 1920)
            .with_font("Mukta")
            .with_language(Some("mr"));

        assert_eq!(ctx.font_family, "Mukta");
        assert_eq!(ctx.font_choice, FontChoice::Explicit);
    }

    #[test]
    fn overrides_are_sanitised() {
        let ctx = RenderContext::new(1920, 1080)
            .with_words_per_phrase(0)
            .with_max_gap(-1.0);

        assert_eq!(ctx.words_per_phrase, 1);
        assert_eq!(ctx.max_gap_s, 0.0);
    }

    #[test]
    fn detects_devanagari_text() {
        assert!(contains_devanagari("नमस्ते दुनिया"));
        assert!(!contains_devanagari("hello world"));
        assert!(is_devanagari_language("ne"));
        assert!(!is_devanagari_language("en"));
    }
}
