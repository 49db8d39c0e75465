//! Caption style profiles and the animation recipe each one maps to.

use crate::error::RenderError;
use std::fmt;
use std::str::FromStr;

/// Colour with alpha, alpha 0 being opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colour {
    pub alpha: u8,
    pub blue: u8,
    pub green: u8,
    pub red: u8,
}

impl Colour {
    pub const WHITE: Self = Self::opaque(0xFF, 0xFF, 0xFF);
    pub const BLACK: Self = Self::opaque(0x00, 0x00, 0x00);
    pub const YELLOW: Self = Self::opaque(0xFF, 0xFF, 0x00);
    pub const RED: Self = Self::opaque(0xFF, 0x00, 0x00);

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self {
            alpha: 0,
            blue,
            green,
            red,
        }
    }

    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self { alpha, ..self }
    }

    /// Inline override form `&HBBGGRR&`, as used by `\1c` and friends.
    pub fn tag(&self) -> String {
        format!("&H{:02X}{:02X}{:02X}&", self.blue, self.green, self.red)
    }
}

/// Style-line form `&HAABBGGRR`.
impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "&H{:02X}{:02X}{:02X}{:02X}",
            self.alpha, self.blue, self.green, self.red
        )
    }
}

/// Recognised caption styles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StyleProfile {
    #[default]
    Cinematic,
    ProPop,
    DriftUp,
    Typewriter,
    Netflix,
    KaraokeBox,
}

impl StyleProfile {
    pub const ALL: [Self; 6] = [
        Self::Cinematic,
        Self::ProPop,
        Self::DriftUp,
        Self::Typewriter,
        Self::Netflix,
        Self::KaraokeBox,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cinematic => "cinematic",
            Self::ProPop => "pro_pop",
            Self::DriftUp => "drift_up",
            Self::Typewriter => "typewriter",
            Self::Netflix => "netflix",
            Self::KaraokeBox => "karaoke_box",
        }
    }

    pub fn recipe(&self) -> Recipe {
        let high_contrast = Recipe {
            outline: 3,
            shadow: 0,
            back_colour: Colour::BLACK,
            emphasis: Colour::YELLOW,
            motion: Motion::Still,
            effect: Effect::Swap,
        };

        match self {
            Self::Cinematic => Recipe {
                motion: Motion::Rise {
                    px: 40,
                    ms: 3000,
                    scale_to: Some(105),
                },
                effect: Effect::Pop { peak: 106, ms: 150 },
                ..high_contrast
            },
            Self::ProPop => Recipe {
                effect: Effect::ScaleIn {
                    from: 85,
                    ms: 250,
                    fade_in: 250,
                    fade_out: 150,
                },
                ..high_contrast
            },
            Self::DriftUp => Recipe {
                motion: Motion::Rise {
                    px: 10,
                    ms: 300,
                    scale_to: None,
                },
                ..high_contrast
            },
            Self::Typewriter => Recipe {
                effect: Effect::KaraokeFill,
                ..high_contrast
            },
            Self::Netflix => Recipe {
                outline: 2,
                shadow: 1,
                back_colour: Colour::BLACK.with_alpha(0x64),
                ..high_contrast
            },
            Self::KaraokeBox => Recipe {
                emphasis: Colour::WHITE,
                effect: Effect::Box {
                    colour: Colour::RED,
                    radius: 12,
                    pad_x: 18,
                    pad_y: 10,
                },
                ..high_contrast
            },
        }
    }
}

impl fmt::Display for StyleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StyleProfile {
    type Err = RenderError;

    /// Accepts the snake_case names, case-insensitively, with `-` for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");

        Self::ALL
            .into_iter()
            .find(|style| style.name() == wanted)
            .ok_or_else(|| RenderError::StyleUnknown {
                name: s.to_string(),
                expected: Self::ALL.map(|style| style.name()).join(", "),
            })
    }
}

/// Motion shared by every layer of a phrase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    Still,
    /// Rise by `px` over `ms`, optionally growing to `scale_to` percent.
    Rise {
        px: u32,
        ms: u32,
        scale_to: Option<u32>,
    },
}

/// How the active word is emphasised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Colour swap only.
    Swap,
    /// Colour swap, starting at `peak` percent of the current scale.
    Pop { peak: u32, ms: u32 },
    /// Grow from `from` percent while fading in and out.
    ScaleIn {
        from: u32,
        ms: u32,
        fade_in: u32,
        fade_out: u32,
    },
    /// Karaoke sweep across the word over its duration.
    KaraokeFill,
    /// Rounded rectangle behind the word.
    Box {
        colour: Colour,
        radius: u32,
        pad_x: u32,
        pad_y: u32,
    },
}

/// Deterministic rendering parameters of a style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recipe {
    pub outline: u32,
    pub shadow: u32,
    pub back_colour: Colour,
    pub emphasis: Colour,
    pub motion: Motion,
    pub effect: Effect,
}
