//! Text width measurement for wrapping and box placement.

use crate::context::AVERAGE_ADVANCE_EM;
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Result of resolving a family name against the font database.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontLookup {
    Found,
    Missing,
    /// No faces are loaded, so nothing can be resolved.
    NoDatabase,
}

/// Pixel width of a single line of text.
///
/// Implementations must be pure: equal inputs give equal widths.
pub trait TextMeasure {
    fn measure(&self, text: &str, family: &str, size: f32) -> f32;

    fn lookup(&self, family: &str) -> FontLookup;
}

/// Width assuming every character advances by the average glyph width.
pub fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * AVERAGE_ADVANCE_EM * size
}

/// Measures text with real glyph advances from installed fonts.
///
/// Captions are rendered bold, so widths come from the bold face of the
/// family. Families that cannot be resolved are estimated, with one warning
/// per oracle.
pub struct LayoutOracle {
    db: Database,
    warned: OnceLock<()>,
}

impl LayoutOracle {
    /// Load system fonts, the user font directory and `extra_dirs`.
    pub fn new(extra_dirs: &[PathBuf]) -> Self {
        let mut db = Database::new();
        db.load_system_fonts();

        if let Some(dir) = dirs::font_dir() {
            db.load_fonts_dir(dir);
        }
        for dir in extra_dirs {
            db.load_fonts_dir(dir);
        }

        debug!(faces = db.len(), "loaded font database");

        Self::with_database(db)
    }

    /// An oracle that always estimates.
    pub fn estimating() -> Self {
        Self::with_database(Database::new())
    }

    pub fn with_database(db: Database) -> Self {
        Self {
            db,
            warned: OnceLock::new(),
        }
    }

    fn face(&self, family: &str, weight: Weight) -> Option<fontdb::ID> {
        self.db.query(&Query {
            families: &[Family::Name(family)],
            weight,
            stretch: Stretch::Normal,
            style: Style::Normal,
        })
    }

    fn estimate(&self, text: &str, family: &str, size: f32) -> f32 {
        self.warned.get_or_init(|| {
            warn!(
                family,
                "font not found; estimating text width at {AVERAGE_ADVANCE_EM} em per character"
            );
        });
        estimate_width(text, size)
    }
}

impl TextMeasure for LayoutOracle {
    fn measure(&self, text: &str, family: &str, size: f32) -> f32 {
        self.face(family, Weight::BOLD)
            .and_then(|id| {
                self.db
                    .with_face_data(id, |data, index| advance_width(data, index, text, size))
            })
            .flatten()
            .unwrap_or_else(|| self.estimate(text, family, size))
    }

    fn lookup(&self, family: &str) -> FontLookup {
        if self.db.is_empty() {
            FontLookup::NoDatabase
        } else if self.face(family, Weight::NORMAL).is_some() {
            FontLookup::Found
        } else {
            FontLookup::Missing
        }
    }
}

/// Sum of horizontal advances; glyphs the face lacks use the average advance.
fn advance_width(data: &[u8], index: u32, text: &str, size: f32) -> Option<f32> {
    let face = ttf_parser::Face::parse(data, index).ok()?;
    let scale = size / f32::from(face.units_per_em());

    let width = text
        .chars()
        .map(|c| {
            face.glyph_index(c)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .map_or(AVERAGE_ADVANCE_EM * size, |advance| {
                    f32::from(advance) * scale
                })
        })
        .sum();

    Some(width)
}
