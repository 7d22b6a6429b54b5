//! UFO-backed glyph lookup and source checks for DSSketch conversions.

mod error;
mod glyphs;
mod validate;

pub use error::{Error, Result};
pub use glyphs::{UfoGlyphUniverse, glyph_names};
pub use validate::{SourceProblem, ValidationReport, validate_sources};
