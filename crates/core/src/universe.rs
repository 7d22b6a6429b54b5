//! Glyph universe providers.

use crate::glyph::GlyphUniverse;

/// A source file referenced by a document, as written in the designspace
/// (relative to the designspace or sketch file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub filename: String,
}

/// The glyph universe could not be computed (missing or unreadable sources).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("glyph universe unavailable: {reason}")]
pub struct Unavailable {
    pub reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Computes the set of glyph names available across a document's sources.
///
/// Called at most once per conversion run. An [`Unavailable`] result turns
/// off wildcard compaction and target-glyph filtering for that run.
pub trait GlyphUniverseProvider {
    fn all_glyphs(&self, sources: &[SourceFile]) -> Result<GlyphUniverse, Unavailable>;
}

/// A provider that never has a universe.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGlyphUniverse;

impl GlyphUniverseProvider for NoGlyphUniverse {
    fn all_glyphs(&self, _sources: &[SourceFile]) -> Result<GlyphUniverse, Unavailable> {
        Err(Unavailable::new("no glyph source configured"))
    }
}

/// A provider returning a fixed set of glyphs regardless of sources.
#[derive(Debug, Clone, Default)]
pub struct StaticGlyphUniverse(pub GlyphUniverse);

impl GlyphUniverseProvider for StaticGlyphUniverse {
    fn all_glyphs(&self, _sources: &[SourceFile]) -> Result<GlyphUniverse, Unavailable> {
        Ok(self.0.clone())
    }
}
