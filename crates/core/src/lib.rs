//! DSSketch - conversion between designspace XML and the compact Sketch
//! notation for variable-font design spaces.
//!
//! ```
//! use dssketch::{ConversionContext, sketch_to_designspace};
//!
//! let sketch = "family Demo\naxes\n    wght 100:400:900\nmasters\n    Demo-Regular [400] @base\n";
//! let xml = sketch_to_designspace(sketch, &ConversionContext::default()).unwrap();
//! assert!(xml.value.contains(r#"<axis tag="wght""#));
//! ```

pub mod avar2;
pub mod condition;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod glyph;
pub mod labels;
pub mod number;
pub mod pattern;
pub mod sketch;
pub mod tags;
pub mod universe;
pub mod xml;

use log::{debug, info};

pub use diagnostics::{Converted, Diagnostics, Warning};
pub use document::Document;
pub use error::{Error, Result};
pub use glyph::{GlyphName, GlyphUniverse};
pub use labels::{LabelResolver, LabelTable};
pub use sketch::WriterOptions;
pub use universe::{GlyphUniverseProvider, NoGlyphUniverse, SourceFile, StaticGlyphUniverse, Unavailable};

/// The capabilities a conversion run is given.
pub struct ConversionContext<'a> {
    pub labels: &'a dyn LabelResolver,
    pub glyphs: &'a dyn GlyphUniverseProvider,
    /// Compact avar2 values and instances when writing Sketch text.
    pub optimize: bool,
}

impl Default for ConversionContext<'_> {
    fn default() -> Self {
        static STANDARD: std::sync::LazyLock<LabelTable> = std::sync::LazyLock::new(LabelTable::standard);
        Self { labels: &*STANDARD, glyphs: &NoGlyphUniverse, optimize: true }
    }
}

impl ConversionContext<'_> {
    /// Fetch the glyph universe for `document` once for this run.
    pub fn universe(&self, document: &Document) -> Option<GlyphUniverse> {
        match self.glyphs.all_glyphs(&document.source_files()) {
            Ok(universe) => {
                debug!("glyph universe: {} glyphs", universe.len());
                Some(universe)
            }
            Err(unavailable) => {
                info!("{unavailable}; wildcards and target glyphs are not checked");
                None
            }
        }
    }
}

/// Parse Sketch text.
pub fn parse_sketch(text: &str, labels: &dyn LabelResolver) -> Result<Converted<Document>> {
    sketch::parse(text, labels)
}

/// Render a document as Sketch text.
pub fn write_sketch(document: &Document, context: &ConversionContext<'_>) -> Result<Converted<String>> {
    let universe = context.universe(document);
    sketch::write(document, context.labels, universe.as_ref(), WriterOptions { optimize: context.optimize })
}

/// Read designspace XML.
pub fn read_designspace(text: &str) -> Result<Converted<Document>> {
    xml::read(text)
}

/// Render a document as designspace XML.
pub fn write_designspace(document: &Document, context: &ConversionContext<'_>) -> Result<Converted<String>> {
    let universe = context.universe(document);
    xml::write(document, universe.as_ref())
}

/// Sketch text to designspace XML in one run.
pub fn sketch_to_designspace(text: &str, context: &ConversionContext<'_>) -> Result<Converted<String>> {
    let parsed = parse_sketch(text, context.labels)?;
    let mut written = write_designspace(&parsed.value, context)?;
    let mut warnings = parsed.warnings;
    warnings.append(&mut written.warnings);
    Ok(Converted { value: written.value, warnings })
}

/// Designspace XML to Sketch text in one run.
pub fn designspace_to_sketch(text: &str, context: &ConversionContext<'_>) -> Result<Converted<String>> {
    let read = read_designspace(text)?;
    let mut written = write_sketch(&read.value, context)?;
    let mut warnings = read.warnings;
    warnings.append(&mut written.warnings);
    Ok(Converted { value: written.value, warnings })
}
