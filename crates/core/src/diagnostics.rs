//! Non-fatal diagnostics collected during a conversion run.

use std::fmt;

use log::warn;

use crate::glyph::GlyphName;

/// A non-fatal condition. The run continues with a narrowed or corrected
/// result and the warning is returned next to it.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A substitution was dropped because its target glyph does not exist.
    TargetGlyphMissing { rule: String, from: GlyphName, to: GlyphName },
    /// A wildcard candidate matched glyphs outside the rule, so the rule was
    /// written as an explicit glyph list instead.
    WildcardOverMatchFallback { rule: String, pattern: String, glyphs: Vec<GlyphName> },
    /// Two avar2 entries with the same input signature set the same output;
    /// the later value was kept.
    MergeConflict { axis: String, signature: String, old_value: f64, new_value: f64 },
    /// A wildcard could not be expanded because no glyph universe was
    /// available, so it contributed no substitutions.
    WildcardUnexpanded { rule: String, pattern: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::TargetGlyphMissing { rule, from, to } => write!(
                f,
                "rule '{rule}': skipping {from} -> {to}, target glyph '{to}' not found in sources"
            ),
            Warning::WildcardOverMatchFallback { rule, pattern, glyphs } => write!(
                f,
                "rule '{rule}': '{pattern}' would also match {}; using an explicit glyph list",
                join(glyphs)
            ),
            Warning::MergeConflict { axis, signature, old_value, new_value } => write!(
                f,
                "avar2 [{signature}]: {axis} redefined from {old_value} to {new_value}"
            ),
            Warning::WildcardUnexpanded { rule, pattern } => write!(
                f,
                "rule '{rule}': cannot expand '{pattern}' without glyph sources"
            ),
        }
    }
}

fn join(glyphs: &[GlyphName]) -> String {
    glyphs.iter().map(GlyphName::as_str).collect::<Vec<_>>().join(", ")
}

/// Ordered warning accumulator.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Vec<Warning>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        warn!("{warning}");
        self.0.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}

/// A successful result together with the warnings produced on the way.
#[derive(Debug, Clone)]
pub struct Converted<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Converted<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        Self { value, warnings: diagnostics.into_vec() }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Converted<U> {
        Converted { value: f(self.value), warnings: self.warnings }
    }
}
