//! Glyph names and the glyph universe snapshot.

use std::{
    borrow::Borrow,
    collections::BTreeSet,
    fmt::{Display, Formatter, Result},
    ops::Deref,
};

/// A glyph name as it appears in rule substitutions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphName(String);

impl GlyphName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The glyph name with `suffix` appended, e.g. `dollar` + `.rvrn`.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self(format!("{}{suffix}", self.0))
    }
}

impl Deref for GlyphName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for GlyphName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for GlyphName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for GlyphName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for GlyphName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Display for GlyphName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GlyphName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for GlyphName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Every glyph name known to participate in a conversion run.
///
/// Computed once per run and never re-queried; ordering is lexicographic so
/// wildcard expansion is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphUniverse(BTreeSet<GlyphName>);

impl GlyphUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<GlyphName>) -> bool {
        self.0.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlyphName> {
        self.0.iter()
    }

    /// All glyphs whose name starts with `prefix`, in sorted order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a GlyphName> + 'a {
        self.0
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |name| name.starts_with(prefix))
    }
}

impl<S: Into<GlyphName>> FromIterator<S> for GlyphUniverse {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Extend<GlyphName> for GlyphUniverse {
    fn extend<I: IntoIterator<Item = GlyphName>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_name_with_suffix() {
        let name = GlyphName::new("dollar");
        assert_eq!(name.with_suffix(".rvrn"), "dollar.rvrn");
    }

    #[test]
    fn universe_prefix_range_stops_at_first_mismatch() {
        let universe: GlyphUniverse =
            ["cent", "dollar", "dollar.small", "dollarsign", "e"].into_iter().collect();
        let matched: Vec<_> = universe.with_prefix("dollar").map(GlyphName::as_str).collect();
        assert_eq!(matched, ["dollar", "dollar.small", "dollarsign"]);
    }

    #[test]
    fn universe_prefix_with_no_match() {
        let universe: GlyphUniverse = ["a", "b"].into_iter().collect();
        assert_eq!(universe.with_prefix("z").count(), 0);
    }
}
