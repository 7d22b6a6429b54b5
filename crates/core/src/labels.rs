//! Label resolution: human-readable axis labels to user-space values.
//!
//! The converter never looks labels up on disk; it is handed a
//! [`LabelResolver`] and calls it once per axis/label pair.

use indexmap::IndexMap;

/// Resolves axis labels (`Regular`, `Condensed`, `Italic`) to user values.
pub trait LabelResolver {
    /// The user-space value of `label` on the axis tagged `axis_tag`.
    fn resolve(&self, axis_tag: &str, label: &str) -> Option<f64>;

    /// The canonical label for a user-space value.
    fn unresolve(&self, axis_tag: &str, value: f64) -> Option<String>;

    /// The closest known label to a misspelled one, if any is close enough.
    fn suggest(&self, axis_tag: &str, unknown: &str) -> Option<String>;
}

/// Maximum edit distance for a suggestion to be offered.
const MAX_SUGGESTION_DISTANCE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
struct LabelEntry {
    name: String,
    value: f64,
    alias: bool,
}

/// An in-memory label table keyed by axis tag.
///
/// [`LabelTable::standard`] carries the registered weight, width, italic and
/// slant names. Callers layer their own data on top with
/// [`insert`](Self::insert); a later insert for the same label wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTable {
    axes: IndexMap<String, Vec<LabelEntry>>,
}

const WEIGHT: &[(&str, f64)] = &[
    ("Thin", 100.0),
    ("ExtraLight", 200.0),
    ("Light", 300.0),
    ("Regular", 400.0),
    ("Medium", 500.0),
    ("SemiBold", 600.0),
    ("Bold", 700.0),
    ("ExtraBold", 800.0),
    ("Black", 900.0),
    ("ExtraBlack", 1000.0),
];

const WEIGHT_ALIASES: &[(&str, f64)] = &[
    ("Hairline", 100.0),
    ("UltraLight", 200.0),
    ("Book", 400.0),
    ("Normal", 400.0),
    ("DemiBold", 600.0),
    ("UltraBold", 800.0),
    ("Heavy", 900.0),
];

const WIDTH: &[(&str, f64)] = &[
    ("UltraCondensed", 50.0),
    ("ExtraCondensed", 62.5),
    ("Condensed", 75.0),
    ("SemiCondensed", 87.5),
    ("Normal", 100.0),
    ("SemiExpanded", 112.5),
    ("Expanded", 125.0),
    ("ExtraExpanded", 150.0),
    ("UltraExpanded", 200.0),
];

const WIDTH_ALIASES: &[(&str, f64)] = &[("Compressed", 50.0), ("Narrow", 75.0), ("Wide", 125.0)];

const ITALIC: &[(&str, f64)] = &[("Upright", 0.0), ("Italic", 1.0)];
const ITALIC_ALIASES: &[(&str, f64)] = &[("Roman", 0.0), ("Normal", 0.0)];

const SLANT: &[(&str, f64)] = &[("Upright", 0.0), ("Slanted", 1.0)];
const SLANT_ALIASES: &[(&str, f64)] = &[("Normal", 0.0), ("Oblique", 1.0)];

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table of registered axis labels.
    pub fn standard() -> Self {
        let mut table = Self::new();
        for (tag, names, aliases) in [
            ("wght", WEIGHT, WEIGHT_ALIASES),
            ("wdth", WIDTH, WIDTH_ALIASES),
            ("ital", ITALIC, ITALIC_ALIASES),
            ("slnt", SLANT, SLANT_ALIASES),
        ] {
            for (name, value) in names {
                table.insert(tag, name, *value);
            }
            for (name, value) in aliases {
                table.insert_alias(tag, name, *value);
            }
        }
        table
    }

    /// Add or replace a canonical label.
    pub fn insert(&mut self, axis_tag: &str, name: &str, value: f64) {
        self.upsert(axis_tag, name, value, false);
    }

    /// Add or replace an alias: it resolves, but is never chosen by
    /// [`LabelResolver::unresolve`].
    pub fn insert_alias(&mut self, axis_tag: &str, name: &str, value: f64) {
        self.upsert(axis_tag, name, value, true);
    }

    fn upsert(&mut self, axis_tag: &str, name: &str, value: f64, alias: bool) {
        let entries = self.axes.entry(axis_tag.to_owned()).or_default();
        let entry = LabelEntry { name: name.to_owned(), value, alias };
        match entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    /// Merge `other` on top of this table.
    pub fn overlay(&mut self, other: &LabelTable) {
        for (tag, entries) in &other.axes {
            for entry in entries {
                self.upsert(tag, &entry.name, entry.value, entry.alias);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.axes.values().all(Vec::is_empty)
    }

    fn entries(&self, axis_tag: &str) -> &[LabelEntry] {
        self.axes.get(axis_tag).map(Vec::as_slice).unwrap_or_default()
    }
}

impl LabelResolver for LabelTable {
    fn resolve(&self, axis_tag: &str, label: &str) -> Option<f64> {
        let entries = self.entries(axis_tag);
        entries
            .iter()
            .find(|e| e.name == label)
            .or_else(|| entries.iter().find(|e| e.name.eq_ignore_ascii_case(label)))
            .map(|e| e.value)
    }

    fn unresolve(&self, axis_tag: &str, value: f64) -> Option<String> {
        self.entries(axis_tag)
            .iter()
            .find(|e| !e.alias && e.value == value)
            .map(|e| e.name.clone())
    }

    fn suggest(&self, axis_tag: &str, unknown: &str) -> Option<String> {
        let unknown = unknown.to_ascii_lowercase();
        self.entries(axis_tag)
            .iter()
            .map(|e| (levenshtein(&e.name.to_ascii_lowercase(), &unknown), e))
            .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, e)| e.name.clone())
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
