//! User label data loaded from YAML.
//!
//! ```yaml
//! wght:
//!   labels:
//!     Book: 450
//!   aliases:
//!     Buch: 450
//! width:
//!   labels:
//!     Compressed: 50
//! ```
//!
//! Axes are keyed by tag or registered name. Entries are layered over the
//! built-in table, replacing labels of the same name.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use dssketch::{LabelTable, tags::tag_for_name};
use log::debug;
use serde::Deserialize;

use crate::io::DocumentFile;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AxisLabelData {
    #[serde(default)]
    labels: BTreeMap<String, f64>,
    #[serde(default)]
    aliases: BTreeMap<String, f64>,
}

/// Parse label YAML into a table of its own entries.
pub fn parse_labels(text: &str) -> Result<LabelTable> {
    let data: BTreeMap<String, AxisLabelData> =
        serde_yaml::from_str(text).context("Invalid label data")?;
    let mut table = LabelTable::new();
    for (axis, entries) in &data {
        let tag = tag_for_name(axis).unwrap_or(axis.as_str());
        for (name, value) in &entries.labels {
            table.insert(tag, name, *value);
        }
        for (name, value) in &entries.aliases {
            table.insert_alias(tag, name, *value);
        }
    }
    Ok(table)
}

/// The built-in labels, with the file at `path` layered on top.
pub fn load_labels(path: Option<&Path>) -> Result<LabelTable> {
    let mut table = LabelTable::standard();
    if let Some(path) = path {
        let text = DocumentFile::new(path).read()?;
        let user = parse_labels(&text).with_context(|| format!("Failed to load labels from {}", path.display()))?;
        debug!("layering labels from {}", path.display());
        table.overlay(&user);
    }
    Ok(table)
}
