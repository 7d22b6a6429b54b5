//! avar2 mapping entries and the overlay merge.

use std::fmt;

use indexmap::{IndexMap, map::Entry};
use log::debug;

use crate::{
    diagnostics::{Diagnostics, Warning},
    number::format_number,
};

/// One multi-axis mapping: when the inputs hold, the outputs are set.
#[derive(Debug, Clone, PartialEq)]
pub struct Avar2Entry {
    pub name: Option<String>,
    /// Input location as written, in declaration order.
    pub inputs: Vec<(String, f64)>,
    pub outputs: IndexMap<String, f64>,
}

impl Avar2Entry {
    pub fn new(inputs: Vec<(String, f64)>, outputs: IndexMap<String, f64>) -> Self {
        Self { name: None, inputs, outputs }
    }

    pub fn signature(&self) -> InputSignature {
        InputSignature::new(&self.inputs)
    }

    /// Output axis tags in order.
    pub fn output_axes(&self) -> Vec<&str> {
        self.outputs.keys().map(String::as_str).collect()
    }
}

/// The canonical identity of an entry's input location: sorted by tag, with
/// `-0.0` folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputSignature(Vec<(String, u64)>);

impl InputSignature {
    pub fn new(inputs: &[(String, f64)]) -> Self {
        let mut canonical: Vec<(String, u64)> = inputs
            .iter()
            .map(|(tag, value)| {
                let value = if *value == 0.0 { 0.0 } else { *value };
                (tag.clone(), value.to_bits())
            })
            .collect();
        canonical.sort();
        Self(canonical)
    }
}

impl fmt::Display for InputSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(tag, bits)| format!("{tag}={}", format_number(f64::from_bits(*bits))))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Merge entries sharing an input signature into one.
///
/// Outputs are overlaid key by key with the later value winning. Each
/// overwritten key whose value changes records a
/// [`Warning::MergeConflict`]. Signatures keep the order they were first
/// seen in; an entry keeps the first name it was given.
pub fn merge_entries(entries: Vec<Avar2Entry>, diagnostics: &mut Diagnostics) -> Vec<Avar2Entry> {
    let total = entries.len();
    let mut merged: IndexMap<InputSignature, Avar2Entry> = IndexMap::new();

    for entry in entries {
        let mut slot = match merged.entry(entry.signature()) {
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                continue;
            }
            Entry::Occupied(occupied) => occupied,
        };
        let signature = slot.key().to_string();
        let existing = slot.get_mut();
        for (axis, value) in entry.outputs {
            match existing.outputs.insert(axis.clone(), value) {
                Some(old) if old != value => diagnostics.push(Warning::MergeConflict {
                    axis,
                    signature: signature.clone(),
                    old_value: old,
                    new_value: value,
                }),
                _ => {}
            }
        }
        if existing.name.is_none() {
            existing.name = entry.name;
        }
    }

    if merged.len() < total {
        debug!("merged {total} avar2 entries into {}", merged.len());
    }
    merged.into_values().collect()
}
