//! [`Document`] to Sketch text.

use std::{collections::HashMap, fmt::Write as _};

use indexmap::IndexMap;
use log::debug;

use super::parser::bare_label_value;
use crate::{
    avar2::Avar2Entry,
    condition::format_conditions,
    config::{MATRIX_MIN_OUTPUTS, VARIABLE_MIN_REPEATS},
    diagnostics::{Converted, Diagnostics},
    document::{AxisLabel, AxisSpec, Document, GlyphPattern, InstancesSpec, RuleSpec, Target},
    error::Result,
    glyph::{GlyphName, GlyphUniverse},
    labels::LabelResolver,
    number::format_number,
    pattern::compact_sources,
    tags::name_for_tag,
};

const INDENT: &str = "    ";
const LABEL_INDENT: &str = "        ";

/// Knobs for the Sketch writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Introduce avar2 variables and collapse instances to `auto` where
    /// that is lossless.
    pub optimize: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self { optimize: true }
    }
}

/// Render a document as Sketch text.
///
/// With a glyph universe, rule glyph lists are compacted into wildcards
/// where that selects exactly the same glyphs.
pub fn write(
    document: &Document,
    labels: &dyn LabelResolver,
    universe: Option<&GlyphUniverse>,
    options: WriterOptions,
) -> Result<Converted<String>> {
    let mut diagnostics = Diagnostics::new();
    let mut sections: Vec<String> = Vec::new();

    let mut header = String::new();
    if !document.family.is_empty() {
        writeln!(header, "family {}", document.family).ok();
    }
    if let Some(suffix) = &document.suffix {
        writeln!(header, "suffix {suffix}").ok();
    }
    if let Some(path) = &document.common_path {
        writeln!(header, "path {path}").ok();
    }
    sections.push(header);

    sections.push(write_axes(&document.axes, labels));
    sections.push(write_masters(document));
    sections.push(write_rules(document, universe, &mut diagnostics)?);

    let variables = if options.optimize {
        choose_variables(&document.avar2_mappings, &document.variables)
    } else {
        Variables::from_declared(&document.variables)
    };
    sections.push(variables.section());
    sections.push(write_avar2(document, &variables, options.optimize));
    sections.push(write_instances(document, options.optimize));

    let text = sections.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join("\n");
    Ok(Converted::new(text, diagnostics))
}

fn write_axes(axes: &[AxisSpec], labels: &dyn LabelResolver) -> String {
    let mut out = String::new();
    let mut hidden_run = None;
    for axis in axes {
        if hidden_run != Some(axis.hidden) {
            out.push_str(if axis.hidden { "axes hidden\n" } else { "axes\n" });
            hidden_run = Some(axis.hidden);
        }
        writeln!(out, "{INDENT}{}", axis_line(axis)).ok();
        for line in label_lines(axis, labels) {
            writeln!(out, "{LABEL_INDENT}{line}").ok();
        }
    }
    out
}

fn axis_line(axis: &AxisSpec) -> String {
    let identity = if name_for_tag(&axis.tag) == Some(axis.name.as_str()) || axis.name == axis.tag {
        axis.tag.clone()
    } else if axis.name.contains(char::is_whitespace) {
        format!("\"{}\" {}", axis.name, axis.tag)
    } else {
        format!("{} {}", axis.name, axis.tag)
    };

    let (minimum, default, maximum) = (axis.minimum, axis.default, axis.maximum);
    let range = if minimum == default && default == maximum {
        format_number(minimum)
    } else if minimum == default {
        format!("{}:{}", format_number(minimum), format_number(maximum))
    } else {
        format!("{}:{}:{}", format_number(minimum), format_number(default), format_number(maximum))
    };

    if !axis.discrete {
        return format!("{identity} {range}");
    }
    if axis.values == [0.0, 1.0] && default == 0.0 {
        return format!("{identity} discrete");
    }
    let mut from_range = vec![minimum, default, maximum];
    from_range.dedup();
    if axis.values == from_range {
        return format!("{identity} {range} discrete");
    }
    let list = axis.values.iter().map(|v| format_number(*v)).collect::<Vec<_>>().join(",");
    if axis.values.first() == Some(&default) {
        format!("{identity} {list} discrete")
    } else {
        format!("{identity} {list}:{} discrete", format_number(default))
    }
}

fn label_lines(axis: &AxisSpec, labels: &dyn LabelResolver) -> Vec<String> {
    enum Point<'a> {
        Label(&'a AxisLabel),
        Map(f64, f64),
    }

    let mut points: Vec<(f64, Point<'_>)> = axis
        .labels
        .iter()
        .map(|label| (label.user_value, Point::Label(label)))
        .chain(axis.map.iter().map(|p| (p.user, Point::Map(p.user, p.design))))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut position = 0;
    points
        .into_iter()
        .map(|(_, point)| match point {
            Point::Map(user, design) => format!("{} > {}", format_number(user), format_number(design)),
            Point::Label(label) => {
                let elidable = if label.elidable { " @elidable" } else { "" };
                let bare = label.design_value == label.user_value
                    && bare_label_value(axis, position, &label.name, labels) == Some(label.user_value);
                position += 1;
                if bare {
                    format!("{}{elidable}", label.name)
                } else if labels.resolve(&axis.tag, &label.name) == Some(label.user_value) {
                    format!("{} > {}{elidable}", label.name, format_number(label.design_value))
                } else {
                    format!(
                        "{} {} > {}{elidable}",
                        format_number(label.user_value),
                        label.name,
                        format_number(label.design_value)
                    )
                }
            }
        })
        .collect()
}

fn write_masters(document: &Document) -> String {
    if document.masters.is_empty() {
        return String::new();
    }
    let mut out = String::from("masters\n");
    for master in &document.masters {
        let name = match &master.path_override {
            Some(dir) => format!("{dir}/{}", master.name),
            None => master.name.clone(),
        };
        let values = document
            .axes
            .iter()
            .map(|axis| {
                let value = master.coordinates.get(&axis.tag).copied().unwrap_or(axis.user_to_design(axis.default));
                format_number(value)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let base = if master.is_base { " @base" } else { "" };
        writeln!(out, "{INDENT}{name} [{values}]{base}").ok();
    }
    out
}

fn write_rules(
    document: &Document,
    universe: Option<&GlyphUniverse>,
    diagnostics: &mut Diagnostics,
) -> Result<String> {
    if document.rules.is_empty() {
        return Ok(String::new());
    }
    let mut out = String::from("rules\n");
    for rule in &document.rules {
        let patterns = rule_patterns(rule, universe, diagnostics);
        let patterns = patterns.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
        let conditions = format_conditions(&rule.conditions, &document.axes)?;
        write!(out, "{INDENT}{patterns} > {} ({conditions})", rule.target).ok();
        if let Some(name) = rule.name.explicit() {
            write!(out, " \"{name}\"").ok();
        }
        out.push('\n');
    }
    Ok(out)
}

/// Literal suffix rules go through wildcard compaction; anything else is
/// written as declared.
fn rule_patterns(
    rule: &RuleSpec,
    universe: Option<&GlyphUniverse>,
    diagnostics: &mut Diagnostics,
) -> Vec<GlyphPattern> {
    let literals: Option<Vec<GlyphName>> = rule
        .substitution_patterns
        .iter()
        .map(|pattern| match pattern {
            GlyphPattern::Literal(name) => Some(name.clone()),
            GlyphPattern::Prefix(_) => None,
        })
        .collect();
    match (literals, &rule.target) {
        (Some(glyphs), Target::Suffix(_)) if glyphs.len() > 1 => {
            compact_sources(&rule.name.to_string(), &glyphs, &rule.target, universe, diagnostics)
        }
        _ => rule.substitution_patterns.clone(),
    }
}

/// The variables a document is written with, keyed by output axis and
/// value bits.
struct Variables {
    declared: IndexMap<String, f64>,
    by_output: HashMap<(String, u64), String>,
}

impl Variables {
    fn from_declared(variables: &IndexMap<String, f64>) -> Self {
        Self { declared: variables.clone(), by_output: HashMap::new() }
    }

    fn name_for(&self, axis: &str, value: f64) -> Option<&str> {
        self.by_output.get(&(axis.to_owned(), canonical_bits(value))).map(String::as_str)
    }

    fn section(&self) -> String {
        if self.declared.is_empty() {
            return String::new();
        }
        let mut out = String::from("avar2 vars\n");
        for (name, value) in &self.declared {
            writeln!(out, "{INDENT}${name} = {}", format_number(*value)).ok();
        }
        out
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 { 0.0_f64.to_bits() } else { value.to_bits() }
}

/// Turn values used at least [`VARIABLE_MIN_REPEATS`] times on one output
/// axis into variables named after that axis, reusing a declared name that
/// already holds the value.
fn choose_variables(entries: &[Avar2Entry], existing: &IndexMap<String, f64>) -> Variables {
    let mut counts: IndexMap<(&str, u64), usize> = IndexMap::new();
    for entry in entries {
        for (axis, value) in &entry.outputs {
            *counts.entry((axis.as_str(), canonical_bits(*value))).or_default() += 1;
        }
    }

    let mut variables = Variables::from_declared(existing);
    for ((axis, bits), count) in counts {
        if count < VARIABLE_MIN_REPEATS {
            continue;
        }
        let value = f64::from_bits(bits);
        let name = match existing.iter().find(|(_, v)| canonical_bits(**v) == bits) {
            Some((name, _)) => name.clone(),
            None => {
                let base = format!("{axis}_{}", format_number(value).replace('.', "_").replace('-', "m"));
                let mut name = base.clone();
                let mut n = 2;
                while variables.declared.contains_key(&name) {
                    name = format!("{base}_{n}");
                    n += 1;
                }
                debug!("avar2 variable ${name} = {} for {axis}", format_number(value));
                variables.declared.insert(name.clone(), value);
                name
            }
        };
        variables.by_output.insert((axis.to_owned(), bits), name);
    }
    variables
}

fn write_avar2(document: &Document, variables: &Variables, optimize: bool) -> String {
    let mut out = String::new();
    let entries = &document.avar2_mappings;
    let mut start = 0;
    while start < entries.len() {
        let axes = output_set(&entries[start]);
        let end = entries[start..]
            .iter()
            .position(|entry| output_set(entry) != axes)
            .map_or(entries.len(), |offset| start + offset);
        let run = &entries[start..end];
        if !out.is_empty() {
            out.push('\n');
        }
        if axes.len() >= MATRIX_MIN_OUTPUTS {
            out.push_str(&matrix_run(document, run, variables, optimize));
        } else {
            out.push_str("avar2\n");
            for entry in run {
                let outputs = entry
                    .outputs
                    .iter()
                    .map(|(axis, value)| format!("{axis}={}", output_value(axis, *value, variables)))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(out, "{INDENT}{} > {outputs}", entry_head(document, entry, optimize)).ok();
            }
        }
        start = end;
    }
    out
}

fn output_set(entry: &Avar2Entry) -> Vec<&str> {
    let mut axes = entry.output_axes();
    axes.sort_unstable();
    axes
}

fn output_value(axis: &str, value: f64, variables: &Variables) -> String {
    match variables.name_for(axis, value) {
        Some(name) => format!("${name}"),
        None => format_number(value),
    }
}

/// `"name" [axis=value, ...]`, using axis labels for inputs when optimizing.
fn entry_head(document: &Document, entry: &Avar2Entry, optimize: bool) -> String {
    let inputs = entry
        .inputs
        .iter()
        .map(|(tag, value)| {
            let label = optimize
                .then(|| document.axis(tag))
                .flatten()
                .and_then(|axis| input_label(axis, *value));
            match label {
                Some(label) => format!("{tag}={label}"),
                None => format!("{tag}={}", format_number(*value)),
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    match &entry.name {
        Some(name) => format!("\"{name}\" [{inputs}]"),
        None => format!("[{inputs}]"),
    }
}

/// The single label of `axis` at design value `value`, when it reads back.
fn input_label(axis: &AxisSpec, value: f64) -> Option<&str> {
    let mut matching = axis.labels.iter().filter(|label| label.design_value == value);
    let label = matching.next()?;
    let plain = !label.name.is_empty()
        && !label.name.starts_with('$')
        && label.name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        && label.name.parse::<f64>().is_err();
    (matching.next().is_none() && plain).then_some(label.name.as_str())
}

fn matrix_run(document: &Document, run: &[Avar2Entry], variables: &Variables, optimize: bool) -> String {
    let columns: Vec<&str> = run[0].output_axes();
    let rows: Vec<(String, Vec<String>)> = run
        .iter()
        .map(|entry| {
            let values = columns
                .iter()
                .map(|axis| entry.outputs.get(*axis).map_or_else(String::new, |v| output_value(axis, *v, variables)))
                .collect();
            (entry_head(document, entry, optimize), values)
        })
        .collect();

    let head_width = rows.iter().map(|(head, _)| head.len()).chain([7]).max().unwrap_or(7);
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, axis)| rows.iter().map(|(_, values)| values[i].len()).chain([axis.len()]).max().unwrap_or(0))
        .collect();

    let mut out = String::from("avar2 matrix\n");
    let cells = |first: &str, values: Vec<&str>| {
        let mut line = format!("{INDENT}{first:<head_width$}");
        for (value, width) in values.into_iter().zip(&widths) {
            write!(line, "  {value:<width$}").ok();
        }
        line.trim_end().to_owned()
    };
    writeln!(out, "{}", cells("outputs", columns.clone())).ok();
    for (head, values) in &rows {
        writeln!(out, "{}", cells(head, values.iter().map(String::as_str).collect())).ok();
    }
    out
}

fn write_instances(document: &Document, optimize: bool) -> String {
    match &document.instances {
        InstancesSpec::Auto => "instances auto\n".to_owned(),
        InstancesSpec::Explicit(instances) if instances.is_empty() => String::new(),
        InstancesSpec::Explicit(instances) if optimize && *instances == document.auto_instances() => {
            "instances auto\n".to_owned()
        }
        InstancesSpec::Explicit(instances) => {
            let mut out = String::from("instances\n");
            for instance in instances {
                let values = document
                    .axes
                    .iter()
                    .map(|axis| {
                        let value = instance
                            .coordinates
                            .get(&axis.tag)
                            .copied()
                            .unwrap_or(axis.user_to_design(axis.default));
                        format_number(value)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(out, "{INDENT}{} [{values}]", instance.name).ok();
            }
            out
        }
    }
}
