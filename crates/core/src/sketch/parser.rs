//! Sketch text to [`Document`].
//!
//! Parsing runs in two passes. The first walks the lines and builds the
//! document with avar2 values left raw (numbers, `$variables`, labels) while
//! collecting every `avar2 vars` binding. The second substitutes the raw
//! values, so a variable may be used before the line that defines it, and
//! then overlays avar2 entries that share an input location.

use indexmap::IndexMap;
use log::debug;

use super::lexer::{Line, leading_quoted, lines, trailing_quoted, unquote, words};
use crate::{
    avar2::{Avar2Entry, merge_entries},
    condition::parse_conditions,
    diagnostics::{Converted, Diagnostics},
    document::{
        AxisLabel, AxisSpec, Document, GlyphPattern, InstanceSpec, InstancesSpec, MapPoint,
        MasterSpec, RuleName, RuleSpec, Target, find_axis,
    },
    error::{Error, Result},
    labels::LabelResolver,
    number::{format_number, parse_number},
    tags::{infer_tag, name_for_tag, tag_for_name},
};

const ELIDABLE: &str = "@elidable";
const BASE: &str = "@base";

/// Parse Sketch text into a validated document.
pub fn parse(source: &str, labels: &dyn LabelResolver) -> Result<Converted<Document>> {
    let mut parser = Parser::new(labels);
    for line in lines(source) {
        parser.line(line)?;
    }
    parser.finish()
}

/// An avar2 value before variable substitution.
#[derive(Debug, Clone, PartialEq)]
enum RawValue {
    Number(f64),
    Variable { name: String, line: usize },
}

/// An avar2 input value; inputs may also name an axis label.
#[derive(Debug, Clone, PartialEq)]
enum RawInput {
    Value(RawValue),
    Label(String),
}

#[derive(Debug, Clone, PartialEq)]
struct RawAvar2Entry {
    name: Option<String>,
    line: usize,
    /// `(axis reference, value)` pairs; references are tags or names.
    inputs: Vec<(String, RawInput)>,
    outputs: Vec<(String, RawValue)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Axes { hidden: bool },
    Masters,
    Rules,
    Vars,
    Avar2,
    Matrix,
    Instances,
}

/// The axis whose label lines are being read.
#[derive(Debug, Clone, Copy)]
struct OpenAxis {
    index: usize,
    indent: usize,
    line: usize,
}

#[derive(Debug, Default)]
struct Matrix {
    outputs: Option<Vec<String>>,
    rows: usize,
}

struct Parser<'a> {
    labels: &'a dyn LabelResolver,
    document: Document,
    /// `avar2 vars` bindings with the line that defined them.
    variables: IndexMap<String, (f64, usize)>,
    avar2: Vec<RawAvar2Entry>,
    section: Option<Section>,
    /// Indentation of the current section header; deeper lines are content.
    section_indent: usize,
    open_axis: Option<OpenAxis>,
    matrix: Matrix,
    unnamed_rules: usize,
}

impl<'a> Parser<'a> {
    fn new(labels: &'a dyn LabelResolver) -> Self {
        Self {
            labels,
            document: Document::new(""),
            variables: IndexMap::new(),
            avar2: Vec::new(),
            section: None,
            section_indent: 0,
            open_axis: None,
            matrix: Matrix::default(),
            unnamed_rules: 0,
        }
    }

    fn line(&mut self, line: Line<'_>) -> Result<()> {
        if self.keyword(line)? {
            return Ok(());
        }
        match self.section {
            None => Err(Error::parse(
                line.number,
                format!("'{}' is outside any section", line.text),
            )),
            Some(Section::Axes { hidden }) => self.axes_line(line, hidden),
            Some(Section::Masters) => self.master_line(line),
            Some(Section::Rules) => self.rule_line(line),
            Some(Section::Vars) => self.variable_line(line),
            Some(Section::Avar2) => {
                let entry = parse_avar2_entry(line.text, line.number)?;
                self.avar2.push(entry);
                Ok(())
            }
            Some(Section::Matrix) => self.matrix_line(line),
            Some(Section::Instances) => self.instance_line(line),
        }
    }

    /// Handle a section keyword or a top-level statement. Returns whether
    /// the line was one.
    fn keyword(&mut self, line: Line<'_>) -> Result<bool> {
        if self.section.is_some() && line.indent > self.section_indent {
            return Ok(false);
        }
        let (head, rest) = match line.text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line.text, ""),
        };
        let section = match (head, rest) {
            ("family", name) if !name.is_empty() => {
                self.document.family = unquote(name).to_owned();
                None
            }
            ("suffix", suffix) if !suffix.is_empty() => {
                self.document.suffix = Some(unquote(suffix).to_owned());
                None
            }
            ("path", path) if !path.is_empty() => {
                self.document.common_path = Some(unquote(path).trim_end_matches('/').to_owned());
                None
            }
            ("axes", "") => Some(Section::Axes { hidden: false }),
            ("axes", "hidden") => Some(Section::Axes { hidden: true }),
            ("masters" | "sources", "") => Some(Section::Masters),
            ("rules", "") => Some(Section::Rules),
            ("avar2", "") => Some(Section::Avar2),
            ("avar2", "vars") => Some(Section::Vars),
            ("avar2", "matrix") => {
                self.matrix = Matrix::default();
                Some(Section::Matrix)
            }
            ("avar2", entry) => {
                self.close_axis()?;
                self.avar2.push(parse_avar2_entry(entry, line.number)?);
                self.section = Some(Section::Avar2);
                self.section_indent = line.indent;
                return Ok(true);
            }
            ("instances", "") => Some(Section::Instances),
            ("instances", "auto") => {
                self.document.instances = InstancesSpec::Auto;
                None
            }
            _ => return Ok(false),
        };
        self.close_axis()?;
        self.section = section;
        self.section_indent = line.indent;
        Ok(true)
    }

    /// Check the invariants of the axis whose block just ended.
    fn close_axis(&mut self) -> Result<()> {
        let Some(open) = self.open_axis.take() else {
            return Ok(());
        };
        let axis = &self.document.axes[open.index];
        axis.check()
            .map_err(|message| Error::parse(open.line, format!("axis '{}': {message}", axis.tag)))
    }

    fn axes_line(&mut self, line: Line<'_>, hidden: bool) -> Result<()> {
        if let Some(open) = self.open_axis
            && line.indent > open.indent
        {
            return self.label_line(line, open.index, hidden);
        }
        self.close_axis()?;

        let mut axis = parse_axis(line)?;
        axis.hidden = hidden;
        if self.document.axis(&axis.tag).is_some() {
            return Err(Error::DuplicateAxisTag { tag: axis.tag });
        }
        debug!("line {}: axis {} ({})", line.number, axis.tag, axis.name);
        self.open_axis =
            Some(OpenAxis { index: self.document.axes.len(), indent: line.indent, line: line.number });
        self.document.axes.push(axis);
        Ok(())
    }

    fn label_line(&mut self, line: Line<'_>, index: usize, hidden: bool) -> Result<()> {
        let number = line.number;
        let hidden_label = || Error::parse(number, "hidden axes cannot have labels");
        let elidable = line.text.contains(ELIDABLE);
        let text = line.text.replace(ELIDABLE, "");
        let axis = &self.document.axes[index];

        let Some((left, right)) = text.split_once('>') else {
            if hidden {
                return Err(hidden_label());
            }
            let label = words(&text, number)?.join(" ");
            let user = bare_label_value(axis, axis.labels.len(), &label, self.labels)
                .ok_or_else(|| bare_label_error(axis, &label, number))?;
            self.document.axes[index].labels.push(AxisLabel {
                name: label,
                user_value: user,
                design_value: user,
                elidable,
            });
            return Ok(());
        };

        let design = parse_number(right).ok_or_else(|| {
            Error::parse(number, format!("expected a design value after '>', found '{}'", right.trim()))
        })?;
        let left = words(left, number)?;
        let user = left.first().and_then(|word| parse_number(word));
        let axis = &mut self.document.axes[index];
        match (user, left.as_slice()) {
            (_, []) => return Err(Error::parse(number, "missing label before '>'")),
            (Some(user), [_]) => axis.map.push(MapPoint { user, design }),
            (_, _) if hidden => return Err(hidden_label()),
            (Some(user), [_, rest @ ..]) => axis.labels.push(AxisLabel {
                name: rest.join(" "),
                user_value: user,
                design_value: design,
                elidable,
            }),
            (None, words) => {
                let name = words.join(" ");
                let user = self
                    .labels
                    .resolve(&axis.tag, &name)
                    .ok_or_else(|| unknown_label_error(axis, &name, self.labels, number))?;
                axis.labels.push(AxisLabel { name, user_value: user, design_value: design, elidable });
            }
        }
        Ok(())
    }

    fn master_line(&mut self, line: Line<'_>) -> Result<()> {
        let number = line.number;
        let is_base = line.text.contains(BASE);
        let text = line.text.replace(BASE, "");
        let text = text.trim();

        let (name, values) = match text.find('[') {
            Some(open) => {
                let close = text.rfind(']').filter(|close| *close > open).ok_or_else(|| {
                    Error::parse(number, format!("missing ']' in master '{text}'"))
                })?;
                let values = text[open + 1..close]
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .collect::<Vec<_>>();
                (text[..open].trim(), values)
            }
            None => {
                let mut parts = text.split_whitespace();
                let name = parts.next().unwrap_or_default();
                (name, parts.collect())
            }
        };
        if name.is_empty() {
            return Err(Error::parse(number, "missing master name"));
        }

        let axes = &self.document.axes;
        if values.len() != axes.len() {
            return Err(Error::parse(
                number,
                format!(
                    "master '{name}' has {} coordinates but {} axes are declared",
                    values.len(),
                    axes.len()
                ),
            ));
        }
        let coordinates = axes
            .iter()
            .zip(&values)
            .map(|(axis, value)| {
                parse_number(value)
                    .map(|value| (axis.tag.clone(), value))
                    .ok_or_else(|| Error::parse(number, format!("expected a number, found '{value}'")))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        let name = unquote(name);
        let (path_override, name) = match name.rsplit_once('/') {
            Some((dir, name)) => (Some(dir.to_owned()), name),
            None => (None, name),
        };
        let name = name.strip_suffix(".ufo").unwrap_or(name);

        if is_base && let Some(first) = self.document.base_master() {
            return Err(Error::MultipleBaseMaster { first: first.name.clone(), second: name.to_owned() });
        }
        self.document.masters.push(MasterSpec {
            name: name.to_owned(),
            coordinates,
            path_override,
            is_base,
        });
        Ok(())
    }

    fn rule_line(&mut self, line: Line<'_>) -> Result<()> {
        let number = line.number;
        let syntax = || {
            Error::parse(
                number,
                format!("cannot parse rule '{}'; expected 'glyphs > target (condition) \"name\"'", line.text),
            )
        };
        let (body, name) = trailing_quoted(line.text, number)?;
        let (sources, rest) = body.split_once('>').ok_or_else(syntax)?;
        let open = rest.find('(').ok_or_else(syntax)?;
        let close = rest.rfind(')').filter(|close| *close > open).ok_or_else(syntax)?;

        let substitution_patterns = sources
            .split_whitespace()
            .map(|token| GlyphPattern::parse(token).map_err(|message| Error::parse(number, message)))
            .collect::<Result<Vec<_>>>()?;
        if substitution_patterns.is_empty() {
            return Err(syntax());
        }

        let target = match rest[..open].split_whitespace().collect::<Vec<_>>().as_slice() {
            [target] if !target.contains('*') => Target::parse(target),
            [target] => {
                return Err(Error::parse(number, format!("target '{target}' cannot be a wildcard")));
            }
            _ => return Err(syntax()),
        };

        let conditions = parse_conditions(&rest[open + 1..close], &self.document.axes, number)?;

        let tail = rest[close + 1..].trim();
        if !tail.is_empty() {
            return Err(Error::parse(number, format!("rule names must be quoted, found '{tail}'")));
        }
        let name = match name {
            Some(name) => RuleName::Explicit(name),
            None => {
                self.unnamed_rules += 1;
                RuleName::Derived(self.unnamed_rules)
            }
        };

        self.document.rules.push(RuleSpec { name, substitution_patterns, target, conditions });
        Ok(())
    }

    fn variable_line(&mut self, line: Line<'_>) -> Result<()> {
        let number = line.number;
        let (name, value) = line
            .text
            .split_once('=')
            .ok_or_else(|| Error::parse(number, format!("expected '$name = value', found '{}'", line.text)))?;
        let name = variable_name(name.trim())
            .ok_or_else(|| Error::parse(number, format!("invalid variable name '{}'", name.trim())))?;
        let value = parse_number(value)
            .ok_or_else(|| Error::parse(number, format!("expected a number, found '{}'", value.trim())))?;
        if let Some((_, first)) = self.variables.get(name) {
            return Err(Error::parse(number, format!("variable '${name}' is already defined on line {first}")));
        }
        self.variables.insert(name.to_owned(), (value, number));
        Ok(())
    }

    fn matrix_line(&mut self, line: Line<'_>) -> Result<()> {
        let number = line.number;
        if let Some(columns) = line.text.strip_prefix("outputs") {
            let columns: Vec<String> = columns.split_whitespace().map(str::to_owned).collect();
            if columns.is_empty() {
                return Err(Error::parse(number, "matrix 'outputs' header lists no axes"));
            }
            self.matrix = Matrix { outputs: Some(columns), rows: 0 };
            return Ok(());
        }

        let Some(columns) = &self.matrix.outputs else {
            return Err(Error::parse(number, "matrix row before the 'outputs' header"));
        };
        self.matrix.rows += 1;

        let (name, rest) = leading_quoted(line.text, number)?;
        let (inputs, values) = bracketed_signature(rest, number)?;
        let values: Vec<&str> = values.split_whitespace().collect();
        if values.len() != columns.len() {
            return Err(Error::MatrixColumnMismatch {
                line: number,
                row_index: self.matrix.rows,
                expected: columns.len(),
                actual: values.len(),
            });
        }
        let outputs = columns
            .iter()
            .zip(values)
            .map(|(column, value)| Ok((column.clone(), raw_value(value, number)?)))
            .collect::<Result<Vec<_>>>()?;
        self.avar2.push(RawAvar2Entry { name, line: number, inputs, outputs });
        Ok(())
    }

    fn instance_line(&mut self, line: Line<'_>) -> Result<()> {
        let number = line.number;
        if line.text == "auto" {
            self.document.instances = InstancesSpec::Auto;
            return Ok(());
        }
        let (name, values) = match line.text.find('[') {
            Some(open) => {
                let close = line.text.rfind(']').filter(|close| *close > open).ok_or_else(|| {
                    Error::parse(number, format!("missing ']' in instance '{}'", line.text))
                })?;
                (line.text[..open].trim(), &line.text[open + 1..close])
            }
            None => return Err(Error::parse(number, format!("instance '{}' has no coordinates", line.text))),
        };
        let values: Vec<&str> = values.split(',').map(str::trim).filter(|v| !v.is_empty()).collect();
        let axes = &self.document.axes;
        if values.len() != axes.len() {
            return Err(Error::parse(
                number,
                format!(
                    "instance '{name}' has {} coordinates but {} axes are declared",
                    values.len(),
                    axes.len()
                ),
            ));
        }
        let coordinates = axes
            .iter()
            .zip(values)
            .map(|(axis, value)| {
                parse_number(value)
                    .map(|value| (axis.tag.clone(), value))
                    .ok_or_else(|| Error::parse(number, format!("expected a number, found '{value}'")))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        let instance = InstanceSpec { name: unquote(name).to_owned(), coordinates };
        match &mut self.document.instances {
            InstancesSpec::Explicit(instances) => instances.push(instance),
            InstancesSpec::Auto => {
                return Err(Error::parse(number, "explicit instances cannot be combined with 'instances auto'"));
            }
        }
        Ok(())
    }

    /// Second pass: substitute variables and labels, merge avar2 entries.
    fn finish(mut self) -> Result<Converted<Document>> {
        self.close_axis()?;
        let mut diagnostics = Diagnostics::new();

        let entries = self
            .avar2
            .iter()
            .map(|raw| self.resolve_entry(raw))
            .collect::<Result<Vec<_>>>()?;
        self.document.avar2_mappings = merge_entries(entries, &mut diagnostics);
        self.document.variables =
            self.variables.into_iter().map(|(name, (value, _))| (name, value)).collect();

        self.document.validate()?;
        Ok(Converted::new(self.document, diagnostics))
    }

    fn resolve_entry(&self, raw: &RawAvar2Entry) -> Result<Avar2Entry> {
        let axes = &self.document.axes;
        let axis = |reference: &str| {
            find_axis(axes, reference)
                .ok_or_else(|| Error::AxisNotFound { axis: reference.to_owned(), line: Some(raw.line) })
        };

        let inputs = raw
            .inputs
            .iter()
            .map(|(reference, input)| {
                let axis = axis(reference)?;
                let value = match input {
                    RawInput::Value(value) => self.resolve_value(value)?,
                    RawInput::Label(label) => self.resolve_input_label(axis, label, raw.line)?,
                };
                Ok((axis.tag.clone(), value))
            })
            .collect::<Result<Vec<_>>>()?;
        let outputs = raw
            .outputs
            .iter()
            .map(|(reference, value)| Ok((axis(reference)?.tag.clone(), self.resolve_value(value)?)))
            .collect::<Result<IndexMap<_, _>>>()?;

        Ok(Avar2Entry { name: raw.name.clone(), inputs, outputs })
    }

    fn resolve_value(&self, value: &RawValue) -> Result<f64> {
        match value {
            RawValue::Number(number) => Ok(*number),
            RawValue::Variable { name, line } => self
                .variables
                .get(name)
                .map(|(value, _)| *value)
                .ok_or_else(|| Error::UndefinedVariable { name: name.clone(), line: *line }),
        }
    }

    /// A label in an avar2 input: the axis's own labels give the design
    /// value directly; otherwise the resolver's user value is mapped.
    fn resolve_input_label(&self, axis: &AxisSpec, label: &str, line: usize) -> Result<f64> {
        if let Some(own) = axis.label(label) {
            return Ok(own.design_value);
        }
        self.labels
            .resolve(&axis.tag, label)
            .map(|user| axis.user_to_design(user))
            .ok_or_else(|| unknown_label_error(axis, label, self.labels, line))
    }
}

/// Parse one axis line.
fn parse_axis(line: Line<'_>) -> Result<AxisSpec> {
    let number = line.number;
    let mut words = words(line.text, number)?;
    let last = words.pop().ok_or_else(|| Error::parse(number, "empty axis line"))?;

    enum Shape {
        Continuous(f64, f64, f64),
        Discrete(Vec<f64>, f64),
    }

    let shape = if last == "discrete" || last == "binary" {
        match words.last().map(|word| discrete_values(word, number)).transpose()?.flatten() {
            Some((values, default)) => {
                words.pop();
                Shape::Discrete(values, default)
            }
            None => Shape::Discrete(vec![0.0, 1.0], 0.0),
        }
    } else {
        let (minimum, default, maximum) = parse_range(&last).ok_or_else(|| {
            Error::parse(number, format!("expected an axis range like 100:400:900, found '{last}'"))
        })?;
        Shape::Continuous(minimum, default, maximum)
    };

    let (tag, name) = match words.as_slice() {
        [word] => axis_identity(word),
        [name, tag] => (tag.clone(), name.clone()),
        [] => return Err(Error::parse(number, "missing axis tag")),
        _ => return Err(Error::parse(number, format!("cannot parse axis '{}'", line.text))),
    };

    Ok(match shape {
        Shape::Discrete(values, default) => AxisSpec::discrete(tag, name, values, default),
        Shape::Continuous(minimum, default, maximum) => AxisSpec::new(tag, name, minimum, default, maximum),
    })
}

/// The value set of a discrete axis: a range, or a `0,1,2,3` list with an
/// optional `:default` (the lowest value otherwise). `Ok(None)` when `word`
/// is neither, so the axis falls back to `0:0:1`.
fn discrete_values(word: &str, line: usize) -> Result<Option<(Vec<f64>, f64)>> {
    if !word.contains(',') {
        return Ok(parse_range(word).map(|(minimum, default, maximum)| (vec![minimum, default, maximum], default)));
    }
    let (list, default) = match word.split_once(':') {
        Some((list, default)) => (list, Some(default)),
        None => (word, None),
    };
    let values = list
        .split(',')
        .map(|value| parse_number(value.trim()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::parse(line, format!("expected a list of numbers like 0,1,2,3, found '{list}'")))?;
    let default = match default {
        Some(text) => parse_number(text)
            .ok_or_else(|| Error::parse(line, format!("expected a default value, found '{text}'")))?,
        None => values.iter().copied().fold(f64::INFINITY, f64::min),
    };
    if !values.contains(&default) {
        return Err(Error::parse(
            line,
            format!("default {} is not one of the discrete values '{list}'", format_number(default)),
        ));
    }
    Ok(Some((values, default)))
}

/// Tag and name for an axis written with a single word: a registered tag,
/// a registered name, a four-character custom tag, or a legacy name.
fn axis_identity(word: &str) -> (String, String) {
    if let Some(name) = name_for_tag(word) {
        (word.to_owned(), name.to_owned())
    } else if let Some(tag) = tag_for_name(word) {
        (tag.to_owned(), word.to_owned())
    } else if word.len() == 4 && word.chars().all(|c| c.is_ascii_alphanumeric()) {
        (word.to_owned(), word.to_owned())
    } else {
        (infer_tag(word), word.to_owned())
    }
}

/// `min:default:max`, `min:max` or a single fixed value.
fn parse_range(word: &str) -> Option<(f64, f64, f64)> {
    let values = word.split(':').map(parse_number).collect::<Option<Vec<_>>>()?;
    match values.as_slice() {
        [value] => Some((*value, *value, *value)),
        [minimum, maximum] => Some((*minimum, *minimum, *maximum)),
        [minimum, default, maximum] => Some((*minimum, *default, *maximum)),
        _ => None,
    }
}

/// The user value a bare label at `position` gets on a discrete axis: the
/// resolver's value when it is one of the axis values, else the value at
/// that position.
pub(crate) fn bare_label_value(
    axis: &AxisSpec,
    position: usize,
    label: &str,
    labels: &dyn LabelResolver,
) -> Option<f64> {
    if !axis.discrete {
        return None;
    }
    labels
        .resolve(&axis.tag, label)
        .filter(|value| axis.values.contains(value))
        .or_else(|| axis.values.get(position).copied())
}

fn bare_label_error(axis: &AxisSpec, label: &str, line: usize) -> Error {
    if axis.discrete {
        Error::parse(
            line,
            format!("axis '{}' has {} values but more labels", axis.tag, axis.values.len()),
        )
    } else {
        Error::parse(line, format!("label '{label}' needs a design value: '{label} > value'"))
    }
}

fn unknown_label_error(axis: &AxisSpec, label: &str, labels: &dyn LabelResolver, line: usize) -> Error {
    let message = match labels.suggest(&axis.tag, label) {
        Some(suggestion) => {
            format!("unknown {} label '{label}'; did you mean '{suggestion}'?", axis.name)
        }
        None => format!(
            "unknown {} label '{label}'; write its user value explicitly, e.g. '400 {label} > 400'",
            axis.name
        ),
    };
    Error::parse(line, message)
}

/// `$NAME` without the `$`, if `text` is a well-formed variable.
fn variable_name(text: &str) -> Option<&str> {
    let name = text.strip_prefix('$')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    ((first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_'))
        .then_some(name)
}

fn raw_value(text: &str, line: usize) -> Result<RawValue> {
    let text = text.trim();
    if let Some(name) = variable_name(text) {
        return Ok(RawValue::Variable { name: name.to_owned(), line });
    }
    parse_number(text)
        .map(RawValue::Number)
        .ok_or_else(|| Error::parse(line, format!("expected a number or $variable, found '{text}'")))
}

/// `["name"] [sig] > OUT=v, ...`, or the legacy `sig > OUT=v, ...`.
fn parse_avar2_entry(text: &str, line: usize) -> Result<RawAvar2Entry> {
    let (name, rest) = leading_quoted(text.trim(), line)?;
    let (inputs, outputs) = if rest.starts_with('[') {
        let (inputs, rest) = bracketed_signature(rest, line)?;
        let outputs = rest.trim().strip_prefix('>').ok_or_else(|| {
            Error::parse(line, format!("expected '>' after the input location in '{text}'"))
        })?;
        (inputs, outputs)
    } else {
        let (signature, outputs) = rest
            .split_once('>')
            .ok_or_else(|| Error::parse(line, format!("expected 'inputs > outputs', found '{text}'")))?;
        (parse_signature(signature, line)?, outputs)
    };

    let outputs = assignments(outputs, line)?
        .into_iter()
        .map(|(axis, value)| Ok((axis.to_owned(), raw_value(value, line)?)))
        .collect::<Result<Vec<_>>>()?;
    if outputs.is_empty() {
        return Err(Error::parse(line, format!("avar2 entry '{text}' has no outputs")));
    }
    Ok(RawAvar2Entry { name, line, inputs, outputs })
}

/// Split `[sig] rest` into the parsed signature and the rest.
fn bracketed_signature(text: &str, line: usize) -> Result<(Vec<(String, RawInput)>, &str)> {
    let inner = text
        .strip_prefix('[')
        .ok_or_else(|| Error::parse(line, format!("expected '[input location]', found '{text}'")))?;
    let close = inner
        .find(']')
        .ok_or_else(|| Error::parse(line, format!("missing ']' in '{text}'")))?;
    Ok((parse_signature(&inner[..close], line)?, &inner[close + 1..]))
}

fn parse_signature(text: &str, line: usize) -> Result<Vec<(String, RawInput)>> {
    assignments(text, line)?
        .into_iter()
        .map(|(axis, value)| {
            let input = if variable_name(value).is_some() || parse_number(value).is_some() {
                RawInput::Value(raw_value(value, line)?)
            } else {
                RawInput::Label(unquote(value).to_owned())
            };
            Ok((axis.to_owned(), input))
        })
        .collect()
}

/// `a=1, b=2` pairs; an empty list is allowed, an empty item is not.
fn assignments(text: &str, line: usize) -> Result<Vec<(&str, &str)>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(str::trim)
        .map(|part| {
            part.split_once('=')
                .map(|(axis, value)| (axis.trim(), value.trim()))
                .filter(|(axis, value)| !axis.is_empty() && !value.is_empty())
                .ok_or_else(|| Error::parse(line, format!("expected 'axis=value', found '{part}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{condition::AxisCondition, diagnostics::Warning, labels::LabelTable};

    fn parse_ok(source: &str) -> Document {
        parse(source, &LabelTable::standard()).unwrap().value
    }

    fn parse_err(source: &str) -> Error {
        parse(source, &LabelTable::standard()).unwrap_err()
    }

    const BASIC: &str = "\
family Test
path masters

axes
    wght 100:400:900
        Thin > 0
        Regular > 125 @elidable
        Black > 1000
    ital discrete
        Upright @elidable
        Italic

masters
    Thin [0, 0]
    Regular [125, 0] @base
    Black [1000, 0]
    Italic/ThinItalic [0, 1]
";

    #[test]
    fn parses_axes_and_labels() {
        let doc = parse_ok(BASIC);
        assert_eq!(doc.family, "Test");
        assert_eq!(doc.common_path.as_deref(), Some("masters"));

        let weight = &doc.axes[0];
        assert_eq!((weight.tag.as_str(), weight.name.as_str()), ("wght", "weight"));
        assert_eq!((weight.minimum, weight.default, weight.maximum), (100.0, 400.0, 900.0));
        assert_eq!(
            weight.labels[1],
            AxisLabel { name: "Regular".into(), user_value: 400.0, design_value: 125.0, elidable: true }
        );

        let italic = &doc.axes[1];
        assert!(italic.discrete);
        assert_eq!(italic.values, vec![0.0, 1.0]);
        assert_eq!(italic.labels[1].name, "Italic");
        assert_eq!(italic.labels[1].user_value, 1.0);
    }

    #[test]
    fn parses_masters() {
        let doc = parse_ok(BASIC);
        assert_eq!(doc.masters.len(), 4);
        assert!(doc.masters[1].is_base);
        assert_eq!(doc.masters[1].coordinates["wght"], 125.0);
        assert_eq!(doc.masters[3].name, "ThinItalic");
        assert_eq!(doc.masters[3].path_override.as_deref(), Some("Italic"));
    }

    #[rstest]
    #[case("wght 100:400:900", "wght", "weight", (100.0, 400.0, 900.0))]
    #[case("weight 100:900", "wght", "weight", (100.0, 100.0, 900.0))]
    #[case("\"Optical Size\" opsz 8:14:144", "opsz", "Optical Size", (8.0, 14.0, 144.0))]
    #[case("contrast 0:100", "CONT", "contrast", (0.0, 0.0, 100.0))]
    #[case("XOPQ 20:90:200", "XOPQ", "XOPQ", (20.0, 90.0, 200.0))]
    #[case("wdth 100", "wdth", "width", (100.0, 100.0, 100.0))]
    fn axis_line_forms(
        #[case] line: &str,
        #[case] tag: &str,
        #[case] name: &str,
        #[case] range: (f64, f64, f64),
    ) {
        let doc = parse_ok(&format!("axes\n    {line}\n"));
        let axis = &doc.axes[0];
        assert_eq!(axis.tag, tag);
        assert_eq!(axis.name, name);
        assert_eq!((axis.minimum, axis.default, axis.maximum), range);
    }

    #[test]
    fn binary_is_a_discrete_zero_one_axis() {
        let doc = parse_ok("axes\n    ital binary\n");
        assert!(doc.axes[0].discrete);
        assert_eq!(doc.axes[0].values, vec![0.0, 1.0]);
    }

    #[test]
    fn discrete_value_lists() {
        let doc = parse_ok("axes\n    Grade GRAD 0,1,2,3 discrete\n        G0\n        G1\n        G2\n        G3\n");
        let grade = &doc.axes[0];
        assert_eq!(grade.values, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!((grade.minimum, grade.default, grade.maximum), (0.0, 0.0, 3.0));
        assert_eq!(grade.labels[2].user_value, 2.0);

        let doc = parse_ok("axes\n    GRAD 0,1,2,3:2 discrete\n");
        assert_eq!(doc.axes[0].default, 2.0);

        assert!(matches!(parse_err("axes\n    GRAD 0,1,2:5 discrete\n"), Error::Parse { line: 2, .. }));
        assert!(matches!(parse_err("axes\n    GRAD 0,x,2 discrete\n"), Error::Parse { line: 2, .. }));
    }

    #[test]
    fn explicit_user_values_and_map_points() {
        let doc = parse_ok("axes\n    opsz 8:14:144\n        8 Caption > 8\n        14 Text > 14\n        72 > 60\n");
        let axis = &doc.axes[0];
        assert_eq!(axis.labels.len(), 2);
        assert_eq!(axis.map, vec![MapPoint { user: 72.0, design: 60.0 }]);
    }

    #[test]
    fn unknown_label_suggests_a_fix() {
        let err = parse_err("axes\n    wght 100:400:900\n        Reguler > 400\n");
        let message = err.to_string();
        assert!(message.starts_with("line 3:"), "{message}");
        assert!(message.contains("did you mean 'Regular'"), "{message}");
    }

    #[test]
    fn hidden_axes_reject_labels() {
        let err = parse_err("axes hidden\n    XOPQ 20:90:200\n        Regular > 90\n");
        assert!(matches!(err, Error::Parse { line: 3, .. }));
    }

    #[test]
    fn too_many_bare_labels() {
        let err = parse_err("axes\n    ital discrete\n        Upright\n        Italic\n        Oblique\n");
        assert!(matches!(err, Error::Parse { .. }), "{err}");
    }

    #[test]
    fn master_coordinate_count_must_match() {
        let err = parse_err("axes\n    wght 100:400:900\n    wdth 75:100:125\nmasters\n    Light [100]\n");
        assert!(matches!(err, Error::Parse { line: 5, .. }), "{err}");
    }

    #[test]
    fn second_base_master_is_rejected() {
        let err = parse_err("axes\n    wght 100:400:900\nmasters\n    A [100] @base\n    B [900] @base\n");
        assert!(matches!(err, Error::MultipleBaseMaster { .. }));
    }

    #[test]
    fn duplicate_axis_is_rejected() {
        let err = parse_err("axes\n    wght 100:400:900\n    weight 100:900\n");
        assert!(matches!(err, Error::DuplicateAxisTag { ref tag } if tag == "wght"));
    }

    #[test]
    fn content_outside_a_section() {
        assert!(matches!(parse_err("wght 100:400:900\n"), Error::Parse { line: 1, .. }));
    }

    #[test]
    fn parses_rules() {
        let doc = parse_ok(
            "axes\n    wght 100:400:900\nrules\n    dollar cent > .rvrn (weight >= 480) \"dollar\"\n    a* > .alt (wght <= 300)\n    Q > Q.ss01 (400 <= weight <= 700)\n",
        );
        assert_eq!(doc.rules.len(), 3);

        let dollar = &doc.rules[0];
        assert_eq!(dollar.name, RuleName::Explicit("dollar".into()));
        assert_eq!(
            dollar.substitution_patterns,
            vec![GlyphPattern::Literal("dollar".into()), GlyphPattern::Literal("cent".into())]
        );
        assert_eq!(dollar.target, Target::Suffix(".rvrn".into()));
        assert_eq!(dollar.conditions, vec![AxisCondition::at_least("wght", 480.0)]);

        assert_eq!(doc.rules[1].name, RuleName::Derived(1));
        assert_eq!(doc.rules[1].substitution_patterns, vec![GlyphPattern::Prefix("a".into())]);
        assert_eq!(doc.rules[2].name, RuleName::Derived(2));
        assert_eq!(doc.rules[2].target, Target::Glyph("Q.ss01".into()));
    }

    #[test]
    fn explicit_rule3_stays_explicit() {
        let doc = parse_ok("axes\n    wght 100:400:900\nrules\n    a > .alt (weight >= 500) \"rule3\"\n");
        assert_eq!(doc.rules[0].name, RuleName::Explicit("rule3".into()));
    }

    #[rstest]
    #[case("    *Heavy > .alt (weight >= 500)")]
    #[case("    a > b* (weight >= 500)")]
    #[case("    a > .alt weight >= 500")]
    #[case("    a > .alt (weight >= 500 || weight <= 100)")]
    #[case("    a > .alt (weight >= 500) unquoted")]
    fn malformed_rules(#[case] rule: &str) {
        let err = parse_err(&format!("axes\n    wght 100:400:900\nrules\n{rule}\n"));
        assert!(matches!(err, Error::Parse { line: 4, .. }), "{err}");
    }

    #[test]
    fn rule_names_may_hold_parentheses() {
        let doc = parse_ok("axes\n    wght 100:400:900\nrules\n    a > .alt (weight >= 500) \"alt (heavy)\"\n");
        assert_eq!(doc.rules[0].name, RuleName::Explicit("alt (heavy)".into()));
        assert_eq!(doc.rules[0].conditions, vec![AxisCondition::at_least("wght", 500.0)]);
    }

    #[test]
    fn indented_glyphs_named_like_keywords_are_rules() {
        let doc = parse_ok(
            "axes\n    wght 100:400:900\nrules\n    family > .alt (weight >= 500)\n    path suffix > .alt (weight >= 600)\n",
        );
        assert_eq!(doc.family, "");
        assert_eq!(doc.common_path, None);
        assert_eq!(doc.rules.len(), 2);
        assert_eq!(doc.rules[0].substitution_patterns, vec![GlyphPattern::Literal("family".into())]);
        assert_eq!(doc.rules[1].substitution_patterns.len(), 2);
    }

    #[test]
    fn indented_documents_still_find_sections() {
        let doc = parse_ok("  family Test\n  axes\n      wght 100:400:900\n  rules\n      a > .alt (weight >= 500)\n");
        assert_eq!(doc.family, "Test");
        assert_eq!(doc.axes.len(), 1);
        assert_eq!(doc.rules.len(), 1);
    }

    #[test]
    fn rule_on_unknown_axis() {
        let err = parse_err("axes\n    wght 100:400:900\nrules\n    a > .alt (GRAD >= 0)\n");
        assert!(matches!(err, Error::AxisNotFound { line: Some(4), .. }));
    }

    const AVAR2_AXES: &str = "\
axes
    wght 100:400:900
        Regular > 400
        Bold > 700
axes hidden
    XOPQ 20:90:200
    YTUC 500:725:800
";

    #[test]
    fn avar2_variables_resolve_forward() {
        let source = format!(
            "{AVAR2_AXES}avar2\n    [wght=Bold] > XOPQ=$thick, YTUC=750\navar2 vars\n    $thick = 150\n"
        );
        let doc = parse_ok(&source);
        assert_eq!(doc.variables["thick"], 150.0);
        assert_eq!(doc.avar2_mappings.len(), 1);
        let entry = &doc.avar2_mappings[0];
        assert_eq!(entry.inputs, vec![("wght".to_string(), 700.0)]);
        assert_eq!(entry.outputs["XOPQ"], 150.0);
    }

    #[test]
    fn undefined_variable() {
        let source = format!("{AVAR2_AXES}avar2\n    [wght=700] > XOPQ=$UNSET\n");
        let err = parse_err(&source);
        assert!(matches!(err, Error::UndefinedVariable { ref name, line: 9 } if name == "UNSET"), "{err}");
    }

    #[test]
    fn duplicate_variable() {
        let err = parse_err("avar2 vars\n    $a = 1\n    $a = 2\n");
        assert!(matches!(err, Error::Parse { line: 3, .. }));
    }

    #[test]
    fn avar2_one_line_and_legacy_forms() {
        let source = format!(
            "{AVAR2_AXES}avar2 \"bold\" [weight=700] > YTUC=750\navar2\n    wght=400 > XOPQ=90\n"
        );
        let doc = parse_ok(&source);
        assert_eq!(doc.avar2_mappings.len(), 2);
        assert_eq!(doc.avar2_mappings[0].name.as_deref(), Some("bold"));
        assert_eq!(doc.avar2_mappings[1].inputs, vec![("wght".to_string(), 400.0)]);
    }

    #[rstest]
    #[case("    [wght=700] >, XOPQ=100")]
    #[case("    [wght=700] > XOPQ=100,")]
    #[case("    [wght=700] > XOPQ=100,, YTUC=750")]
    #[case("    [wght=700,] > XOPQ=100")]
    fn avar2_empty_items_are_rejected(#[case] entry: &str) {
        let err = parse_err(&format!("{AVAR2_AXES}avar2\n{entry}\n"));
        assert!(matches!(err, Error::Parse { line: 9, .. }), "{err}");
    }

    #[test]
    fn overlay_merge_conflict_is_a_warning() {
        let source = format!(
            "{AVAR2_AXES}avar2\n    [wght=700] > YTUC=750\n    [wght=700] > YTUC=751, XOPQ=100\n"
        );
        let converted = parse(&source, &LabelTable::standard()).unwrap();
        let entry = &converted.value.avar2_mappings[0];
        assert_eq!(converted.value.avar2_mappings.len(), 1);
        assert_eq!(entry.outputs["YTUC"], 751.0);
        assert_eq!(entry.outputs["XOPQ"], 100.0);
        assert_eq!(
            converted.warnings,
            vec![Warning::MergeConflict {
                axis: "YTUC".into(),
                signature: "wght=700".into(),
                old_value: 750.0,
                new_value: 751.0,
            }]
        );
    }

    #[test]
    fn matrix_rows() {
        let source = format!(
            "{AVAR2_AXES}avar2 matrix\n    outputs  XOPQ  YTUC\n    [wght=400]  90  725\n    \"bold\" [wght=700]  $x  750\navar2 vars\n    $x = 140\n"
        );
        let doc = parse_ok(&source);
        assert_eq!(doc.avar2_mappings.len(), 2);
        assert_eq!(doc.avar2_mappings[1].name.as_deref(), Some("bold"));
        assert_eq!(doc.avar2_mappings[1].outputs["XOPQ"], 140.0);
    }

    #[test]
    fn matrix_row_with_wrong_width() {
        let source = format!(
            "{AVAR2_AXES}avar2 matrix\n    outputs XOPQ YTUC\n    [wght=400] 90 725\n    [wght=700] 1 2 3 4 5\n"
        );
        let err = parse_err(&source);
        assert!(matches!(
            err,
            Error::MatrixColumnMismatch { line: 11, row_index: 2, expected: 2, actual: 5 }
        ), "{err}");
    }

    #[test]
    fn matrix_row_before_header() {
        let source = format!("{AVAR2_AXES}avar2 matrix\n    [wght=400] 90 725\n");
        assert!(matches!(parse_err(&source), Error::Parse { line: 9, .. }));
    }

    #[test]
    fn instances() {
        let doc = parse_ok("axes\n    wght 100:400:900\ninstances\n    \"Semi Light\" [350]\n    Bold [700]\n");
        let InstancesSpec::Explicit(instances) = &doc.instances else {
            panic!("expected explicit instances");
        };
        assert_eq!(instances[0].name, "Semi Light");
        assert_eq!(instances[1].coordinates["wght"], 700.0);

        let doc = parse_ok("axes\n    wght 100:400:900\ninstances auto\n");
        assert_eq!(doc.instances, InstancesSpec::Auto);
    }

    #[test]
    fn absent_instances_are_an_empty_list() {
        assert_eq!(parse_ok("family Test\n").instances, InstancesSpec::Explicit(Vec::new()));
    }
}
