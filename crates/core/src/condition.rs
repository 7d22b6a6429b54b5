//! Axis-range conditions: canonical form, text rendering and parsing.
//!
//! Every condition is held as `{axis, minimum, maximum}`, with
//! `f64::NEG_INFINITY` / `f64::INFINITY` standing for an unbounded side.
//! The XML min/max attributes and the text comparisons all normalize to this
//! one shape, so syntax is lossy while the interval is not.

use crate::{
    document::{AxisSpec, find_axis},
    error::{Error, Result},
    number::{format_number, parse_number},
};

/// A single axis-range condition. Exact-value conditions have
/// `minimum == maximum`.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisCondition {
    /// Axis tag.
    pub axis: String,
    pub minimum: f64,
    pub maximum: f64,
}

impl AxisCondition {
    pub fn new(axis: impl Into<String>, minimum: f64, maximum: f64) -> Self {
        Self { axis: axis.into(), minimum, maximum }
    }

    pub fn at_least(axis: impl Into<String>, value: f64) -> Self {
        Self::new(axis, value, f64::INFINITY)
    }

    pub fn at_most(axis: impl Into<String>, value: f64) -> Self {
        Self::new(axis, f64::NEG_INFINITY, value)
    }

    pub fn exactly(axis: impl Into<String>, value: f64) -> Self {
        Self::new(axis, value, value)
    }

    /// Normalize designspace `minimum`/`maximum` attributes.
    ///
    /// A missing side is unbounded, and a maximum at or above the axis
    /// maximum is unbounded too, unless it pins an exact value.
    pub fn from_xml_bounds(axis: &AxisSpec, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        let (_, upper_bound) = axis.design_bounds();
        let minimum = minimum.unwrap_or(f64::NEG_INFINITY);
        let maximum = match maximum {
            Some(max) if max < upper_bound || max == minimum => max,
            _ => f64::INFINITY,
        };
        Self::new(axis.tag.clone(), minimum, maximum)
    }

    /// The `(minimum, maximum)` attributes to write, with unbounded sides
    /// replaced by the axis's range in design coordinates.
    pub fn xml_bounds(&self, axis: &AxisSpec) -> (f64, f64) {
        let (lower_bound, upper_bound) = axis.design_bounds();
        let minimum = if self.minimum.is_finite() { self.minimum } else { lower_bound };
        let maximum = if self.maximum.is_finite() { self.maximum } else { upper_bound };
        (minimum, maximum)
    }

    /// Render the condition following the fixed decision table:
    ///
    /// | shape                              | text             |
    /// |------------------------------------|------------------|
    /// | `min > axis.min && max == +inf`    | `axis >= min`    |
    /// | `min == axis.min && max < +inf`    | `axis <= max`    |
    /// | `min == max`                       | `axis == value`  |
    /// | otherwise                          | `lo <= axis <= hi` |
    ///
    /// The axis is named by its name, or by its tag when the name is not a
    /// single plain word (`Optical size`).
    pub fn format(&self, axis: &AxisSpec) -> String {
        let (lower_bound, _) = axis.design_bounds();
        let at_floor = self.minimum == f64::NEG_INFINITY || self.minimum == lower_bound;
        let name = reference(axis);

        if self.minimum > lower_bound && self.maximum == f64::INFINITY {
            format!("{name} >= {}", format_number(self.minimum))
        } else if at_floor && self.maximum < f64::INFINITY {
            format!("{name} <= {}", format_number(self.maximum))
        } else if self.minimum == self.maximum {
            format!("{name} == {}", format_number(self.minimum))
        } else {
            let (lo, hi) = self.xml_bounds(axis);
            format!("{} <= {name} <= {}", format_number(lo), format_number(hi))
        }
    }

    /// Whether two conditions select the same interval of `axis`.
    pub fn same_interval(&self, other: &AxisCondition, axis: &AxisSpec) -> bool {
        self.axis == other.axis && self.xml_bounds(axis) == other.xml_bounds(axis)
    }
}

fn reference(axis: &AxisSpec) -> &str {
    let plain = !axis.name.is_empty()
        && axis.name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        && parse_number(&axis.name).is_none();
    if plain { axis.name.as_str() } else { axis.tag.as_str() }
}

/// Render a conjunction of conditions as `a >= 1 && b <= 2`.
pub fn format_conditions(conditions: &[AxisCondition], axes: &[AxisSpec]) -> Result<String> {
    conditions
        .iter()
        .map(|condition| {
            axes.iter()
                .find(|axis| axis.tag == condition.axis)
                .map(|axis| condition.format(axis))
                .ok_or_else(|| Error::AxisNotFound { axis: condition.axis.clone(), line: None })
        })
        .collect::<Result<Vec<_>>>()
        .map(|parts| parts.join(" && "))
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Op(&'a str),
    Word(&'a str),
}

fn is_op_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '!')
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();
    while let Some(first) = rest.chars().next() {
        let end = if is_op_char(first) {
            rest.find(|c: char| !is_op_char(c)).unwrap_or(rest.len())
        } else {
            rest.find(|c: char| c.is_whitespace() || is_op_char(c)).unwrap_or(rest.len())
        };
        let (token, tail) = rest.split_at(end);
        tokens.push(if is_op_char(first) { Token::Op(token) } else { Token::Word(token) });
        rest = tail.trim_start();
    }
    tokens
}

/// Parse a condition expression such as `weight >= 600 && 75 <= wdth <= 100`.
///
/// Only conjunction is supported; disjunction, negation and strict
/// comparisons are rejected. Empty text is an unconditional rule.
pub fn parse_conditions(text: &str, axes: &[AxisSpec], line: usize) -> Result<Vec<AxisCondition>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    if text.contains("||") {
        return Err(Error::parse(line, "'||' is not supported; conditions can only be joined with '&&'"));
    }
    text.split("&&").map(|part| parse_comparison(part.trim(), axes, line)).collect()
}

fn parse_comparison(text: &str, axes: &[AxisSpec], line: usize) -> Result<AxisCondition> {
    if text.is_empty() {
        return Err(Error::parse(line, "empty condition"));
    }
    let tokens = tokenize(text);
    for token in &tokens {
        match token {
            Token::Word(word) if ["or", "not", "and"].contains(&word.to_ascii_lowercase().as_str()) => {
                return Err(Error::parse(
                    line,
                    format!("'{word}' is not supported in conditions; only '&&' is allowed"),
                ));
            }
            Token::Op(op) if op.starts_with('!') => {
                return Err(Error::parse(line, format!("negation '{op}' is not supported in conditions")));
            }
            Token::Op(op @ ("<" | ">")) => {
                return Err(Error::parse(
                    line,
                    format!("strict comparison '{op}' is not supported; use '<=' or '>='"),
                ));
            }
            Token::Op(op) if !matches!(*op, "<=" | ">=" | "==") => {
                return Err(Error::parse(line, format!("unknown operator '{op}'")));
            }
            _ => {}
        }
    }

    let number = |word: &str| {
        parse_number(word).ok_or_else(|| Error::parse(line, format!("expected a number, found '{word}'")))
    };
    let axis_tag = |reference: &str| {
        find_axis(axes, reference)
            .map(|axis| axis.tag.clone())
            .ok_or_else(|| Error::AxisNotFound { axis: reference.to_owned(), line: Some(line) })
    };

    match tokens.as_slice() {
        [Token::Word(lo), Token::Op("<="), Token::Word(axis), Token::Op("<="), Token::Word(hi)] => {
            let (lo, hi) = (number(*lo)?, number(*hi)?);
            if lo > hi {
                return Err(Error::parse(line, format!("empty range {lo} <= {axis} <= {hi}")));
            }
            Ok(AxisCondition::new(axis_tag(*axis)?, lo, hi))
        }
        [Token::Word(axis), Token::Op(op), Token::Word(value)] => {
            let tag = axis_tag(*axis)?;
            let value = number(*value)?;
            Ok(match *op {
                ">=" => AxisCondition::at_least(tag, value),
                "<=" => AxisCondition::at_most(tag, value),
                _ => AxisCondition::exactly(tag, value),
            })
        }
        _ => Err(Error::parse(
            line,
            format!("cannot parse condition '{text}'; expected 'axis >= v', 'axis <= v', 'axis == v' or 'lo <= axis <= hi'"),
        )),
    }
}
