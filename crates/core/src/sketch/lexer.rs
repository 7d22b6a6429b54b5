//! Line splitting and word tokenizing for Sketch text.

use crate::{
    config::TAB_WIDTH,
    error::{Error, Result},
};

/// A non-blank source line with comments removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Indentation in columns.
    pub indent: usize,
    pub text: &'a str,
}

/// Split `source` into meaningful lines.
pub(crate) fn lines(source: &str) -> Vec<Line<'_>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let text = strip_comment(raw).trim_end();
            let trimmed = text.trim_start();
            if trimmed.is_empty() {
                return None;
            }
            let indent = text[..text.len() - trimmed.len()]
                .chars()
                .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
                .sum();
            Some(Line { number: i + 1, indent, text: trimmed })
        })
        .collect()
}

/// Remove a `#` comment that is not inside double quotes.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Split on whitespace, keeping `"quoted words"` together without quotes.
pub(crate) fn words(text: &str, line: usize) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| Error::parse(line, format!("unterminated quote in '{text}'")))?;
            words.push(quoted[..end].to_owned());
            rest = quoted[end + 1..].trim_start();
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            words.push(rest[..end].to_owned());
            rest = rest[end..].trim_start();
        }
    }
    Ok(words)
}

/// Take a leading `"name"` off `text`, returning the name and the rest.
pub(crate) fn leading_quoted(text: &str, line: usize) -> Result<(Option<String>, &str)> {
    let Some(quoted) = text.strip_prefix('"') else {
        return Ok((None, text));
    };
    let end = quoted
        .find('"')
        .ok_or_else(|| Error::parse(line, format!("unterminated quote in '{text}'")))?;
    Ok((Some(quoted[..end].to_owned()), quoted[end + 1..].trim_start()))
}

/// Take a trailing `"name"` off `text`, returning the rest and the name.
pub(crate) fn trailing_quoted(text: &str, line: usize) -> Result<(&str, Option<String>)> {
    let Some(inner) = text.trim_end().strip_suffix('"') else {
        return Ok((text, None));
    };
    let start = inner
        .rfind('"')
        .ok_or_else(|| Error::parse(line, format!("unterminated quote in '{text}'")))?;
    Ok((inner[..start].trim_end(), Some(inner[start + 1..].to_owned())))
}

/// Strip one pair of surrounding double quotes, if present.
pub(crate) fn unquote(text: &str) -> &str {
    text.strip_prefix('"').and_then(|t| t.strip_suffix('"')).unwrap_or(text)
}
