//! Error types for sketch and designspace conversion.

use std::result;

/// Fatal errors. Any of these aborts the current conversion run at the
/// first offending construct.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: undefined variable '${name}'")]
    UndefinedVariable { name: String, line: usize },

    #[error("{}axis '{axis}' is not declared", line_prefix(.line))]
    AxisNotFound { axis: String, line: Option<usize> },

    #[error("line {line}: matrix row {row_index} has {actual} values, expected {expected}")]
    MatrixColumnMismatch {
        line: usize,
        row_index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("axis tag '{tag}' is declared more than once")]
    DuplicateAxisTag { tag: String },

    #[error("masters '{first}' and '{second}' are both marked as base")]
    MultipleBaseMaster { first: String, second: String },

    #[error("axis '{tag}': {message}")]
    InvalidAxis { tag: String, message: String },

    #[error("failed to parse designspace XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid XML attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid designspace: {0}")]
    InvalidXml(String),

    #[error("failed to write designspace XML: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse { line, message: message.into() }
    }

    pub(crate) fn invalid_xml(message: impl Into<String>) -> Self {
        Error::InvalidXml(message.into())
    }
}

fn line_prefix(line: &Option<usize>) -> String {
    line.map(|line| format!("line {line}: ")).unwrap_or_default()
}

pub type Result<T> = result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_not_found_message_includes_line_when_known() {
        let err = Error::AxisNotFound { axis: "GRAD".into(), line: Some(12) };
        assert_eq!(err.to_string(), "line 12: axis 'GRAD' is not declared");

        let err = Error::AxisNotFound { axis: "GRAD".into(), line: None };
        assert_eq!(err.to_string(), "axis 'GRAD' is not declared");
    }

    #[test]
    fn undefined_variable_message() {
        let err = Error::UndefinedVariable { name: "UNSET".into(), line: 4 };
        assert_eq!(err.to_string(), "line 4: undefined variable '$UNSET'");
    }
}
