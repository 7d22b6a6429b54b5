//! Number formatting shared by both writers.

/// Format a coordinate without a trailing `.0` (`700`, `62.5`, `-12`).
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // also folds -0.0
        return "0".to_owned();
    }
    format!("{value}")
}

/// Parse a coordinate written by either format.
pub fn parse_number(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_have_no_fraction() {
        assert_eq!(format_number(700.0), "700");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(62.5), "62.5");
        assert_eq!(format_number(-12.0), "-12");
    }

    #[test]
    fn rejects_non_finite() {
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(" 14.5 "), Some(14.5));
        assert_eq!(parse_number("Display"), None);
    }
}
