//! Registered axis abbreviations.

/// Registered axis names and their tags.
pub const REGISTERED_AXES: &[(&str, &str)] = &[
    ("weight", "wght"),
    ("width", "wdth"),
    ("italic", "ital"),
    ("slant", "slnt"),
    ("optical", "opsz"),
];

/// The registered tag for an axis name (`weight` -> `wght`), case-insensitive.
pub fn tag_for_name(name: &str) -> Option<&'static str> {
    REGISTERED_AXES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, tag)| *tag)
}

/// The registered axis name for a tag (`wght` -> `weight`).
pub fn name_for_tag(tag: &str) -> Option<&'static str> {
    REGISTERED_AXES.iter().find(|(_, t)| *t == tag).map(|(name, _)| *name)
}

/// The name an axis gets when only its tag is written.
///
/// Registered tags use their registered name; custom tags pass through.
pub fn default_name(tag: &str) -> String {
    name_for_tag(tag).map(str::to_owned).unwrap_or_else(|| tag.to_owned())
}

/// The tag inferred from a bare axis name in the legacy `weight 100:400:900`
/// form: registered names map through the table, anything else uses its
/// first four characters uppercased.
pub fn infer_tag(name: &str) -> String {
    tag_for_name(name)
        .map(str::to_owned)
        .unwrap_or_else(|| name.chars().take(4).collect::<String>().to_uppercase())
}
