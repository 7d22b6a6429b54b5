//! The document model shared by the parser, both writers and the XML reader.
//!
//! A [`Document`] is built once per conversion run, read by a writer, and
//! then dropped. Apart from the avar2 overlay merge done while it is built,
//! nothing mutates it after construction.

use std::{collections::HashSet, fmt};

use indexmap::IndexMap;

use crate::{
    avar2::Avar2Entry,
    config::DEFAULT_STYLE_NAME,
    condition::AxisCondition,
    error::{Error, Result},
    glyph::{GlyphName, GlyphUniverse},
    number::format_number,
    universe::SourceFile,
};

/// A complete design space description.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub family: String,
    pub suffix: Option<String>,
    /// Directory holding the masters, relative to the document.
    pub common_path: Option<String>,
    pub axes: Vec<AxisSpec>,
    pub masters: Vec<MasterSpec>,
    /// Substitution rules; later rules may override earlier ones.
    pub rules: Vec<RuleSpec>,
    /// `avar2 vars` bindings, keyed without the leading `$`.
    pub variables: IndexMap<String, f64>,
    pub avar2_mappings: Vec<Avar2Entry>,
    pub instances: InstancesSpec,
}

impl Document {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            suffix: None,
            common_path: None,
            axes: Vec::new(),
            masters: Vec::new(),
            rules: Vec::new(),
            variables: IndexMap::new(),
            avar2_mappings: Vec::new(),
            instances: InstancesSpec::default(),
        }
    }

    /// Look an axis up by its tag.
    pub fn axis(&self, tag: &str) -> Option<&AxisSpec> {
        self.axes.iter().find(|axis| axis.tag == tag)
    }

    pub fn base_master(&self) -> Option<&MasterSpec> {
        self.masters.iter().find(|master| master.is_base)
    }

    /// The source files the masters point at, for glyph universe lookup.
    pub fn source_files(&self) -> Vec<SourceFile> {
        self.masters
            .iter()
            .map(|master| SourceFile {
                name: master.name.clone(),
                filename: master.filename(self.common_path.as_deref()),
            })
            .collect()
    }

    /// Check the cross-references and invariants of the model.
    pub fn validate(&self) -> Result<()> {
        let mut tags = HashSet::new();
        for axis in &self.axes {
            if !tags.insert(axis.tag.as_str()) {
                return Err(Error::DuplicateAxisTag { tag: axis.tag.clone() });
            }
            axis.check()
                .map_err(|message| Error::InvalidAxis { tag: axis.tag.clone(), message })?;
        }

        let mut bases = self.masters.iter().filter(|master| master.is_base);
        if let (Some(first), Some(second)) = (bases.next(), bases.next()) {
            return Err(Error::MultipleBaseMaster {
                first: first.name.clone(),
                second: second.name.clone(),
            });
        }

        let known = |tag: &str| -> Result<()> {
            if tags.contains(tag) {
                Ok(())
            } else {
                Err(Error::AxisNotFound { axis: tag.to_owned(), line: None })
            }
        };
        for master in &self.masters {
            master.coordinates.keys().try_for_each(|tag| known(tag))?;
        }
        for rule in &self.rules {
            rule.conditions.iter().try_for_each(|condition| known(&condition.axis))?;
        }
        for entry in &self.avar2_mappings {
            entry.inputs.iter().try_for_each(|(tag, _)| known(tag))?;
            entry.outputs.keys().try_for_each(|tag| known(tag))?;
        }
        Ok(())
    }

    /// The instances `instances auto` stands for: every combination of the
    /// labels of the visible, labelled axes.
    pub fn auto_instances(&self) -> Vec<InstanceSpec> {
        let labelled: Vec<&AxisSpec> =
            self.axes.iter().filter(|axis| !axis.hidden && !axis.labels.is_empty()).collect();
        if labelled.is_empty() {
            return Vec::new();
        }

        let mut combinations: Vec<Vec<(&AxisSpec, &AxisLabel)>> = vec![Vec::new()];
        for axis in &labelled {
            combinations = combinations
                .into_iter()
                .flat_map(|prefix| {
                    axis.labels.iter().map(move |label| {
                        let mut combination = prefix.clone();
                        combination.push((*axis, label));
                        combination
                    })
                })
                .collect();
        }

        combinations
            .into_iter()
            .map(|combination| {
                let visible: Vec<&str> = combination
                    .iter()
                    .filter(|(_, label)| !label.elidable)
                    .map(|(_, label)| label.name.as_str())
                    .collect();
                let name = if visible.is_empty() { DEFAULT_STYLE_NAME.to_owned() } else { visible.join(" ") };
                let coordinates = self
                    .axes
                    .iter()
                    .map(|axis| {
                        let value = combination
                            .iter()
                            .find(|(labelled_axis, _)| labelled_axis.tag == axis.tag)
                            .map(|(_, label)| label.design_value)
                            .unwrap_or_else(|| axis.user_to_design(axis.default));
                        (axis.tag.clone(), value)
                    })
                    .collect();
                InstanceSpec { name, coordinates }
            })
            .collect()
    }

    /// The concrete instance list, expanding `auto`.
    pub fn resolved_instances(&self) -> Vec<InstanceSpec> {
        match &self.instances {
            InstancesSpec::Auto => self.auto_instances(),
            InstancesSpec::Explicit(instances) => instances.clone(),
        }
    }
}

/// Find an axis by tag, or by name ignoring ASCII case.
pub fn find_axis<'a>(axes: &'a [AxisSpec], reference: &str) -> Option<&'a AxisSpec> {
    axes.iter()
        .find(|axis| axis.tag == reference)
        .or_else(|| axes.iter().find(|axis| axis.name.eq_ignore_ascii_case(reference)))
}

/// A design axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSpec {
    pub tag: String,
    pub name: String,
    pub minimum: f64,
    pub default: f64,
    pub maximum: f64,
    pub hidden: bool,
    pub discrete: bool,
    /// Discrete value set in ascending order; empty for continuous axes.
    pub values: Vec<f64>,
    pub labels: Vec<AxisLabel>,
    /// User-to-design map points that carry no label.
    pub map: Vec<MapPoint>,
}

/// A named location on an axis. Its user/design pair is also a map point.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabel {
    pub name: String,
    pub user_value: f64,
    pub design_value: f64,
    pub elidable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPoint {
    pub user: f64,
    pub design: f64,
}

impl AxisSpec {
    pub fn new(tag: impl Into<String>, name: impl Into<String>, minimum: f64, default: f64, maximum: f64) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            minimum,
            default,
            maximum,
            hidden: false,
            discrete: false,
            values: Vec::new(),
            labels: Vec::new(),
            map: Vec::new(),
        }
    }

    /// A discrete axis over `values`; the range is taken from the values.
    pub fn discrete(tag: impl Into<String>, name: impl Into<String>, values: Vec<f64>, default: f64) -> Self {
        let mut values = values;
        values.sort_by(f64::total_cmp);
        values.dedup();
        let minimum = values.first().copied().unwrap_or(default);
        let maximum = values.last().copied().unwrap_or(default);
        Self { discrete: true, values, ..Self::new(tag, name, minimum, default, maximum) }
    }

    pub fn label(&self, name: &str) -> Option<&AxisLabel> {
        self.labels.iter().find(|label| label.name == name)
    }

    /// Every user-to-design point, labelled or not, sorted by user value.
    pub fn map_points(&self) -> Vec<MapPoint> {
        let mut points: Vec<MapPoint> = self
            .labels
            .iter()
            .map(|label| MapPoint { user: label.user_value, design: label.design_value })
            .chain(self.map.iter().copied())
            .collect();
        points.sort_by(|a, b| a.user.total_cmp(&b.user));
        points.dedup_by(|a, b| a.user == b.user);
        points
    }

    /// Whether the axis map changes any value.
    pub fn has_mapping(&self) -> bool {
        self.map_points().iter().any(|point| point.user != point.design)
    }

    /// Map a user-space value to design space, interpolating linearly
    /// between map points and extrapolating flat past the ends.
    pub fn user_to_design(&self, user: f64) -> f64 {
        interpolate(&self.map_points(), user, |p| (p.user, p.design))
    }

    /// The axis range in design coordinates, where rule conditions live.
    pub fn design_bounds(&self) -> (f64, f64) {
        (self.user_to_design(self.minimum), self.user_to_design(self.maximum))
    }

    /// Inverse of [`user_to_design`](Self::user_to_design).
    pub fn design_to_user(&self, design: f64) -> f64 {
        let mut points = self.map_points();
        points.sort_by(|a, b| a.design.total_cmp(&b.design));
        interpolate(&points, design, |p| (p.design, p.user))
    }

    /// Check the axis invariants, returning a description of the first
    /// violation.
    pub fn check(&self) -> std::result::Result<(), String> {
        if !(self.minimum <= self.default && self.default <= self.maximum) {
            return Err(format!(
                "default {} is outside {}..{}",
                format_number(self.default),
                format_number(self.minimum),
                format_number(self.maximum)
            ));
        }
        if self.hidden && !self.labels.is_empty() {
            return Err("hidden axes cannot have labels".to_owned());
        }
        if self.discrete && !self.labels.is_empty() {
            let mut label_values: Vec<f64> = self.labels.iter().map(|label| label.user_value).collect();
            label_values.sort_by(f64::total_cmp);
            label_values.dedup();
            if label_values != self.values {
                let render = |values: &[f64]| {
                    values.iter().map(|v| format_number(*v)).collect::<Vec<_>>().join(", ")
                };
                return Err(format!(
                    "discrete labels cover [{}] but the axis declares [{}]",
                    render(&label_values),
                    render(&self.values)
                ));
            }
        }
        Ok(())
    }
}

fn interpolate(points: &[MapPoint], value: f64, project: impl Fn(&MapPoint) -> (f64, f64)) -> f64 {
    let pairs: Vec<(f64, f64)> = points.iter().map(project).collect();
    match pairs.as_slice() {
        [] => value,
        [(_, only)] => *only + (value - pairs[0].0),
        [(first_in, first_out), ..] if value <= *first_in => *first_out,
        [.., (last_in, last_out)] if value >= *last_in => *last_out,
        _ => pairs
            .windows(2)
            .find(|w| value >= w[0].0 && value <= w[1].0)
            .map(|w| {
                let (x0, y0) = w[0];
                let (x1, y1) = w[1];
                if x1 == x0 { y0 } else { y0 + (value - x0) * (y1 - y0) / (x1 - x0) }
            })
            .unwrap_or(value),
    }
}

/// A master source.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterSpec {
    pub name: String,
    /// Design-space location keyed by axis tag.
    pub coordinates: IndexMap<String, f64>,
    /// Directory of this master when it differs from the common path.
    pub path_override: Option<String>,
    pub is_base: bool,
}

impl MasterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), coordinates: IndexMap::new(), path_override: None, is_base: false }
    }

    /// The UFO filename relative to the document.
    pub fn filename(&self, common_path: Option<&str>) -> String {
        match self.path_override.as_deref().or(common_path) {
            Some(dir) if !dir.is_empty() => format!("{}/{}.ufo", dir.trim_end_matches('/'), self.name),
            _ => format!("{}.ufo", self.name),
        }
    }
}

/// A rule name that is either chosen by the author or assigned by position.
///
/// Derived names are a property of the rule, not of the string: a rule
/// explicitly called `"rule3"` stays explicit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleName {
    Explicit(String),
    /// 1-based position among the unnamed rules of the document.
    Derived(usize),
}

impl RuleName {
    pub fn is_explicit(&self) -> bool {
        matches!(self, RuleName::Explicit(_))
    }

    pub fn explicit(&self) -> Option<&str> {
        match self {
            RuleName::Explicit(name) => Some(name),
            RuleName::Derived(_) => None,
        }
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleName::Explicit(name) => f.write_str(name),
            RuleName::Derived(index) => write!(f, "rule{index}"),
        }
    }
}

/// The glyph side of a substitution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlyphPattern {
    Literal(GlyphName),
    /// `prefix*`: every glyph starting with the prefix.
    Prefix(String),
}

impl GlyphPattern {
    /// Parse a single token; `*` is only allowed as the last character.
    pub fn parse(token: &str) -> std::result::Result<Self, String> {
        match token.find('*') {
            None => Ok(GlyphPattern::Literal(GlyphName::new(token))),
            Some(pos) if pos == token.len() - 1 && pos > 0 => {
                Ok(GlyphPattern::Prefix(token[..pos].to_owned()))
            }
            Some(_) => Err(format!("unsupported wildcard '{token}'; only 'prefix*' is allowed")),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, GlyphPattern::Prefix(_))
    }

    pub fn matches(&self, glyph: &str) -> bool {
        match self {
            GlyphPattern::Literal(name) => name == glyph,
            GlyphPattern::Prefix(prefix) => glyph.starts_with(prefix.as_str()),
        }
    }

    /// Expand against a glyph universe. Literals expand to themselves.
    pub fn expand<'a>(&'a self, universe: &'a GlyphUniverse) -> Vec<GlyphName> {
        match self {
            GlyphPattern::Literal(name) => vec![name.clone()],
            GlyphPattern::Prefix(prefix) => universe.with_prefix(prefix).cloned().collect(),
        }
    }
}

impl fmt::Display for GlyphPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlyphPattern::Literal(name) => write!(f, "{name}"),
            GlyphPattern::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// The replacement side of a substitution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Glyph(GlyphName),
    /// `.suffix`: the source glyph with the suffix appended.
    Suffix(String),
}

impl Target {
    pub fn parse(token: &str) -> Self {
        if token.starts_with('.') && token.len() > 1 {
            Target::Suffix(token.to_owned())
        } else {
            Target::Glyph(GlyphName::new(token))
        }
    }

    /// The replacement glyph for `from`.
    pub fn apply(&self, from: &GlyphName) -> GlyphName {
        match self {
            Target::Glyph(name) => name.clone(),
            Target::Suffix(suffix) => from.with_suffix(suffix),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Glyph(name) => write!(f, "{name}"),
            Target::Suffix(suffix) => f.write_str(suffix),
        }
    }
}

/// A conditional glyph substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub name: RuleName,
    pub substitution_patterns: Vec<GlyphPattern>,
    pub target: Target,
    pub conditions: Vec<AxisCondition>,
}

impl RuleSpec {
    /// The literal `(from, to)` pairs of a rule without wildcards.
    pub fn literal_pairs(&self) -> Option<Vec<(GlyphName, GlyphName)>> {
        self.substitution_patterns
            .iter()
            .map(|pattern| match pattern {
                GlyphPattern::Literal(from) => Some((from.clone(), self.target.apply(from))),
                GlyphPattern::Prefix(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstancesSpec {
    /// Generate instances from axis labels.
    Auto,
    /// An absent `instances` section is an empty explicit list.
    Explicit(Vec<InstanceSpec>),
}

impl Default for InstancesSpec {
    fn default() -> Self {
        InstancesSpec::Explicit(Vec::new())
    }
}

/// A named instance at a design-space location.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    pub name: String,
    pub coordinates: IndexMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight() -> AxisSpec {
        let mut axis = AxisSpec::new("wght", "weight", 100.0, 400.0, 900.0);
        axis.labels = vec![
            AxisLabel { name: "Thin".into(), user_value: 100.0, design_value: 0.0, elidable: false },
            AxisLabel { name: "Regular".into(), user_value: 400.0, design_value: 125.0, elidable: true },
            AxisLabel { name: "Black".into(), user_value: 900.0, design_value: 1000.0, elidable: false },
        ];
        axis
    }

    #[test]
    fn user_to_design_interpolates() {
        let axis = weight();
        assert_eq!(axis.user_to_design(400.0), 125.0);
        assert_eq!(axis.user_to_design(250.0), 62.5);
        assert_eq!(axis.user_to_design(50.0), 0.0);
        assert_eq!(axis.design_to_user(125.0), 400.0);
    }

    #[test]
    fn unmapped_axis_is_identity() {
        let axis = AxisSpec::new("wdth", "width", 75.0, 100.0, 125.0);
        assert_eq!(axis.user_to_design(87.5), 87.5);
        assert!(!axis.has_mapping());
    }

    #[test]
    fn discrete_axis_labels_must_cover_values() {
        let mut axis = AxisSpec::discrete("ital", "italic", vec![1.0, 0.0], 0.0);
        assert_eq!(axis.values, vec![0.0, 1.0]);
        axis.labels.push(AxisLabel {
            name: "Upright".into(),
            user_value: 0.0,
            design_value: 0.0,
            elidable: true,
        });
        assert!(axis.check().is_err());
        axis.labels.push(AxisLabel {
            name: "Italic".into(),
            user_value: 1.0,
            design_value: 1.0,
            elidable: false,
        });
        assert!(axis.check().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_tags_and_bases() {
        let mut doc = Document::new("Test");
        doc.axes = vec![weight(), weight()];
        assert!(matches!(doc.validate(), Err(Error::DuplicateAxisTag { .. })));

        doc.axes.pop();
        let mut light = MasterSpec::new("Light");
        light.is_base = true;
        let mut bold = MasterSpec::new("Bold");
        bold.is_base = true;
        doc.masters = vec![light, bold];
        assert!(matches!(
            doc.validate(),
            Err(Error::MultipleBaseMaster { ref first, ref second }) if first == "Light" && second == "Bold"
        ));
    }

    #[test]
    fn auto_instances_combine_labels() {
        let mut doc = Document::new("Test");
        let mut italic = AxisSpec::discrete("ital", "italic", vec![0.0, 1.0], 0.0);
        italic.labels = vec![
            AxisLabel { name: "Upright".into(), user_value: 0.0, design_value: 0.0, elidable: true },
            AxisLabel { name: "Italic".into(), user_value: 1.0, design_value: 1.0, elidable: false },
        ];
        doc.axes = vec![weight(), italic];

        let names: Vec<String> = doc.auto_instances().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["Thin", "Thin Italic", "Regular", "Italic", "Black", "Black Italic"]);

        let regular = &doc.auto_instances()[2];
        assert_eq!(regular.coordinates["wght"], 125.0);
        assert_eq!(regular.coordinates["ital"], 0.0);
    }

    #[test]
    fn glyph_pattern_parsing() {
        assert_eq!(GlyphPattern::parse("dollar*").unwrap(), GlyphPattern::Prefix("dollar".into()));
        assert_eq!(GlyphPattern::parse("a.alt").unwrap(), GlyphPattern::Literal("a.alt".into()));
        assert!(GlyphPattern::parse("*Heavy").is_err());
        assert!(GlyphPattern::parse("a*b").is_err());
    }

    #[test]
    fn derived_names_render_by_index() {
        assert_eq!(RuleName::Derived(3).to_string(), "rule3");
        assert!(RuleName::Explicit("rule3".into()).is_explicit());
        assert_ne!(RuleName::Derived(3), RuleName::Explicit("rule3".into()));
    }

    #[test]
    fn master_filename_prefers_override() {
        let mut master = MasterSpec::new("Light");
        assert_eq!(master.filename(None), "Light.ufo");
        assert_eq!(master.filename(Some("masters")), "masters/Light.ufo");
        master.path_override = Some("other".into());
        assert_eq!(master.filename(Some("masters")), "other/Light.ufo");
    }
}
