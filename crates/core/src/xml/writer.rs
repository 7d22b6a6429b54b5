//! [`Document`] to designspace XML (format 5.0).

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, info};
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    config::{DESIGNSPACE_FORMAT, LIB_FAMILY_KEY, LIB_SUFFIX_KEY},
    diagnostics::{Converted, Diagnostics, Warning},
    document::{AxisSpec, Document, MasterSpec, RuleSpec},
    error::{Error, Result},
    glyph::{GlyphName, GlyphUniverse},
    number::format_number,
    pattern::expand_sources,
};

/// Thin wrapper over [`quick_xml::Writer`] with attribute-list helpers.
struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self { writer: Writer::new_with_indent(Vec::new(), b' ', 2) }
    }

    fn element<'a>(name: &'a str, attributes: &[(&str, &str)]) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        for &(key, value) in attributes {
            start.push_attribute((key, value));
        }
        start
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.writer.write_event(Event::Start(Self::element(name, attributes)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.writer.write_event(Event::Empty(Self::element(name, attributes)))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name, &[])?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn finish(self) -> Result<String> {
        let mut text = String::from_utf8(self.writer.into_inner())
            .map_err(|e| Error::invalid_xml(format!("non UTF-8 output: {e}")))?;
        text.push('\n');
        Ok(text)
    }
}

/// Render a document as designspace XML.
///
/// Wildcards are expanded against `universe`. With a universe, substitutions
/// whose target glyph is missing are dropped with a warning; without one,
/// wildcards cannot be expanded and contribute nothing.
pub fn write(document: &Document, universe: Option<&GlyphUniverse>) -> Result<Converted<String>> {
    let mut diagnostics = Diagnostics::new();
    let mut out = XmlOut::new();

    out.writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.start("designspace", &[("format", DESIGNSPACE_FORMAT)])?;

    write_axes(&mut out, document)?;
    write_rules(&mut out, document, universe, &mut diagnostics)?;
    write_sources(&mut out, document)?;
    write_instances(&mut out, document)?;
    write_lib(&mut out, document)?;

    out.end("designspace")?;
    info!("wrote designspace with {} warnings", diagnostics.len());
    Ok(Converted::new(out.finish()?, diagnostics))
}

fn write_axes(out: &mut XmlOut, document: &Document) -> Result<()> {
    if document.axes.is_empty() {
        return Ok(());
    }
    out.start("axes", &[])?;
    for axis in &document.axes {
        write_axis(out, axis)?;
    }

    if !document.avar2_mappings.is_empty() {
        out.start("mappings", &[])?;
        for entry in &document.avar2_mappings {
            match &entry.name {
                Some(name) => out.start("mapping", &[("description", name.as_str())])?,
                None => out.start("mapping", &[])?,
            }
            let inputs: Vec<(&str, f64)> = entry.inputs.iter().map(|(tag, v)| (tag.as_str(), *v)).collect();
            let outputs: Vec<(&str, f64)> = entry.outputs.iter().map(|(tag, v)| (tag.as_str(), *v)).collect();
            write_dimensions(out, "input", &inputs, &document.axes)?;
            write_dimensions(out, "output", &outputs, &document.axes)?;
            out.end("mapping")?;
        }
        out.end("mappings")?;
    }
    out.end("axes")
}

fn write_axis(out: &mut XmlOut, axis: &AxisSpec) -> Result<()> {
    let default = format_number(axis.default);
    let (minimum, maximum) = (format_number(axis.minimum), format_number(axis.maximum));
    let values = axis.values.iter().map(|v| format_number(*v)).collect::<Vec<_>>().join(" ");

    let mut attributes = vec![("tag", axis.tag.as_str()), ("name", axis.name.as_str())];
    if axis.discrete {
        attributes.push(("values", &values));
        attributes.push(("default", &default));
    } else {
        attributes.push(("minimum", &minimum));
        attributes.push(("maximum", &maximum));
        attributes.push(("default", &default));
    }
    if axis.hidden {
        attributes.push(("hidden", "1"));
    }

    let maps = if axis.has_mapping() { axis.map_points() } else { Vec::new() };
    if maps.is_empty() && axis.labels.is_empty() {
        return out.empty("axis", &attributes);
    }

    out.start("axis", &attributes)?;
    for point in maps {
        out.empty("map", &[("input", &format_number(point.user)), ("output", &format_number(point.design))])?;
    }
    if !axis.labels.is_empty() {
        out.start("labels", &[])?;
        for label in &axis.labels {
            let user = format_number(label.user_value);
            let mut attributes = vec![("uservalue", user.as_str()), ("name", label.name.as_str())];
            if label.elidable {
                attributes.push(("elidable", "true"));
            }
            out.empty("label", &attributes)?;
        }
        out.end("labels")?;
    }
    out.end("axis")
}

/// `<{wrapper}><dimension name xvalue/>...</{wrapper}>`, naming axes by
/// their designspace name.
fn write_dimensions(out: &mut XmlOut, wrapper: &str, location: &[(&str, f64)], axes: &[AxisSpec]) -> Result<()> {
    out.start(wrapper, &[])?;
    for &(tag, value) in location {
        let name = axes
            .iter()
            .find(|axis| axis.tag == tag)
            .map(|axis| axis.name.as_str())
            .ok_or_else(|| Error::AxisNotFound { axis: tag.to_owned(), line: None })?;
        out.empty("dimension", &[("name", name), ("xvalue", &format_number(value))])?;
    }
    out.end(wrapper)
}

/// Adjacent rules sharing a name and a condition set come from one XML
/// rule; write them back as one.
fn group_rules(rules: &[RuleSpec]) -> Vec<&[RuleSpec]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=rules.len() {
        let split = i == rules.len()
            || rules[i].name != rules[start].name
            || rules[i].conditions != rules[start].conditions;
        if split {
            groups.push(&rules[start..i]);
            start = i;
        }
    }
    groups
}

fn write_rules(
    out: &mut XmlOut,
    document: &Document,
    universe: Option<&GlyphUniverse>,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let mut rendered = Vec::new();
    for group in group_rules(&document.rules) {
        let head = &group[0];
        let rule_name = head.name.to_string();
        let mut seen = HashSet::new();
        let mut subs: Vec<(GlyphName, GlyphName)> = Vec::new();

        for rule in group {
            let expansion = expand_sources(&rule.substitution_patterns, &rule.target, universe);
            for pattern in expansion.unexpanded {
                diagnostics.push(Warning::WildcardUnexpanded { rule: rule_name.clone(), pattern: pattern.to_string() });
            }
            for from in expansion.glyphs {
                let to = rule.target.apply(&from);
                if universe.is_some_and(|universe| !universe.contains(&to)) {
                    diagnostics.push(Warning::TargetGlyphMissing { rule: rule_name.clone(), from, to });
                    continue;
                }
                if seen.insert(from.clone()) {
                    subs.push((from, to));
                }
            }
        }

        if subs.is_empty() {
            debug!("rule '{rule_name}' has no substitutions left, not writing it");
            continue;
        }
        rendered.push((head, subs));
    }

    if rendered.is_empty() {
        return Ok(());
    }
    out.start("rules", &[])?;
    for (rule, subs) in rendered {
        match rule.name.explicit() {
            Some(name) => out.start("rule", &[("name", name)])?,
            None => out.start("rule", &[])?,
        }
        if rule.conditions.is_empty() {
            out.empty("conditionset", &[])?;
        } else {
            out.start("conditionset", &[])?;
            for condition in &rule.conditions {
                let axis = document
                    .axis(&condition.axis)
                    .ok_or_else(|| Error::AxisNotFound { axis: condition.axis.clone(), line: None })?;
                let (minimum, maximum) = condition.xml_bounds(axis);
                out.empty(
                    "condition",
                    &[
                        ("name", axis.name.as_str()),
                        ("minimum", &format_number(minimum)),
                        ("maximum", &format_number(maximum)),
                    ],
                )?;
            }
            out.end("conditionset")?;
        }
        for (from, to) in &subs {
            out.empty("sub", &[("name", from.as_str()), ("with", to.as_str())])?;
        }
        out.end("rule")?;
    }
    out.end("rules")
}

/// The style part of a master name: `Family-Bold` → `Bold`.
fn style_name<'a>(master: &'a MasterSpec, family: &str) -> &'a str {
    let compact: String = family.split_whitespace().collect();
    master
        .name
        .strip_prefix(compact.as_str())
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(&master.name)
}

fn location(coordinates: &IndexMap<String, f64>) -> Vec<(&str, f64)> {
    coordinates.iter().map(|(tag, value)| (tag.as_str(), *value)).collect()
}

fn write_sources(out: &mut XmlOut, document: &Document) -> Result<()> {
    if document.masters.is_empty() {
        return Ok(());
    }
    out.start("sources", &[])?;
    for master in &document.masters {
        let filename = master.filename(document.common_path.as_deref());
        out.start(
            "source",
            &[
                ("filename", filename.as_str()),
                ("name", &master.name),
                ("familyname", &document.family),
                ("stylename", style_name(master, &document.family)),
            ],
        )?;
        if master.is_base {
            for part in ["lib", "groups", "features", "info"] {
                out.empty(part, &[("copy", "1")])?;
            }
        }
        write_dimensions(out, "location", &location(&master.coordinates), &document.axes)?;
        out.end("source")?;
    }
    out.end("sources")
}

fn write_instances(out: &mut XmlOut, document: &Document) -> Result<()> {
    let instances = document.resolved_instances();
    if instances.is_empty() {
        return Ok(());
    }
    let family: String = document.family.split_whitespace().collect();
    out.start("instances", &[])?;
    for instance in &instances {
        let style: String = instance.name.split_whitespace().collect();
        let postscript = if family.is_empty() { style.clone() } else { format!("{family}-{style}") };
        let full_name = if document.family.is_empty() {
            instance.name.clone()
        } else {
            format!("{} {}", document.family, instance.name)
        };
        let filename = format!("instances/{postscript}.ufo");
        out.start(
            "instance",
            &[
                ("name", full_name.as_str()),
                ("familyname", &document.family),
                ("stylename", &instance.name),
                ("filename", &filename),
                ("postscriptfontname", &postscript),
            ],
        )?;
        write_dimensions(out, "location", &location(&instance.coordinates), &document.axes)?;
        out.end("instance")?;
    }
    out.end("instances")
}

fn write_lib(out: &mut XmlOut, document: &Document) -> Result<()> {
    let mut entries = Vec::new();
    if let Some(suffix) = &document.suffix {
        entries.push((LIB_SUFFIX_KEY, suffix.as_str()));
    }
    // Without sources or instances there is nowhere else to carry the family.
    let family_elsewhere = !document.masters.is_empty() || !document.resolved_instances().is_empty();
    if !document.family.is_empty() && !family_elsewhere {
        entries.push((LIB_FAMILY_KEY, document.family.as_str()));
    }
    if entries.is_empty() {
        return Ok(());
    }

    out.start("lib", &[])?;
    out.start("dict", &[])?;
    for (key, value) in entries {
        out.text_element("key", key)?;
        out.text_element("string", value)?;
    }
    out.end("dict")?;
    out.end("lib")
}
