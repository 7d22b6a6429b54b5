//! Designspace XML to [`Document`].

use indexmap::IndexMap;
use log::{debug, info};

use super::tree::{Element, parse};
use crate::{
    avar2::{Avar2Entry, merge_entries},
    condition::AxisCondition,
    config::{LIB_FAMILY_KEY, LIB_SUFFIX_KEY},
    diagnostics::{Converted, Diagnostics},
    document::{
        AxisLabel, AxisSpec, Document, GlyphPattern, InstanceSpec, InstancesSpec, MapPoint,
        MasterSpec, RuleName, RuleSpec, Target, find_axis,
    },
    error::{Error, Result},
    glyph::GlyphName,
    pattern::common_suffix,
};

/// Read a designspace document.
pub fn read(text: &str) -> Result<Converted<Document>> {
    let root = parse(text)?;
    if root.name != "designspace" {
        return Err(Error::invalid_xml(format!("expected <designspace>, found <{}>", root.name)));
    }
    let mut diagnostics = Diagnostics::new();
    let lib = read_lib(&root);

    let axes_element = root.child("axes");
    let axes = axes_element
        .map(|axes| axes.children_named("axis").map(read_axis).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    let mut document = Document::new("");
    document.axes = axes;
    document.suffix = lib.get(LIB_SUFFIX_KEY).cloned();

    let sources: Vec<&Element> =
        root.child("sources").map(|s| s.children_named("source").collect()).unwrap_or_default();
    let instances: Vec<&Element> =
        root.child("instances").map(|i| i.children_named("instance").collect()).unwrap_or_default();

    document.family = instances
        .iter()
        .chain(&sources)
        .find_map(|element| element.attr("familyname"))
        .map(str::to_owned)
        .or_else(|| lib.get(LIB_FAMILY_KEY).cloned())
        .unwrap_or_default();

    read_sources(&mut document, &sources)?;
    document.rules = match root.child("rules") {
        Some(rules) => read_rules(rules, &document.axes)?,
        None => Vec::new(),
    };

    let instances = instances
        .into_iter()
        .map(|instance| read_instance(instance, &document.axes))
        .collect::<Result<Vec<_>>>()?;
    document.instances = InstancesSpec::Explicit(instances);

    let mappings = axes_element
        .and_then(|axes| axes.child("mappings"))
        .into_iter()
        .chain(root.child("mappings"))
        .flat_map(|mappings| mappings.children_named("mapping"))
        .map(|mapping| read_mapping(mapping, &document.axes))
        .collect::<Result<Vec<_>>>()?;
    document.avar2_mappings = merge_entries(mappings, &mut diagnostics);

    document.validate()?;
    info!(
        "read designspace: {} axes, {} masters, {} rules",
        document.axes.len(),
        document.masters.len(),
        document.rules.len()
    );
    Ok(Converted::new(document, diagnostics))
}

/// `<lib><dict>` string entries.
fn read_lib(root: &Element) -> IndexMap<String, String> {
    let Some(dict) = root.child("lib").and_then(|lib| lib.child("dict")) else {
        return IndexMap::new();
    };
    dict.children
        .iter()
        .zip(dict.children.iter().skip(1))
        .filter(|(key, value)| key.name == "key" && value.name == "string")
        .map(|(key, value)| (key.text.clone(), value.text.clone()))
        .collect()
}

fn read_axis(element: &Element) -> Result<AxisSpec> {
    let tag = element.required("tag")?.to_owned();
    let name = element.attr("name").map_or_else(|| tag.clone(), str::to_owned);

    let mut axis = match element.attr("values") {
        Some(values) => {
            let values = values
                .split_whitespace()
                .map(|value| {
                    value.parse::<f64>().map_err(|_| {
                        Error::invalid_xml(format!("axis '{tag}': '{value}' in values is not a number"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            AxisSpec::discrete(tag.clone(), name, values, element.required_number("default")?)
        }
        None => AxisSpec::new(
            tag.clone(),
            name,
            element.required_number("minimum")?,
            element.required_number("default")?,
            element.required_number("maximum")?,
        ),
    };
    axis.hidden = element.flag("hidden");

    axis.map = element
        .children_named("map")
        .map(|map| Ok(MapPoint { user: map.required_number("input")?, design: map.required_number("output")? }))
        .collect::<Result<Vec<_>>>()?;

    // Label design values come from the map; the map points that labels
    // cover are then carried by the labels themselves.
    let labels = element
        .child("labels")
        .map(|labels| labels.children_named("label").collect::<Vec<_>>())
        .unwrap_or_default();
    let mut axis_labels = Vec::with_capacity(labels.len());
    for label in labels {
        let user_value = label.required_number("uservalue")?;
        axis_labels.push(AxisLabel {
            name: label.required("name")?.to_owned(),
            user_value,
            design_value: axis.user_to_design(user_value),
            elidable: label.flag("elidable"),
        });
    }
    axis.map.retain(|point| !axis_labels.iter().any(|label| label.user_value == point.user));
    axis.labels = axis_labels;

    axis.check().map_err(|message| Error::InvalidAxis { tag, message })?;
    Ok(axis)
}

/// `<dimension name=... xvalue=...>` children as design coordinates keyed
/// by tag. `uservalue` dimensions are mapped to design space.
fn read_location(element: Option<&Element>, axes: &[AxisSpec]) -> Result<IndexMap<String, f64>> {
    let mut location = IndexMap::new();
    let Some(element) = element else {
        return Ok(location);
    };
    for dimension in element.children_named("dimension") {
        let name = dimension.required("name")?;
        let axis = find_axis(axes, name)
            .ok_or_else(|| Error::AxisNotFound { axis: name.to_owned(), line: None })?;
        let value = match (dimension.number("xvalue")?, dimension.number("uservalue")?) {
            (Some(design), _) => design,
            (None, Some(user)) => axis.user_to_design(user),
            (None, None) => {
                return Err(Error::invalid_xml(format!("<dimension name=\"{name}\"> has no value")));
            }
        };
        location.insert(axis.tag.clone(), value);
    }
    Ok(location)
}

/// A location with every axis present, in axis order.
fn full_location(partial: IndexMap<String, f64>, axes: &[AxisSpec]) -> IndexMap<String, f64> {
    axes.iter()
        .map(|axis| {
            let value = partial.get(&axis.tag).copied().unwrap_or_else(|| axis.user_to_design(axis.default));
            (axis.tag.clone(), value)
        })
        .collect()
}

fn read_sources(document: &mut Document, sources: &[&Element]) -> Result<()> {
    let mut directories = Vec::with_capacity(sources.len());
    for source in sources {
        let filename = source.required("filename")?;
        let (directory, file) = match filename.rsplit_once('/') {
            Some((directory, file)) => (Some(directory.to_owned()), file),
            None => (None, filename),
        };
        let name = file.strip_suffix(".ufo").unwrap_or(file).to_owned();
        let is_base = ["lib", "groups", "features", "info"]
            .iter()
            .any(|part| source.child(part).is_some_and(|child| child.flag("copy")));
        let location = read_location(source.child("location"), &document.axes)?;

        directories.push(directory);
        document.masters.push(MasterSpec {
            name,
            coordinates: full_location(location, &document.axes),
            path_override: None,
            is_base,
        });
    }

    let shared = match directories.split_first() {
        Some((Some(first), rest)) if rest.iter().all(|d| d.as_deref() == Some(first.as_str())) => {
            Some(first.clone())
        }
        _ => None,
    };
    if shared.is_some() {
        document.common_path = shared;
    } else {
        for (master, directory) in document.masters.iter_mut().zip(directories) {
            master.path_override = directory;
        }
    }
    Ok(())
}

/// Each `<rule>` becomes one or more [`RuleSpec`]s: one per condition set,
/// and, when the substitutions do not share a suffix, one per substitution.
fn read_rules(rules: &Element, axes: &[AxisSpec]) -> Result<Vec<RuleSpec>> {
    let mut specs = Vec::new();
    let mut unnamed = 0;
    for rule in rules.children_named("rule") {
        let name = match rule.attr("name") {
            Some(name) => RuleName::Explicit(name.to_owned()),
            None => {
                unnamed += 1;
                RuleName::Derived(unnamed)
            }
        };

        let pairs = rule
            .children_named("sub")
            .map(|sub| Ok((GlyphName::new(sub.required("name")?), GlyphName::new(sub.required("with")?))))
            .collect::<Result<Vec<_>>>()?;
        if pairs.is_empty() {
            debug!("skipping rule '{name}' without substitutions");
            continue;
        }

        let condition = |element: &Element| -> Result<AxisCondition> {
            let reference = element.required("name")?;
            let axis = find_axis(axes, reference)
                .ok_or_else(|| Error::AxisNotFound { axis: reference.to_owned(), line: None })?;
            Ok(AxisCondition::from_xml_bounds(axis, element.number("minimum")?, element.number("maximum")?))
        };
        let mut condition_sets = Vec::new();
        let inline = rule.children_named("condition").map(condition).collect::<Result<Vec<_>>>()?;
        if !inline.is_empty() {
            condition_sets.push(inline);
        }
        for set in rule.children_named("conditionset") {
            condition_sets.push(set.children_named("condition").map(condition).collect::<Result<Vec<_>>>()?);
        }
        if condition_sets.is_empty() {
            condition_sets.push(Vec::new());
        }

        let bodies: Vec<(Vec<GlyphPattern>, Target)> = match common_suffix(&pairs) {
            Some(suffix) => vec![(
                pairs.iter().map(|(from, _)| GlyphPattern::Literal(from.clone())).collect(),
                Target::Suffix(suffix),
            )],
            None => pairs
                .into_iter()
                .map(|(from, to)| (vec![GlyphPattern::Literal(from)], Target::Glyph(to)))
                .collect(),
        };
        for conditions in condition_sets {
            for (substitution_patterns, target) in &bodies {
                specs.push(RuleSpec {
                    name: name.clone(),
                    substitution_patterns: substitution_patterns.clone(),
                    target: target.clone(),
                    conditions: conditions.clone(),
                });
            }
        }
    }
    Ok(specs)
}

fn read_instance(element: &Element, axes: &[AxisSpec]) -> Result<InstanceSpec> {
    let name = element
        .attr("stylename")
        .or_else(|| element.attr("name"))
        .ok_or_else(|| Error::invalid_xml("<instance> has neither 'stylename' nor 'name'"))?
        .to_owned();
    let location = read_location(element.child("location"), axes)?;
    Ok(InstanceSpec { name, coordinates: full_location(location, axes) })
}

fn read_mapping(element: &Element, axes: &[AxisSpec]) -> Result<Avar2Entry> {
    let input = element
        .child("input")
        .ok_or_else(|| Error::invalid_xml("<mapping> is missing <input>"))?;
    let output = element
        .child("output")
        .ok_or_else(|| Error::invalid_xml("<mapping> is missing <output>"))?;
    let inputs = read_location(Some(input), axes)?.into_iter().collect();
    let mut entry = Avar2Entry::new(inputs, read_location(Some(output), axes)?);
    entry.name = element.attr("description").map(str::to_owned);
    Ok(entry)
}
