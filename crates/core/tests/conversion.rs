use dssketch::{
    ConversionContext, Error, GlyphUniverse, LabelTable, NoGlyphUniverse, StaticGlyphUniverse, Warning,
    designspace_to_sketch, document::{InstancesSpec, RuleName}, parse_sketch, read_designspace,
    sketch_to_designspace, write_designspace, write_sketch,
};
use pretty_assertions::assert_eq;

const SKETCH: &str = "\
family Roundtrip
suffix .rvrn
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
    Roundtrip-Thin [0, 0]
    Roundtrip-Regular [125, 0] @base
    Roundtrip-Black [1000, 0]
    Roundtrip-ThinItalic [0, 1]

rules
    dollar cent > .rvrn (weight >= 480) \"currency\"
    a > .italic (italic == 1)

instances auto
";

fn context<'a>(labels: &'a LabelTable, glyphs: &'a StaticGlyphUniverse) -> ConversionContext<'a> {
    ConversionContext { labels, glyphs, optimize: true }
}

fn universe(names: &[&str]) -> StaticGlyphUniverse {
    StaticGlyphUniverse(names.iter().copied().collect::<GlyphUniverse>())
}

#[test]
fn sketch_round_trips_through_designspace() {
    let labels = LabelTable::standard();
    let glyphs = universe(&["dollar", "dollar.rvrn", "cent", "cent.rvrn", "a", "a.italic"]);
    let context = context(&labels, &glyphs);

    let original = parse_sketch(SKETCH, &labels).unwrap().value;
    let xml = write_designspace(&original, &context).unwrap();
    assert!(xml.warnings.is_empty(), "{:?}", xml.warnings);

    let read = read_designspace(&xml.value).unwrap().value;
    assert_eq!(read.family, original.family);
    assert_eq!(read.suffix, original.suffix);
    assert_eq!(read.common_path, original.common_path);
    assert_eq!(read.axes, original.axes);
    assert_eq!(read.masters, original.masters);
    assert_eq!(read.rules, original.rules);
    assert_eq!(read.resolved_instances(), original.resolved_instances());

    let sketch = write_sketch(&read, &context).unwrap().value;
    let reparsed = parse_sketch(&sketch, &labels).unwrap().value;
    assert_eq!(reparsed.axes, original.axes);
    assert_eq!(reparsed.rules, original.rules);
    assert_eq!(reparsed.instances, InstancesSpec::Auto);
}

#[test]
fn missing_target_glyph_is_dropped_with_a_warning() {
    let labels = LabelTable::standard();
    let glyphs = universe(&["dollar", "dollar.rvrn", "cent", "a", "a.italic"]);

    let converted = sketch_to_designspace(SKETCH, &context(&labels, &glyphs)).unwrap();
    assert!(converted.value.contains(r#"<sub name="dollar" with="dollar.rvrn"/>"#));
    assert!(!converted.value.contains("cent.rvrn"));
    assert_eq!(
        converted.warnings,
        vec![Warning::TargetGlyphMissing {
            rule: "currency".into(),
            from: "cent".into(),
            to: "cent.rvrn".into(),
        }]
    );
}

#[test]
fn without_glyph_sources_nothing_is_dropped() {
    let labels = LabelTable::standard();
    let context = ConversionContext { labels: &labels, glyphs: &NoGlyphUniverse, optimize: true };
    let converted = sketch_to_designspace(SKETCH, &context).unwrap();
    assert!(converted.value.contains(r#"<sub name="cent" with="cent.rvrn"/>"#));
    assert!(converted.warnings.is_empty());
}

#[test]
fn wildcards_compact_only_when_exact() {
    let xml = r#"<designspace format="5.0">
  <axes><axis tag="wght" name="weight" minimum="100" default="400" maximum="900"/></axes>
  <rules>
    <rule name="ring">
      <conditionset><condition name="weight" minimum="600" maximum="900"/></conditionset>
      <sub name="Aring" with="Aring.alt"/>
      <sub name="Aringacute" with="Aringacute.alt"/>
    </rule>
    <rule name="dollar">
      <conditionset><condition name="weight" minimum="600" maximum="900"/></conditionset>
      <sub name="dollar" with="dollar.alt"/>
      <sub name="dollar.sc" with="dollar.sc.alt"/>
    </rule>
  </rules>
</designspace>"#;
    let labels = LabelTable::standard();
    let glyphs = universe(&[
        "Aring", "Aringacute", "Aring.alt", "Aringacute.alt",
        "dollar", "dollar.sc", "dollarsign", "dollar.alt", "dollar.sc.alt",
    ]);

    let converted = designspace_to_sketch(xml, &context(&labels, &glyphs)).unwrap();
    assert!(converted.value.contains("Aring* > .alt"), "{}", converted.value);
    assert!(converted.value.contains("dollar dollar.sc > .alt"), "{}", converted.value);
    assert!(matches!(
        converted.warnings.as_slice(),
        [Warning::WildcardOverMatchFallback { rule, glyphs, .. }]
            if rule == "dollar" && glyphs.iter().any(|g| g == "dollarsign")
    ));
}

#[test]
fn undefined_variable_names_the_line() {
    let source = "axes\n    wght 100:400:900\naxes hidden\n    XOPQ 20:90:200\navar2\n    [wght=700] > XOPQ=$UNSET\n";
    let err = parse_sketch(source, &LabelTable::standard()).unwrap_err();
    assert!(matches!(err, Error::UndefinedVariable { ref name, line: 6 } if name == "UNSET"));
}

#[test]
fn matrix_rows_must_match_the_header() {
    let source = "\
axes
    wght 100:400:900
axes hidden
    XOPQ 20:90:200
    XOUC 20:90:200
    YOPQ 20:90:200
    YTUC 500:725:800
    YTLC 400:500:600
avar2 matrix
    outputs  XOPQ  XOUC  YOPQ  YTUC  YTLC
    [wght=700]  150  140  80  750
";
    let err = parse_sketch(source, &LabelTable::standard()).unwrap_err();
    assert!(matches!(
        err,
        Error::MatrixColumnMismatch { line: 11, row_index: 1, expected: 5, actual: 4 }
    ), "{err}");
}

#[test]
fn overlay_conflict_keeps_the_later_value() {
    let source = "\
axes
    wght 100:400:900
axes hidden
    YTUC 500:725:800
avar2
    [wght=700] > YTUC=750
    [wght=700] > YTUC=751
";
    let labels = LabelTable::standard();
    let converted = sketch_to_designspace(source, &ConversionContext { labels: &labels, ..Default::default() }).unwrap();
    assert!(converted.value.contains(r#"<dimension name="YTUC" xvalue="751"/>"#));
    assert_eq!(converted.value.matches("<mapping>").count(), 1);
    assert!(matches!(
        converted.warnings.as_slice(),
        [Warning::MergeConflict { axis, old_value, new_value, .. }]
            if axis == "YTUC" && *old_value == 750.0 && *new_value == 751.0
    ));
}

#[test]
fn rule_names_keep_their_origin() {
    let source = "axes\n    wght 100:400:900\nrules\n    a > .alt (weight >= 500)\n    b > .alt (weight >= 500) \"rule3\"\n";
    let labels = LabelTable::standard();
    let xml = sketch_to_designspace(source, &ConversionContext { labels: &labels, ..Default::default() })
        .unwrap()
        .value;
    assert!(xml.contains("<rule>"));
    assert!(xml.contains(r#"<rule name="rule3">"#));

    let read = read_designspace(&xml).unwrap().value;
    assert_eq!(read.rules[0].name, RuleName::Derived(1));
    assert_eq!(read.rules[1].name, RuleName::Explicit("rule3".into()));
}

#[test]
fn legacy_inline_conditions() {
    let xml = r#"<designspace format="4.1">
  <axes><axis tag="wght" name="weight" minimum="100" default="400" maximum="900"/></axes>
  <rules>
    <rule name="heavy">
      <condition name="weight" minimum="600"/>
      <sub name="a" with="a.heavy"/>
    </rule>
  </rules>
</designspace>"#;
    let labels = LabelTable::standard();
    let sketch = designspace_to_sketch(xml, &ConversionContext { labels: &labels, ..Default::default() })
        .unwrap()
        .value;
    assert!(sketch.contains("a > .heavy (weight >= 600) \"heavy\""), "{sketch}");
}

#[test]
fn legacy_top_level_mappings() {
    let xml = r#"<designspace format="5.0">
  <axes>
    <axis tag="wght" name="weight" minimum="100" default="400" maximum="900"/>
    <axis tag="XOPQ" name="XOPQ" minimum="20" default="90" maximum="200" hidden="1"/>
  </axes>
  <mappings>
    <mapping description="bold">
      <input><dimension name="weight" xvalue="700"/></input>
      <output><dimension name="XOPQ" xvalue="150"/></output>
    </mapping>
  </mappings>
</designspace>"#;
    let document = read_designspace(xml).unwrap().value;
    assert_eq!(document.avar2_mappings.len(), 1);
    assert_eq!(document.avar2_mappings[0].name.as_deref(), Some("bold"));
}

#[test]
fn instances_auto_survives_both_directions() {
    let labels = LabelTable::standard();
    let context = ConversionContext { labels: &labels, ..Default::default() };

    let xml = sketch_to_designspace(SKETCH, &context).unwrap().value;
    assert!(xml.contains(r#"stylename="Thin Italic""#), "{xml}");
    assert!(xml.contains(r#"postscriptfontname="Roundtrip-Italic""#), "{xml}");

    let sketch = designspace_to_sketch(&xml, &context).unwrap().value;
    assert!(sketch.contains("instances auto"), "{sketch}");

    let plain = ConversionContext { labels: &labels, optimize: false, ..Default::default() };
    let sketch = designspace_to_sketch(&xml, &plain).unwrap().value;
    assert!(!sketch.contains("instances auto"), "{sketch}");
}

#[test]
fn broken_xml_is_an_error() {
    assert!(matches!(read_designspace("<designspace><axes>"), Err(Error::Xml(_) | Error::InvalidXml(_))));
}

#[test]
fn spaced_axis_names_survive_a_sketch_round_trip() {
    let xml = r#"<designspace format="5.0">
  <axes>
    <axis tag="opsz" name="Optical size" minimum="6" default="12" maximum="72"/>
  </axes>
  <rules>
    <rule name="big">
      <conditionset><condition name="Optical size" minimum="20"/></conditionset>
      <sub name="a" with="a.big"/>
    </rule>
  </rules>
</designspace>"#;
    let labels = LabelTable::standard();
    let read = read_designspace(xml).unwrap().value;
    let sketch = designspace_to_sketch(xml, &ConversionContext { labels: &labels, ..Default::default() })
        .unwrap()
        .value;
    assert!(sketch.contains("a > .big (opsz >= 20) \"big\""), "{sketch}");

    let reparsed = parse_sketch(&sketch, &labels).unwrap().value;
    assert_eq!(reparsed.axes, read.axes);
    assert_eq!(reparsed.rules, read.rules);
}

#[test]
fn discrete_axes_with_many_values_survive_a_sketch_round_trip() {
    let xml = r#"<designspace format="5.0">
  <axes>
    <axis tag="GRAD" name="Grade" values="0 1 2 3" default="0">
      <labels>
        <label uservalue="0" name="G0"/>
        <label uservalue="1" name="G1"/>
        <label uservalue="2" name="G2"/>
        <label uservalue="3" name="G3"/>
      </labels>
    </axis>
  </axes>
</designspace>"#;
    let labels = LabelTable::standard();
    let read = read_designspace(xml).unwrap().value;
    let converted = designspace_to_sketch(xml, &ConversionContext { labels: &labels, ..Default::default() }).unwrap();
    assert!(converted.warnings.is_empty(), "{:?}", converted.warnings);
    assert!(converted.value.contains("Grade GRAD 0,1,2,3 discrete"), "{}", converted.value);

    let reparsed = parse_sketch(&converted.value, &labels).unwrap().value;
    assert_eq!(reparsed.axes, read.axes);
    assert_eq!(reparsed.axes[0].values, vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn compacted_avar2_reads_back_to_the_same_mappings() {
    let source = "\
axes
    wght 100:400:900
        Regular > 400
        Bold > 700
axes hidden
    XOPQ 20:90:200
    XOUC 20:90:200
    YOPQ 20:90:200
    YTUC 500:725:800
    YTLC 400:500:600
    XTRA 300:400:500
avar2 matrix
    outputs  XOPQ  XOUC  YOPQ  YTUC  YTLC  XTRA
    [wght=100]  40  90  30  700  480  380
    [wght=400]  90  90  60  725  500  400
    [wght=900]  160  90  90  760  520  420
avar2
    [wght=250] > XOPQ=60, YTUC=710
    \"bold\" [wght=700] > XOPQ=120, YTUC=740
";
    let labels = LabelTable::standard();
    let original = parse_sketch(source, &labels).unwrap().value;
    let written = write_sketch(&original, &ConversionContext { labels: &labels, ..Default::default() }).unwrap();
    let text = &written.value;
    assert!(text.contains("avar2 vars\n    $XOUC_90 = 90\n"), "{text}");
    assert!(text.contains("avar2 matrix\n"), "{text}");
    assert!(text.contains("avar2\n    [wght=250] > XOPQ=60, YTUC=710\n"), "{text}");
    assert!(text.contains("[wght=Regular]"), "{text}");

    let reparsed = parse_sketch(text, &labels).unwrap().value;
    assert_eq!(reparsed.avar2_mappings, original.avar2_mappings);
}
