//! Configuration constants for sketch and designspace conversion.

/// File extensions recognised as Sketch format.
pub const SKETCH_EXTENSIONS: &[&str] = &["dssketch", "dss"];

/// File extension of designspace XML documents.
pub const DESIGNSPACE_EXTENSION: &str = "designspace";

/// Designspace format version written by the XML writer.
pub const DESIGNSPACE_FORMAT: &str = "5.0";

/// `<lib>` key carrying the sketch `suffix`.
pub const LIB_SUFFIX_KEY: &str = "dssketch.suffix";

/// `<lib>` key carrying the family name when no source or instance has one.
pub const LIB_FAMILY_KEY: &str = "dssketch.family";

/// Columns a tab counts for when measuring indentation.
pub const TAB_WIDTH: usize = 4;

/// Shortest prefix a wildcard may be built from.
pub const MIN_WILDCARD_PREFIX: usize = 3;

/// avar2 runs with at least this many output axes are written as a matrix.
pub const MATRIX_MIN_OUTPUTS: usize = 6;

/// An avar2 output value used at least this many times becomes a variable.
pub const VARIABLE_MIN_REPEATS: usize = 3;

/// Style name of an auto instance whose labels are all elidable.
pub const DEFAULT_STYLE_NAME: &str = "Regular";
