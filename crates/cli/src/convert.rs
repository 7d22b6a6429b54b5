//! One conversion run per input file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dssketch::{
    ConversionContext, Converted, Document, LabelTable, Warning, parse_sketch, read_designspace,
    write_designspace, write_sketch,
};
use dssketch_ufo::{UfoGlyphUniverse, ValidationReport, validate_sources};
use log::{info, warn};

use crate::io::{DocumentFile, DocumentKind};

/// Output format requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Opposite of the input format.
    #[default]
    Auto,
    Dssketch,
    /// Alias for `dssketch`.
    Dss,
    Designspace,
}

impl OutputFormat {
    /// The kind to write for an input of kind `input`.
    fn target(self, input: DocumentKind) -> DocumentKind {
        match self {
            OutputFormat::Auto => match input {
                DocumentKind::Sketch => DocumentKind::Designspace,
                DocumentKind::Designspace => DocumentKind::Sketch,
            },
            OutputFormat::Dssketch | OutputFormat::Dss => DocumentKind::Sketch,
            OutputFormat::Designspace => DocumentKind::Designspace,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub format: OutputFormat,
    /// Check that master UFOs exist and are well formed before converting.
    pub validate: bool,
    /// Report source problems instead of failing on them.
    pub allow_missing_ufos: bool,
    pub optimize: bool,
    /// Treat any warning as a failure.
    pub strict: bool,
}

/// Where a run wrote to and what it warned about.
#[derive(Debug)]
pub struct Outcome {
    pub output: PathBuf,
    pub warnings: Vec<Warning>,
}

/// Read `input` as the kind its extension names.
pub fn load(input: &Path, labels: &LabelTable) -> Result<(DocumentKind, Converted<Document>)> {
    let kind = DocumentKind::from_path(input).with_context(|| {
        format!("Cannot detect the format of {}; expected .dssketch, .dss or .designspace", input.display())
    })?;
    let text = DocumentFile::new(input).read()?;
    let document = match kind {
        DocumentKind::Sketch => parse_sketch(&text, labels),
        DocumentKind::Designspace => read_designspace(&text),
    }
    .with_context(|| format!("Failed to load {}", input.display()))?;
    Ok((kind, document))
}

fn check_sources(report: &ValidationReport, allow_missing: bool) -> Result<()> {
    if report.is_ok() {
        info!("{report}");
        return Ok(());
    }
    if allow_missing {
        warn!("{report}");
        return Ok(());
    }
    bail!("{report}\nUse --allow-missing-ufos to continue despite these problems")
}

/// Convert `input`, writing to `output` or next to the input.
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    options: &ConvertOptions,
    labels: &LabelTable,
) -> Result<Outcome> {
    let (kind, loaded) = load(input, labels)?;
    let target = options.format.target(kind);
    if target == kind {
        bail!("{} is already a .{} file", input.display(), kind.extension());
    }
    let file = DocumentFile::new(input);
    let document = loaded.value;

    if options.validate && kind == DocumentKind::Sketch {
        check_sources(&validate_sources(file.base_dir(), &document.source_files()), options.allow_missing_ufos)?;
    }

    let glyphs = UfoGlyphUniverse::new(file.base_dir());
    let context = ConversionContext { labels, glyphs: &glyphs, optimize: options.optimize };
    let written = match target {
        DocumentKind::Designspace => write_designspace(&document, &context)?,
        DocumentKind::Sketch => write_sketch(&document, &context)?,
    };

    let mut warnings = loaded.warnings;
    warnings.extend(written.warnings);
    if options.strict && !warnings.is_empty() {
        let list = warnings.iter().map(|w| format!("  {w}")).collect::<Vec<_>>().join("\n");
        bail!("{} produced {} warnings:\n{list}", input.display(), warnings.len());
    }

    let output = output.map_or_else(|| input.with_extension(target.extension()), Path::to_path_buf);
    DocumentFile::new(&output).write(&written.value)?;
    println!("Converted {} -> {}", input.display(), output.display());
    Ok(Outcome { output, warnings })
}
