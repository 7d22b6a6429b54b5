//! Checks that the masters a document names exist and look like UFOs.

use std::{fmt, path::Path};

use dssketch::SourceFile;
use log::info;

const REQUIRED_FILES: &[&str] = &["metainfo.plist", "fontinfo.plist"];

/// A problem with one master source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceProblem {
    /// The path does not exist.
    Missing { source: String, path: String },
    /// The path exists but is not a well-formed UFO.
    Invalid { source: String, path: String, reason: String },
    /// The filename does not end in `.ufo`.
    NotUfo { source: String, path: String },
}

impl fmt::Display for SourceProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceProblem::Missing { source, path } => write!(f, "master '{source}': {path} not found"),
            SourceProblem::Invalid { source, path, reason } => {
                write!(f, "master '{source}': {path} is not a valid UFO ({reason})")
            }
            SourceProblem::NotUfo { source, path } => {
                write!(f, "master '{source}': {path} is not a .ufo file")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub checked: usize,
    pub problems: Vec<SourceProblem>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    /// Whether every problem is a missing path.
    pub fn only_missing(&self) -> bool {
        self.problems.iter().all(|problem| matches!(problem, SourceProblem::Missing { .. }))
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "{} sources ok", self.checked);
        }
        write!(f, "{} of {} sources have problems:", self.problems.len(), self.checked)?;
        for problem in &self.problems {
            write!(f, "\n  {problem}")?;
        }
        Ok(())
    }
}

fn ufo_problem(path: &Path) -> Option<String> {
    if !path.is_dir() {
        return Some("not a directory".to_owned());
    }
    if let Some(file) = REQUIRED_FILES.iter().find(|file| !path.join(file).is_file()) {
        return Some(format!("missing {file}"));
    }
    if !path.join("glyphs").is_dir() && !path.join("layercontents.plist").is_file() {
        return Some("missing glyphs/".to_owned());
    }
    None
}

/// Check every source against the filesystem, relative to `base_dir`.
pub fn validate_sources(base_dir: &Path, sources: &[SourceFile]) -> ValidationReport {
    let mut report = ValidationReport { checked: sources.len(), problems: Vec::new() };
    for source in sources {
        let name = source.name.clone();
        let display = source.filename.clone();
        if !source.filename.ends_with(".ufo") {
            report.problems.push(SourceProblem::NotUfo { source: name, path: display });
            continue;
        }
        let path = base_dir.join(&source.filename);
        if !path.exists() {
            report.problems.push(SourceProblem::Missing { source: name, path: display });
        } else if let Some(reason) = ufo_problem(&path) {
            report.problems.push(SourceProblem::Invalid { source: name, path: display, reason });
        }
    }
    info!("validated {} sources, {} problems", report.checked, report.problems.len());
    report
}
