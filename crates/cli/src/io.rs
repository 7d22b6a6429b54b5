//! File I/O and input discovery.

use std::{
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use dssketch::config::{DESIGNSPACE_EXTENSION, SKETCH_EXTENSIONS};
use glob::glob;

/// The two document kinds the converter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Sketch,
    Designspace,
}

impl DocumentKind {
    /// Detect the kind from a file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if SKETCH_EXTENSIONS.contains(&extension.as_str()) {
            Some(DocumentKind::Sketch)
        } else if extension == DESIGNSPACE_EXTENSION {
            Some(DocumentKind::Designspace)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Sketch => SKETCH_EXTENSIONS[0],
            DocumentKind::Designspace => DESIGNSPACE_EXTENSION,
        }
    }
}

/// A text document on disk.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Directory that relative source paths in the document resolve against.
    pub fn base_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn read(&self) -> Result<String> {
        read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))
    }

    /// Write `text`, creating the parent directory if needed.
    pub fn write(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        write(&self.path, text).with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Expand input arguments; arguments containing glob characters are
/// expanded, others are taken as-is and must exist.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        if pattern.contains(['*', '?', '[']) {
            let matches: Vec<PathBuf> = glob(pattern)
                .with_context(|| format!("Failed to glob pattern: {pattern}"))?
                .filter_map(Result::ok)
                .collect();
            if matches.is_empty() {
                bail!("No files match {pattern}");
            }
            inputs.extend(matches);
        } else {
            let path = PathBuf::from(pattern);
            if !path.exists() {
                bail!("Input file {} does not exist", path.display());
            }
            inputs.push(path);
        }
    }
    Ok(inputs)
}
