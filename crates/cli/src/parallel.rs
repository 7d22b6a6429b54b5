//! Parallel batch conversion.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;

/// Result of a parallel batch operation.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn ok_or_bail(&self, operation: &str) -> Result<()> {
        if self.failed > 0 {
            bail!("{operation} failed: {} succeeded, {} failed", self.succeeded, self.failed);
        }
        Ok(())
    }
}

/// Run `op` on every file in parallel, reporting each failure on stderr.
///
/// One file failing does not stop the others.
pub fn run_parallel<F>(label: &str, items: &[PathBuf], op: F) -> BatchResult
where
    F: Fn(&Path) -> Result<()> + Sync,
{
    let results: Vec<Result<()>> = items
        .par_iter()
        .map(|path| op(path).with_context(|| format!("Failed to convert {}", path.display())))
        .collect();

    let mut result = BatchResult::default();
    for r in &results {
        if let Err(e) = r {
            eprintln!("{e:?}");
            result.failed += 1;
        } else {
            result.succeeded += 1;
        }
    }

    if result.total() > 1 {
        println!("{label}: {} succeeded, {} failed", result.succeeded, result.failed);
    }
    result
}
