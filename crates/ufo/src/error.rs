//! Error types for reading UFO sources.

use std::{path::PathBuf, result};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} is not a UFO directory")]
    NotAUfo(PathBuf),

    #[error("missing {0}")]
    MissingFile(PathBuf),

    #[error("failed to read {path}: {source}")]
    Plist {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },
}

pub type Result<T> = result::Result<T, Error>;
