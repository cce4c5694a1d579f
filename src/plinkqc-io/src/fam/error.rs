use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FamError {
    #[error("Line n°{lineno} of the pedigree file must contain at least two fields (FID IID). Got: '{line}'")]
    Format{lineno: usize, line: String},

    #[error("Failed to read pedigree file '{}'", path.display())]
    Read{path: PathBuf, #[source] source: std::io::Error},

    #[error("Failed to write temporary pedigree file within '{}'", dir.display())]
    Write{dir: PathBuf, #[source] source: std::io::Error},

    #[error("Failed to replace '{}' with its deduplicated version", path.display())]
    Persist{path: PathBuf, #[source] source: std::io::Error},
}
