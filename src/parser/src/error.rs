use std::path::PathBuf;

use thiserror::Error;
use crate::FileEntity;

#[derive(Error, Debug)]
pub enum ParserError{
    #[error("Invalid slice or value format for --{arg}. [{err}]")]
    ParseArg{arg: String, err: String},

    #[error("--{0} yielded an empty set of values. Note that ranges must be increasing (e.g. '1-22')")]
    EmptyRange(String),

    #[error("Invalid chromosome '{0}'. PLINK chromosome codes must lie between 1 and 26")]
    InvalidChromosome(u16),

    #[error("{0} {1} does not exist")]
    MissingFileEntity(FileEntity, String),

    #[error("{1} is not a {0}")]
    InvalidFileEntity(FileEntity, String),

    #[error("The provided value must lie between {0} and {1}. Got {2}")]
    ParseRatio(f64, f64, String),

    #[error("--threads must be greater than 0")]
    InvalidThreadCount,

    #[error("Failed to serialize command line arguments")]
    SerializeArgs(#[source] serde_yaml::Error),

    #[error("Unable to write command line arguments into '{}'", path.display())]
    WriteYaml{path: PathBuf, #[source] source: std::io::Error},

    #[error("Unable to open '{}'", path.display())]
    OpenYaml{path: PathBuf, #[source] source: std::io::Error},

    #[error("Unable to deserialize arguments from '{}'", path.display())]
    DeserializeArgs{path: PathBuf, #[source] source: serde_yaml::Error},
}
