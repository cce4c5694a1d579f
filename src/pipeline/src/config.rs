use std::path::PathBuf;

use located_error::prelude::*;
use parser::{ErrorPolicy, PipelineArgs};

/// PLINK filtering thresholds. Values are kept as strings, and handed over to PLINK verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds {
    pub geno: String,
    pub mind: String,
    pub maf : String,
    pub hwe : String,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            geno: String::from("0.05"),
            mind: String::from("0.1"),
            maf : String::from("0.01"),
            hwe : String::from("1e-6"),
        }
    }
}

/// Every parameter of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub prefix     : String,
    pub exclusion  : Option<PathBuf>,
    pub plink      : PathBuf,
    pub policy     : ErrorPolicy,
    pub threads    : usize,
    pub chromosomes: Vec<u8>,
    pub thresholds : Thresholds,
}

impl PipelineConfig {
    /// Default configuration: autosomes 1 to 22, fail-fast, sequential, no exclusion file.
    pub fn new(prefix: impl Into<String>, plink: impl Into<PathBuf>) -> Self {
        Self {
            prefix     : prefix.into(),
            exclusion  : None,
            plink      : plink.into(),
            policy     : ErrorPolicy::default(),
            threads    : 1,
            chromosomes: (1..=22).collect(),
            thresholds : Thresholds::default(),
        }
    }

    /// Build a configuration from command line arguments. The PLINK executable is resolved here, once.
    ///
    /// # Errors
    /// - if the PLINK executable cannot be found.
    /// - if `--chr` is invalid.
    pub fn from_cli(args: &PipelineArgs) -> Result<Self> {
        let plink = command_runner::resolve_program(&args.plink)
            .loc("While resolving the PLINK executable")?;
        Ok(Self {
            prefix     : args.prefix.clone(),
            exclusion  : args.remove.clone(),
            plink,
            policy     : args.on_error,
            threads    : args.threads,
            chromosomes: args.chromosomes()?,
            thresholds : Thresholds {
                geno: args.geno.clone(),
                mind: args.mind.clone(),
                maf : args.maf.clone(),
                hwe : args.hwe.clone(),
            },
        })
    }

    #[must_use]
    pub fn with_exclusion(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclusion = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Chromosomes are sorted and deduplicated.
    #[must_use]
    pub fn with_chromosomes(mut self, mut chromosomes: Vec<u8>) -> Self {
        chromosomes.sort_unstable();
        chromosomes.dedup();
        self.chromosomes = chromosomes;
        self
    }
}
