use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    str::FromStr,
    ops::RangeInclusive,
    fmt::{self, Display, Formatter},
    ffi::OsStr,
};

use located_error::*;

use clap::{Parser, Subcommand, Args, ArgEnum};
use serde::{Serialize, Deserialize};
use log::debug;
use anyhow::{anyhow, Result};

mod error;
pub use error::ParserError;

/// Highest chromosome code understood by PLINK for human data (26 = MT).
pub const MAX_CHROMOSOME_CODE: u8 = 26;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[clap(name="plinkqc-rs", author, version, about, long_about = None)]
#[clap(propagate_version = true)]
/// plinkqc-rs: PLINK quality-control and per-chromosome VCF export pipeline
pub struct Cli {
    ///Set the verbosity level (-v -vv -vvv)
    ///
    /// Set the verbosity level of this program. Multiple levels allowed {n}
    ///
    /// -v: Debug  |  -vv: Trace {n}
    ///
    /// Note that the program will still report every executed command by default.
    /// Use The --quiet/-q flag to only display errors.
    #[clap(short='v', long, parse(from_occurrences), global=true)]
    pub verbose: u8,

    /// Only display errors.
    ///
    /// By default, executed commands and warnings are redirected to the console, even when verbose mode is off.
    /// Use this argument to disable this.
    #[clap(short='q', long, global=true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli {
    /// Logger verbosity implied by `--quiet` and `--verbose`. Info is the default.
    pub fn verbosity(&self) -> u8 {
        if self.quiet {0} else {self.verbose.saturating_add(2)}
    }

    /// Serialize command line arguments within a `.yaml` file, and return its path.
    ///
    /// # Behavior
    /// - Only the `run` subcommand gets serialized. Other subcommands return `Ok(None)`
    /// - File naming follows the convention '{current time}-plinkqc-run.yaml'. current time follows the format
    ///   `YYYY`-`MM`-`DD`T`hhmmss`
    /// - File is written within the directory of the user-provided `--prefix`.
    ///
    /// # Errors
    /// - if `serde_yaml` fails to serialize `Self`
    /// - if the output file cannot be written.
    pub fn serialize(&self) -> Result<Option<PathBuf>> {
        let Commands::Run{pipeline} = &self.commands else {
            return Ok(None)
        };

        let serialized = serde_yaml::to_string(&self)
            .map_err(ParserError::SerializeArgs)
            .loc("While serializing command line arguments")?;

        debug!("\n---- Command line args ----\n{}\n---", serialized);

        let current_time = chrono::offset::Local::now().format("%Y-%m-%dT%H%M%S").to_string();
        let output_file  = pipeline.prefix_dir().join(format!("{current_time}-plinkqc-run.yaml"));

        fs::write(&output_file, serialized)
            .map_err(|source| ParserError::WriteYaml{path: output_file.clone(), source})
            .loc("While serializing command line arguments")?;
        Ok(Some(output_file))
    }

    /// Deserialize a `.yaml` file into Command line arguments.
    ///
    /// # Errors
    /// - if the provided `.yaml` does not exist or does not carry read permissions
    /// - if `serde_yaml` fails to parse the provided file to `Self`.
    pub fn deserialize(yaml: &Path) -> Result<Self> {
        let loc_msg = || format!("While loading command line arguments from {}", yaml.display());
        let file = File::open(yaml)
            .map_err(|source| ParserError::OpenYaml{path: yaml.to_path_buf(), source})
            .with_loc(loc_msg)?;
        serde_yaml::from_reader(file)
            .map_err(|source| ParserError::DeserializeArgs{path: yaml.to_path_buf(), source})
            .with_loc(loc_msg)
    }
}

#[derive(Subcommand, Debug, Serialize, Deserialize)]
pub enum Commands {
    /// Run the PLINK quality-control pipeline.
    ///
    /// Convert a PLINK text fileset to binary, remove duplicate individuals, apply the variant/individual
    /// missingness, minor allele frequency and Hardy-Weinberg filters, restrict to the requested chromosomes
    /// and finally export one binary fileset and one VCF file per chromosome.
    Run {
        #[clap(flatten)]
        pipeline: PipelineArgs,
    },

    /// Remove duplicate individual IDs from a PLINK .fam file, in place.
    ///
    /// The first record of every individual ID is kept, in file order.
    Dedup {
        #[clap(parse(try_from_os_str=valid_input_file))]
        fam: PathBuf,
    },

    /// Run plinkqc-rs using a previously generated .yaml configuration file.
    ///
    /// This allows users to easily re-apply a pipeline using the exact same parameters and arguments.
    FromYaml {
        yaml: PathBuf,
    },
}

/// Behavior of the pipeline whenever a step fails.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ArgEnum, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Abort the pipeline on the first failed step.
    FailFast,
    /// Report failed steps and keep running the next ones.
    Continue,
}

impl Default for ErrorPolicy {
    fn default() -> Self {Self::FailFast}
}

impl Display for ErrorPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail-fast"),
            Self::Continue => write!(f, "continue"),
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArgs {
    /// Prefix of the input PLINK text fileset (.ped/.map).
    ///
    /// Every output file is named after this prefix, followed by a step-specific suffix. e.g.:{n}
    ///   '--prefix data/sample' => data/sample_binary.bed, data/sample_hwe_filtered.bed, data/sample_filtered_chr1.vcf{n}
    #[clap(short='p', long)]
    pub prefix: String,

    /// File listing individuals to remove during the final filtering step.
    ///
    /// Expected format is the one of PLINK's --remove argument: a space or tab separated file
    /// with columns 'FID IID'.
    #[clap(short='r', long, parse(try_from_os_str=valid_input_file))]
    pub remove: Option<PathBuf>,

    /// Path to the PLINK executable.
    ///
    /// Bare program names are searched within the directories of the $PATH environment variable.
    #[clap(short='P', long, env="PLINKQC_PLINK", default_value("plink"))]
    pub plink: String,

    /// Behavior of the pipeline when an external command fails.
    ///
    /// fail-fast: abort on the first failing step. {n}
    /// continue:  report failures and keep running every remaining step, even if its input files are missing.
    #[clap(short='e', long, arg_enum, default_value("fail-fast"))]
    pub on_error: ErrorPolicy,

    /// Number of chromosomes to split and export in parallel.
    ///
    /// Using a single thread runs every chromosome sequentially, in ascending order.
    #[clap(short='@', long, default_value("1"), parse(try_from_str=valid_thread_count))]
    pub threads: usize,

    /// Chromosomes to keep, split and export.
    ///
    /// Argument may accept slices (inclusive) such as '--chr 9-11' and/or discrete integers such as '--chr 1 4 13'.{n}
    /// Example:{n}
    ///   specifying          : '--chr 9-11 13 19-22 '{n}
    ///   ...will be parsed as: [9, 10, 11, 13, 19, 20, 21, 22]
    #[clap(short, long, multiple_values(true), default_values(&["1-22"]))]
    pub chr: Vec<String>,

    /// Maximum per-variant missing call rate (PLINK --geno).
    #[clap(long, default_value("0.05"), parse(try_from_str=valid_ratio))]
    pub geno: String,

    /// Maximum per-individual missing call rate (PLINK --mind).
    #[clap(long, default_value("0.1"), parse(try_from_str=valid_ratio))]
    pub mind: String,

    /// Minimum minor allele frequency (PLINK --maf).
    #[clap(long, default_value("0.01"), parse(try_from_str=valid_ratio))]
    pub maf: String,

    /// Hardy-Weinberg equilibrium exact test p-value threshold (PLINK --hwe).
    #[clap(long, default_value("1e-6"), parse(try_from_str=valid_ratio))]
    pub hwe: String,
}

impl PipelineArgs {
    /// Directory holding the files of `--prefix`. Defaults to the current directory.
    pub fn prefix_dir(&self) -> PathBuf {
        match Path::new(&self.prefix).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _                                         => PathBuf::from("."),
        }
    }

    /// Parse and validate `--chr` into a sorted, deduplicated list of chromosome codes.
    ///
    /// # Errors
    /// - if any of the provided ranges cannot be parsed, or yields an empty set.
    /// - if any chromosome lies outside of `1..=MAX_CHROMOSOME_CODE`
    pub fn chromosomes(&self) -> Result<Vec<u8>> {
        let loc_msg = "While parsing the requested chromosomes";
        // Parsed wider than u8, so that out of range codes are reported as such.
        let chromosomes: Vec<u16> = parse_user_ranges(&self.chr, "chr").loc(loc_msg)?;
        if chromosomes.is_empty() {
            return Err(ParserError::EmptyRange("chr".to_string())).loc(loc_msg)
        }
        if let Some(chr) = chromosomes.iter().find(|&&chr| chr == 0 || chr > u16::from(MAX_CHROMOSOME_CODE)) {
            return Err(ParserError::InvalidChromosome(*chr)).loc(loc_msg)
        }
        Ok(chromosomes.into_iter().filter_map(|chr| u8::try_from(chr).ok()).collect())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FileEntity {File, Directory}

impl Display for FileEntity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::File      => write!(f, "File"),
            Self::Directory => write!(f, "Directory"),
        }
    }
}

impl FileEntity {
    fn validate(self, path: &Path) -> Result<(), ParserError> {
        use ParserError::InvalidFileEntity;
        let valid = match self {
            Self::File      => path.is_file(),
            Self::Directory => path.is_dir()
        };

        if valid {
            Ok(())
        } else {
            Err(InvalidFileEntity(self, path.display().to_string()))
        }
    }
}

fn assert_filesystem_entity_is_valid(s: &OsStr, entity: FileEntity) -> Result<()> {
    use ParserError::MissingFileEntity;
    let path = Path::new(s);
    if ! path.exists() {
        return Err(MissingFileEntity(entity, path.display().to_string()))
            .loc("While parsing arguments.")
    }

    entity.validate(path).loc("While parsing arguments.")
}

fn valid_input_file(s: &OsStr) -> Result<PathBuf> {
    assert_filesystem_entity_is_valid(s, FileEntity::File)
        .loc("While checking for file validity")?;
    Ok(PathBuf::from(s))
}

/// Ensure a filtering threshold is a number within [0, 1]. The original string is kept as-is, so that
/// PLINK receives exactly what the user typed (e.g. '1e-6').
fn valid_ratio(s: &str) -> Result<String> {
    use ParserError::ParseRatio;
    const MIN_RATIO: f64 = 0.0;
    const MAX_RATIO: f64 = 1.0;

    let ratio = s.parse::<f64>().with_loc(|| format!("While parsing {s}"))?;
    match (MIN_RATIO..=MAX_RATIO).contains(&ratio) {
        true  => Ok(s.to_string()),
        false => Err(anyhow!(ParseRatio(MIN_RATIO, MAX_RATIO, s.to_string()))).with_loc(|| format!("While parsing {s}"))
    }
}

fn valid_thread_count(s: &str) -> Result<usize> {
    let threads = s.parse::<usize>().with_loc(|| format!("While parsing {s}"))?;
    match threads {
        0 => Err(anyhow!(ParserError::InvalidThreadCount)).loc("While parsing --threads"),
        n => Ok(n),
    }
}

/// Convert a user-defined string "range" into a vector of integers.
/// "9-14" thus becomes [9, 10, 11, 12, 13, 14]
/// Note that the range is fully inclusive, up to `T::MAX`.
fn parse_user_range<T>(s: &str) -> Result<Vec<T>, <T as FromStr>::Err>
where   T                : FromStr + Ord,
        RangeInclusive<T>: Iterator<Item = T>,
{
    match s.split_once('-') {
            Some(t) => Ok((t.0.parse::<T>()?..=t.1.parse::<T>()?).collect::<Vec<T>>()),
            None    => Ok(vec![s.parse::<T>()?])
    }
}

/// Convert a vector of Strings with user-input ranges to a single, sorted and deduplicated vector of integers.
///
/// ```
/// let ranges = ["1-6", "8"].map(String::from);
/// let parsed: Vec<u8> = parser::parse_user_ranges(&ranges, "chr").unwrap();
/// assert_eq!(parsed, [1, 2, 3, 4, 5, 6, 8]);
/// ```
///
/// # Errors
///  returns a `ParseArg` error if the provided ranges cannot be parsed into integers.
pub fn parse_user_ranges<T>(ranges: &[String], arg: &str) -> Result<Vec<T>, ParserError>
where   T                   : FromStr + Ord,
        RangeInclusive<T>   : Iterator<Item = T>,
        <T as FromStr>::Err : ToString,
{
    let mut parsed_ranges = Vec::new();
    for range in ranges {
        let values = parse_user_range(range)
            .map_err(|err| ParserError::ParseArg{arg: arg.to_string(), err: err.to_string()})?;
        parsed_ranges.extend(values);
    }
    parsed_ranges.sort();
    parsed_ranges.dedup();
    Ok(parsed_ranges)
}
