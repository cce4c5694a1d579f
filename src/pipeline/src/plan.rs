use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

use command_runner::Invocation;

use crate::PipelineConfig;

// ---- Output file suffixes. Each step reads the output of the previous one.
pub const BINARY        : &str = "_binary";
pub const SNP_CALLRATE  : &str = "_snp_callrate_filtered";
pub const INDIV_CALLRATE: &str = "_indiv_callrate_filtered";
pub const MAF_FILTERED  : &str = "_maf_filtered";
pub const HWE_FILTERED  : &str = "_hwe_filtered";
pub const AUTOSOMES     : &str = "_autosomes";
pub const FILTERED      : &str = "_filtered";

/// Suffix of the per-chromosome binary fileset and VCF file.
pub fn chromosome_suffix(chr: u8) -> String {
    format!("{FILTERED}_chr{chr}")
}

/// Render a sorted list of chromosomes in PLINK's compact `--chr` syntax. e.g. [1, 2, 3, 5, 7, 8] => "1-3,5,7-8"
pub fn format_chr_ranges(chromosomes: &[u8]) -> String {
    let mut runs: Vec<(u8, u8)> = Vec::new();
    for &chr in chromosomes {
        let extends_last_run = runs.last().is_some_and(|&(_, end)| end.checked_add(1) == Some(chr));
        match (extends_last_run, runs.last_mut()) {
            (true, Some(run)) => run.1 = chr,
            _                 => runs.push((chr, chr)),
        }
    }
    runs.iter()
        .map(|(start, end)| if start == end {start.to_string()} else {format!("{start}-{end}")})
        .collect::<Vec<String>>()
        .join(",")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Plink(Invocation),
    /// Remove duplicate individual IDs from a `.fam` file.
    Dedup(PathBuf),
}

/// One labelled pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label : String,
    pub action: Action,
}

impl Step {
    fn plink(label: impl Into<String>, invocation: Invocation) -> Self {
        Self{label: label.into(), action: Action::Plink(invocation)}
    }

    fn dedup(fam: PathBuf) -> Self {
        Self{label: String::from("dedup"), action: Action::Dedup(fam)}
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.action {
            Action::Plink(invocation) => write!(f, "[{}] {invocation}", self.label),
            Action::Dedup(fam)        => write!(f, "[{}] remove duplicate individuals from {}", self.label, fam.display()),
        }
    }
}

/// The two steps of a single chromosome. `export` always runs after `split`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeSteps {
    pub chr   : u8,
    pub split : Step,
    pub export: Step,
}

/// Fully resolved list of steps: a strictly sequential prelude, followed by independent chromosomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub prelude    : Vec<Step>,
    pub chromosomes: Vec<ChromosomeSteps>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.prelude.len() + 2 * self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every step, in the sequential reference order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.prelude.iter()
            .chain(self.chromosomes.iter().flat_map(|chr| [&chr.split, &chr.export]))
    }

    pub(crate) fn build(config: &PipelineConfig) -> Self {
        let out   = |suffix: &str| format!("{}{suffix}", config.prefix);
        let plink = || Invocation::new(&config.plink);

        // ---- Text to binary conversion, then deduplication of the freshly produced .fam file.
        let binary = out(BINARY);
        let mut prelude = vec![
            Step::plink("convert", plink().args(["--file", config.prefix.as_str(), "--make-bed", "--out", binary.as_str()])),
            Step::dedup(PathBuf::from(format!("{binary}.fam"))),
        ];

        // ---- Quality control filters.
        let thresholds = &config.thresholds;
        let filters = [
            ("geno", &thresholds.geno, BINARY,         SNP_CALLRATE),
            ("mind", &thresholds.mind, SNP_CALLRATE,   INDIV_CALLRATE),
            ("maf",  &thresholds.maf,  INDIV_CALLRATE, MAF_FILTERED),
            ("hwe",  &thresholds.hwe,  MAF_FILTERED,   HWE_FILTERED),
        ];
        for (filter, threshold, input, output) in filters {
            let (input, output, flag) = (out(input), out(output), format!("--{filter}"));
            prelude.push(Step::plink(filter, plink().args([
                "--bfile", input.as_str(), flag.as_str(), threshold.as_str(), "--make-bed", "--out", output.as_str()
            ])));
        }

        // ---- Chromosome restriction.
        let (input, output, chr_range) = (out(HWE_FILTERED), out(AUTOSOMES), format_chr_ranges(&config.chromosomes));
        prelude.push(Step::plink("autosomes", plink().args([
            "--bfile", input.as_str(), "--chr", chr_range.as_str(), "--make-bed", "--out", output.as_str()
        ])));

        // ---- Final filtering step, with optional removal of individuals.
        let (input, filtered) = (out(AUTOSOMES), out(FILTERED));
        let mut last = plink().args(["--bfile", input.as_str(), "--make-bed", "--out", filtered.as_str()]);
        // Flag and path go in together, ahead of '--bfile'.
        if let Some(exclusion) = &config.exclusion {
            last.insert_args(0, ["--remove".to_string(), exclusion.display().to_string()]);
        }
        prelude.push(Step::plink("final", last));

        // ---- Per-chromosome split and VCF export.
        let chromosomes = config.chromosomes.iter().map(|&chr| {
            let (chr_str, output) = (chr.to_string(), out(chromosome_suffix(chr).as_str()));
            ChromosomeSteps {
                chr,
                split : Step::plink(format!("chr{chr}-split"), plink().args([
                    "--bfile", filtered.as_str(), "--chr", chr_str.as_str(), "--make-bed", "--out", output.as_str()
                ])),
                export: Step::plink(format!("chr{chr}-vcf"), plink().args([
                    "--bfile", output.as_str(), "--recode", "vcf", "--out", output.as_str()
                ])),
            }
        }).collect();

        Self{prelude, chromosomes}
    }
}
