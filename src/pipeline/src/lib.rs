use command_runner::{CommandRunner, Execute};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn, LevelFilter};
use rayon::prelude::*;

use located_error::prelude::*;
use parser::{ErrorPolicy, PipelineArgs};

mod config;
pub use config::{PipelineConfig, Thresholds};

mod error;
pub use error::PipelineError;

pub mod plan;
pub use plan::{Action, ChromosomeSteps, Plan, Step};

mod report;
pub use report::{PipelineReport, StepReport, StepStatus};

/// Fixed PLINK quality-control pipeline: conversion, deduplication, filtering, then per-chromosome export.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self{config}
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Every step this pipeline will run, in order. Nothing gets executed.
    pub fn plan(&self) -> Plan {
        Plan::build(&self.config)
    }

    /// Run every step of the plan with `executor`.
    ///
    /// # Behavior
    /// - Steps before the per-chromosome split run sequentially, in order.
    /// - Chromosomes run sequentially when `threads == 1`, or on a bounded thread pool otherwise. Within a
    ///   chromosome, the VCF export always runs after the split.
    /// - Output files are never checked for existence: a missing input is only noticed by the next PLINK call.
    ///
    /// # Errors
    /// - With `ErrorPolicy::FailFast`, the first failed step aborts the run with `PipelineError::StepFailed`.
    ///   With `ErrorPolicy::Continue`, failures are logged and recorded within the returned report instead.
    /// - If the thread pool cannot be built.
    pub fn run<E: Execute>(&self, executor: &E) -> Result<PipelineReport> {
        let plan = self.plan();
        info!("Running {} steps on '{}' (on-error: {}, threads: {})",
            plan.len(), self.config.prefix, self.config.policy, self.config.threads
        );

        let mut report = PipelineReport::default();
        for step in &plan.prelude {
            report.push(self.run_step(step, executor)?);
        }
        report.extend(self.run_chromosomes(&plan.chromosomes, executor)?);

        let failed = report.failures().count();
        match failed {
            0 => info!("Pipeline completed: {} steps run", report.steps().len()),
            n => warn!("Pipeline completed with {n} failed step(s) out of {}", report.steps().len()),
        }
        Ok(report)
    }

    /// Run a single step, and settle its outcome according to the error policy.
    fn run_step<E: Execute>(&self, step: &Step, executor: &E) -> Result<StepReport> {
        debug!("{step}");
        let result = match &step.action {
            Action::Plink(invocation) => executor.execute(invocation).into_result().map(|_| ()).map_err(anyhow::Error::from),
            Action::Dedup(fam)        => plinkqc_io::remove_duplicate_ids(fam).map(|_| ()),
        };

        match (result, self.config.policy) {
            (Ok(()), _) => Ok(StepReport{label: step.label.clone(), status: StepStatus::Done}),
            (Err(e), ErrorPolicy::FailFast) => Err(e).with_loc(|| PipelineError::StepFailed(step.label.clone())),
            (Err(e), ErrorPolicy::Continue) => {
                warn!("Step '{}' failed. Continuing: {e:#}", step.label);
                Ok(StepReport{label: step.label.clone(), status: StepStatus::Failed(format!("{e:#}"))})
            },
        }
    }

    fn run_chromosome<E: Execute>(&self, steps: &ChromosomeSteps, executor: &E) -> Result<[StepReport; 2]> {
        let split  = self.run_step(&steps.split, executor)?;
        let export = self.run_step(&steps.export, executor)?;
        Ok([split, export])
    }

    /// Split and export every chromosome. Reports are returned in ascending chromosome order.
    fn run_chromosomes<E: Execute>(&self, chromosomes: &[ChromosomeSteps], executor: &E) -> Result<Vec<StepReport>> {
        let pb = progress_bar(chromosomes.len() as u64);
        let run = |steps: &ChromosomeSteps| {
            let reports = self.run_chromosome(steps, executor);
            pb.inc(1);
            reports
        };

        let results: Result<Vec<[StepReport; 2]>> = match self.config.threads {
            0 | 1   => chromosomes.iter().map(run).collect(),
            threads => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(PipelineError::BuildThreadPool)
                    .loc("While preparing the per-chromosome thread pool")?;
                pool.install(|| chromosomes.par_iter().map(run).collect())
            }
        };
        pb.finish_and_clear();
        Ok(results?.into_iter().flatten().collect())
    }
}

/// Chromosome progress bar, routed through the global logger. Hidden when the logger is
/// uninitialized, or when info messages are filtered out.
fn progress_bar(len: u64) -> ProgressBar {
    let pb = match logger::Logger::multi() {
        Some(multi) if log::max_level() >= LevelFilter::Info => multi.add(ProgressBar::new(len)),
        _ => return ProgressBar::hidden(),
    };
    let style = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>2}/{len:2} chromosomes")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Resolve the configuration from command line arguments and run the pipeline with PLINK.
///
/// # Errors
/// - if the configuration is invalid (see `PipelineConfig::from_cli()`)
/// - if the pipeline fails (see `Pipeline::run()`)
pub fn run(args: &PipelineArgs) -> Result<PipelineReport> {
    let config = PipelineConfig::from_cli(args).loc("While configuring the pipeline")?;
    info!("Using PLINK executable: {}", config.plink.display());
    Pipeline::new(config).run(&CommandRunner::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::Path, sync::Arc};

    use command_runner::{CommandOutcome, ExitState, Invocation, RunnerError};
    use mockall::mock;
    use parking_lot::Mutex;
    use itertools::Itertools;

    mock! {
        pub Executor {}
        impl Execute for Executor {
            fn execute(&self, invocation: &Invocation) -> CommandOutcome;
        }
    }

    const FAM: &str = "F1 I1 0 0 1 -9\nF2 I2 0 0 2 -9\nF3 I1 0 0 1 -9\n";

    type Calls = Arc<Mutex<Vec<Invocation>>>;

    fn outcome(invocation: &Invocation, state: ExitState) -> CommandOutcome {
        CommandOutcome{invocation: invocation.clone(), state, stdout: String::from("ok"), stderr: String::from("bad")}
    }

    /// Mock PLINK: record every call, write `fam` on conversion, and fail every invocation holding `fail_on`.
    fn fake_plink(fam: &'static str, fail_on: Option<&'static str>) -> (MockExecutor, Calls) {
        let calls    = Calls::default();
        let recorded = Arc::clone(&calls);
        let mut executor = MockExecutor::new();
        executor.expect_execute().returning(move |invocation| {
            recorded.lock().push(invocation.clone());
            if fail_on.is_some_and(|flag| invocation.get_args().iter().any(|arg| arg == flag)) {
                return outcome(invocation, ExitState::Failed(Some(1)))
            }
            if let (Some(_), Some(out)) = (invocation.flag_value("--file"), invocation.flag_value("--out")) {
                fs::write(format!("{out}.fam"), fam).expect("Failed to write .fam file");
            }
            outcome(invocation, ExitState::Success)
        });
        (executor, calls)
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig::new(dir.join("sample").display().to_string(), "plink")
    }

    fn labels(report: &PipelineReport) -> Vec<&str> {
        report.steps().iter().map(|step| step.label.as_str()).collect()
    }

    #[test]
    fn serial_run() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let (executor, calls) = fake_plink(FAM, None);
        let pipeline = Pipeline::new(config(tmpdir.path()));
        let report   = pipeline.run(&executor)?;

        report.ensure_success()?;
        assert_eq!(report.steps().len(), 8 + 44);

        // One conversion, five filtering steps, the final step, then two calls per chromosome.
        let calls = calls.lock();
        assert_eq!(calls.len(), 1 + 5 + 1 + 44);
        assert_eq!(calls[0].get_args()[..2], [String::from("--file"), tmpdir.path().join("sample").display().to_string()]);

        // Chromosomes are processed in ascending order, split first.
        for (i, chr) in (1u8..=22).enumerate() {
            let (split, export) = (&calls[7 + 2*i], &calls[8 + 2*i]);
            let output = format!("{}_filtered_chr{chr}", tmpdir.path().join("sample").display());
            assert_eq!(split.flag_value("--chr"), Some(chr.to_string().as_str()));
            assert_eq!(split.flag_value("--out"), Some(output.as_str()));
            assert_eq!(export.flag_value("--bfile"), Some(output.as_str()));
            assert_eq!(export.flag_value("--recode"), Some("vcf"));
        }

        // The .fam file produced by the conversion step was deduplicated.
        let fam = fs::read_to_string(tmpdir.path().join("sample_binary.fam"))?;
        assert_eq!(fam, "F1 I1 0 0 1 -9\nF2 I2 0 0 2 -9\n");
        Ok(())
    }

    #[test]
    fn fail_fast_aborts_on_first_failure() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let (executor, calls) = fake_plink(FAM, Some("--geno"));
        let result = Pipeline::new(config(tmpdir.path())).run(&executor);

        let err = result.expect_err("--geno step should fail");
        assert!(err.to_string().ends_with(&PipelineError::StepFailed("geno".into()).to_string()));
        assert!(matches!(err.downcast_ref::<RunnerError>(), Some(RunnerError::NonZeroExit{stderr, ..}) if stderr == "bad"));
        assert_eq!(calls.lock().len(), 2);
        Ok(())
    }

    #[test]
    fn continue_runs_every_step() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let (executor, calls) = fake_plink(FAM, Some("--geno"));
        let pipeline = Pipeline::new(config(tmpdir.path()).with_policy(ErrorPolicy::Continue));
        let report   = pipeline.run(&executor)?;

        assert_eq!(calls.lock().len(), 51);
        assert_eq!(report.failures().map(|step| step.label.as_str()).collect::<Vec<_>>(), ["geno"]);
        assert!(matches!(report.ensure_success(), Err(PipelineError::FailedSteps{failed: 1, total: 52, ..})));
        Ok(())
    }

    #[test]
    fn continue_exports_after_failed_split() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        // Fails the chromosome restriction, and every per-chromosome split.
        let (executor, calls) = fake_plink(FAM, Some("--chr"));
        let pipeline = Pipeline::new(config(tmpdir.path()).with_policy(ErrorPolicy::Continue));
        let report   = pipeline.run(&executor)?;

        assert_eq!(calls.lock().len(), 51);
        assert_eq!(report.failures().count(), 1 + 22);
        assert!(report.steps().iter().filter(|step| step.label.ends_with("-vcf")).all(|step| step.status == StepStatus::Done));
        Ok(())
    }

    #[test]
    fn malformed_fam_fails_fast() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let (executor, calls) = fake_plink("F1 I1 0 0 1 -9\nF1\n", None);
        let err = Pipeline::new(config(tmpdir.path())).run(&executor).expect_err("dedup should fail");

        assert!(err.to_string().ends_with(&PipelineError::StepFailed("dedup".into()).to_string()));
        assert!(matches!(err.downcast_ref::<plinkqc_io::FamError>(), Some(plinkqc_io::FamError::Format{lineno: 2, ..})));
        assert_eq!(calls.lock().len(), 1);
        Ok(())
    }

    #[test]
    fn missing_fam_is_reported_under_continue() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        // The conversion step fails, and never writes the .fam file.
        let (executor, _) = fake_plink(FAM, Some("--file"));
        let pipeline = Pipeline::new(config(tmpdir.path()).with_policy(ErrorPolicy::Continue));
        let report   = pipeline.run(&executor)?;
        assert_eq!(report.failures().map(|step| step.label.as_str()).collect::<Vec<_>>(), ["convert", "dedup"]);
        Ok(())
    }

    #[test]
    fn parallel_matches_serial() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;

        let (executor, serial_calls) = fake_plink(FAM, None);
        let serial = Pipeline::new(config(tmpdir.path())).run(&executor)?;

        let (executor, parallel_calls) = fake_plink(FAM, None);
        let parallel = Pipeline::new(config(tmpdir.path()).with_threads(4)).run(&executor)?;

        // Same reports, in the same order.
        assert_eq!(labels(&serial), labels(&parallel));

        // Same invocations, possibly in a different order across chromosomes...
        let serial_calls   = serial_calls.lock();
        let parallel_calls = parallel_calls.lock();
        let sorted = |calls: &[Invocation]| calls.iter().map(ToString::to_string).sorted().collect::<Vec<String>>();
        assert_eq!(sorted(&serial_calls), sorted(&parallel_calls));

        // ...but the prelude is untouched, and each export follows its split.
        assert_eq!(serial_calls[..7], parallel_calls[..7]);
        for chr in 1u8..=22 {
            let output = format!("{}_filtered_chr{chr}", tmpdir.path().join("sample").display());
            let position = |recode: bool| parallel_calls.iter()
                .position(|call| call.flag_value("--out") == Some(output.as_str()) && call.flag_value("--recode").is_some() == recode)
                .expect("missing chromosome invocation");
            assert!(position(false) < position(true));
        }
        Ok(())
    }

    #[test]
    fn plan_is_side_effect_free() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let plan = Pipeline::new(config(tmpdir.path())).plan();
        assert_eq!(plan.len(), 52);
        assert_eq!(fs::read_dir(tmpdir.path())?.count(), 0);
        Ok(())
    }
}
