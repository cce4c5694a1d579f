use parser::{Cli, Commands::*};
use located_error::prelude::*;

#[macro_use]
extern crate log;

/// Dispatch the parsed command line to the appropriate module.
///
/// # Errors
/// - if the pipeline fails to run. Under `--on-error continue`, a run with at least one failed step is an error too.
/// - if the target `.fam` file of the `dedup` subcommand cannot be deduplicated.
/// - if a `.yaml` configuration file cannot be deserialized.
pub fn run(cli: Cli) -> Result<()> {
    match cli.commands {
        Run{pipeline: args} => {
            let report = pipeline::run(&args)?;
            report.ensure_success().loc("While running the PLINK pipeline")?;
        },

        Dedup{fam} => {
            let summary = plinkqc_io::remove_duplicate_ids(&fam)?;
            debug!("{} out of {} records kept", summary.kept, summary.total);
        },

        FromYaml{yaml} => {
            info!("Loading arguments from {}", yaml.display());
            let cli = Cli::deserialize(&yaml)?;
            self::run(cli)?;
        },
    };
    Ok(())
}
