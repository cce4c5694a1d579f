use std::process::Command;

use log::trace;

mod error;
pub use error::RunnerError;

mod invocation;
pub use invocation::Invocation;

mod outcome;
pub use outcome::{CommandOutcome, ExitState};

mod resolve;
pub use resolve::resolve_program;

/// Anything able to execute an `Invocation` and report how it went.
///
/// Implementors must never panic on a failed invocation: the failure is carried by the returned
/// `CommandOutcome`, and control always goes back to the caller.
pub trait Execute: Send + Sync {
    fn execute(&self, invocation: &Invocation) -> CommandOutcome;
}

/// Synchronous subprocess runner. Each call blocks until the child process has exited.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `invocation` as a child process, capture its stdout and stderr, then report its status.
    pub fn run(&self, invocation: &Invocation) -> CommandOutcome {
        trace!("Spawning child process: {invocation}");
        let outcome = match Command::new(invocation.program()).args(invocation.os_args()).output() {
            Ok(output) => CommandOutcome {
                invocation: invocation.clone(),
                state     : match output.status.success() {
                    true  => ExitState::Success,
                    false => ExitState::Failed(output.status.code()),
                },
                stdout    : String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr    : String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(err) => CommandOutcome {
                invocation: invocation.clone(),
                state     : ExitState::LaunchFailed(err.to_string()),
                stdout    : String::new(),
                stderr    : String::new(),
            },
        };
        outcome.report();
        outcome
    }
}

impl Execute for CommandRunner {
    fn execute(&self, invocation: &Invocation) -> CommandOutcome {
        self.run(invocation)
    }
}
