use std::fmt::{self, Display, Formatter};

use log::{error, info};

use crate::{Invocation, RunnerError};

/// How a child process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitState {
    Success,
    /// Non-zero exit code. `None` if the process was terminated by a signal.
    Failed(Option<i32>),
    /// The program could not be spawned at all (missing, not executable, ...)
    LaunchFailed(String),
}

impl Display for ExitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success              => write!(f, "exit code 0"),
            Self::Failed(Some(code))   => write!(f, "exit code {code}"),
            Self::Failed(None)         => write!(f, "a termination signal"),
            Self::LaunchFailed(reason) => write!(f, "launch failure ({reason})"),
        }
    }
}

/// Result of running an `Invocation`: exit state + captured standard output and standard error.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub invocation: Invocation,
    pub state     : ExitState,
    pub stdout    : String,
    pub stderr    : String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.state == ExitState::Success
    }

    /// Diagnostic payload of a failure: the captured stderr, or the launch failure reason.
    pub fn diagnostic(&self) -> &str {
        match &self.state {
            ExitState::LaunchFailed(reason) => reason,
            _                               => &self.stderr,
        }
    }

    /// Write a human readable status line. Launch failures are reported like non-zero exits.
    pub fn report(&self) {
        match self.state {
            ExitState::Success => info!("Command executed: {}\nOutput: {}", self.invocation, self.stdout.trim_end()),
            _                  => error!("Error executing command: {}\nError: {}", self.invocation, self.diagnostic().trim_end()),
        }
    }

    /// Convert this outcome into a `Result`, letting the caller decide whether a failure is fatal.
    ///
    /// # Errors
    /// - `RunnerError::Launch` if the program could not be spawned.
    /// - `RunnerError::NonZeroExit` if the program returned a non-zero exit code or was killed.
    pub fn into_result(self) -> Result<Self, RunnerError> {
        match &self.state {
            ExitState::Success => Ok(self),
            ExitState::LaunchFailed(reason) => Err(RunnerError::Launch {
                invocation: self.invocation.to_string(),
                reason    : reason.clone()
            }),
            ExitState::Failed(_) => Err(RunnerError::NonZeroExit {
                invocation: self.invocation.to_string(),
                status    : self.state.to_string(),
                stderr    : self.stderr.trim_end().to_string(),
            }),
        }
    }
}
