use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to launch '{invocation}': {reason}")]
    Launch{invocation: String, reason: String},

    #[error("'{invocation}' exited with {status}: {stderr}")]
    NonZeroExit{invocation: String, status: String, stderr: String},

    #[error("Could not find '{0}' within any of the directories listed in $PATH. Use --plink to provide the path to the executable.")]
    ProgramNotFound(String),

    #[error("'{0}' is not an executable file")]
    NotExecutable(String),

    #[error("Failed to expand the user directory of '{path}'")]
    ExpandPath{path: String, #[source] source: std::io::Error},
}
