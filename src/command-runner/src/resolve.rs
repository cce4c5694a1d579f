use std::{env, path::{Path, PathBuf}};

use log::debug;

use crate::RunnerError;

/// Resolve the location of an external program, once, before any invocation is made.
///
/// # Behavior
/// - A leading `~` is expanded to the user's home directory.
/// - Values containing a path separator are taken as-is and must point to an executable file.
/// - Bare program names are searched within the directories listed in `$PATH`, in order.
///
/// # Errors
/// - `ProgramNotFound` if a bare name cannot be found within `$PATH`, or if an explicit path does not exist.
/// - `NotExecutable` if the path exists, but is not an executable file.
pub fn resolve_program(program: &str) -> Result<PathBuf, RunnerError> {
    let expanded = expanduser::expanduser(program)
        .map_err(|source| RunnerError::ExpandPath{path: program.to_string(), source})?;

    if expanded.components().count() > 1 {
        if !expanded.exists() {
            return Err(RunnerError::ProgramNotFound(program.to_string()))
        }
        return match is_executable(&expanded) {
            true  => Ok(expanded),
            false => Err(RunnerError::NotExecutable(expanded.display().to_string())),
        }
    }

    let search_path = env::var_os("PATH").unwrap_or_default();
    let found = env::split_paths(&search_path)
        .map(|dir| dir.join(&expanded))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(|| RunnerError::ProgramNotFound(program.to_string()))?;

    debug!("Resolved '{program}' to {}", found.display());
    Ok(found)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
