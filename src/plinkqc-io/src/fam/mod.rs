use std::{
    fs,
    io::Write,
    path::Path,
};

use ahash::AHashSet;
use log::{debug, info};
use tempfile::NamedTempFile;

use located_error::prelude::*;

mod error;
pub use error::FamError;

/// Line counts of a deduplication pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupSummary {
    pub total: usize,
    pub kept : usize,
}

impl DedupSummary {
    pub fn removed(&self) -> usize {
        self.total - self.kept
    }
}

/// Extract the individual ID (second whitespace-delimited field) of a `.fam` line.
fn individual_id(line: &str) -> Option<&str> {
    let mut fields = line.split_whitespace();
    let _family_id = fields.next()?;
    fields.next()
}

/// Keep the first line of every individual ID, in file order. Lines keep their original terminators.
///
/// # Errors
/// - `FamError::Format` on the first line holding less than two fields. No line is returned in that case.
pub fn dedup_lines(contents: &str) -> Result<Vec<&str>, FamError> {
    let mut seen = AHashSet::new();
    let mut kept = Vec::new();
    for (i, line) in contents.split_inclusive('\n').enumerate() {
        let iid = individual_id(line).ok_or_else(|| FamError::Format {
            lineno: i + 1,
            line  : line.trim_end().to_string()
        })?;
        if seen.insert(iid) {
            kept.push(line);
        } else {
            debug!("Duplicate individual ID '{iid}' at line n°{}. Skipping.", i + 1);
        }
    }
    Ok(kept)
}

/// Remove records with duplicate individual IDs from a PLINK `.fam` file, in place.
///
/// # Behavior
/// - The whole file is validated before anything gets written: a malformed line leaves the file untouched.
/// - Kept lines are first written to a temporary file within the same directory, which is then renamed over
///   `path`. The original file is thus never left partially written. File permissions are carried over.
///
/// # Errors
/// - `FamError::Read` if `path` cannot be read.
/// - `FamError::Format` if any line holds less than two fields.
/// - `FamError::Write` / `FamError::Persist` if the deduplicated file cannot be written or moved in place.
pub fn remove_duplicate_ids(path: &Path) -> Result<DedupSummary> {
    let loc_msg = || format!("While removing duplicate individuals from '{}'", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|source| FamError::Read{path: path.to_path_buf(), source})
        .with_loc(loc_msg)?;
    let kept = dedup_lines(&contents).with_loc(loc_msg)?;
    let summary = DedupSummary{total: contents.split_inclusive('\n').count(), kept: kept.len()};

    // An empty parent means the current directory.
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _                                         => Path::new("."),
    };
    let write_err = |source| FamError::Write{dir: dir.to_path_buf(), source};

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err).with_loc(loc_msg)?;
    for line in &kept {
        tmp.write_all(line.as_bytes()).map_err(write_err).with_loc(loc_msg)?;
    }
    tmp.flush().map_err(write_err).with_loc(loc_msg)?;

    let permissions = fs::metadata(path)
        .map_err(|source| FamError::Read{path: path.to_path_buf(), source})
        .with_loc(loc_msg)?
        .permissions();
    fs::set_permissions(tmp.path(), permissions).map_err(write_err).with_loc(loc_msg)?;

    tmp.persist(path)
        .map_err(|e| FamError::Persist{path: path.to_path_buf(), source: e.error})
        .with_loc(loc_msg)?;

    info!("Removed duplicates from {} ({} of {} records kept)", path.display(), summary.kept, summary.total);
    Ok(summary)
}
