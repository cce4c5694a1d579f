use std::{io, env, fs, path::{Path, PathBuf}, ops::Deref, fmt::{self, Formatter, Display}};
use tempfile::TempDir;

pub const TEST_DATA_DIR: &str = "./tests/test-data";

/// Scratch copy of a file or directory of `tests/test-data`. Removed along with its tempdir on drop.
pub struct Fixture {
    path: PathBuf,
    _tempdir: TempDir,
}

impl Fixture {
    pub fn copy(relative_path: &str) -> Self {
        let manifest = env::var("CARGO_MANIFEST_DIR").expect("$CARGO_MANIFEST_DIR");
        let source   = Path::new(&manifest).join(TEST_DATA_DIR).join(relative_path);
        let tempdir  = tempfile::tempdir().expect("Failed to generate temp directory");
        let path     = tempdir.path().join(relative_path);

        let copied = match source.is_dir() {
            true  => copy_tree(&source, &path),
            false => path.parent().map_or(Ok(()), fs::create_dir_all).and_then(|()| fs::copy(&source, &path).map(drop)),
        };
        copied.unwrap_or_else(|e| panic!("Failed to copy {} into {}: {e}", source.display(), path.display()));
        Fixture { path, _tempdir: tempdir }
    }
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry  = entry?;
        let target = dst.join(entry.file_name());
        match entry.file_type()?.is_dir() {
            true  => copy_tree(&entry.path(), &target)?,
            false => {fs::copy(entry.path(), target)?;},
        }
    }
    Ok(())
}

impl Deref for Fixture {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.path
    }
}

impl Display for Fixture {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
