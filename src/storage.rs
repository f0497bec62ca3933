//! Filesystem seam for the local-materialization branch of bundle assembly.
//!
//! Only the handful of operations the assembler needs are exposed, so tests
//! can run against an in-memory fake.

use std::io;
use std::path::Path;

pub trait Filesystem: Sync {
    /// Create a directory and its parents. Succeeds if it already exists.
    fn ensure_dir(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Write `contents`, replacing any existing file.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// The real local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }
}
