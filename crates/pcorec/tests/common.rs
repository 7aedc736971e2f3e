use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A scratch directory holding a single source file
pub struct Workspace {
    dir: TempDir,
    source: PathBuf,
}

impl Workspace {
    pub fn with_source(source: &str) -> Self {
        let dir = tempfile::tempdir().expect("could not create directory");
        let path = dir.path().join("main.pc");
        std::fs::write(&path, source).expect("could not write source file");
        Self { dir, source: path }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
