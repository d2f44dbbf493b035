use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Scratch directory owned by one pipeline run. Dropping it removes every
/// downloaded image and the assembled document, whichever way the run ends.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create(base: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("doujin-");
        let dir = match base {
            Some(base) => builder.tempdir_in(base)?,
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn image_path(&self, index: usize, extension: &str) -> PathBuf {
        self.dir.path().join(format!("image_{index}.{extension}"))
    }

    pub fn document_path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }
}
