use crate::error::{OfficeExtractError, Result};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const SCRATCH_PREFIX: &str = "office-extract-";

/// Per-run working directory. Removed when dropped, whatever the outcome of the run.
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Creates a uniquely named directory under `root`, or the system temp dir.
    pub fn acquire(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);

        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        log::debug!("Acquired scratch directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Maps an archive-relative path into the scratch directory.
    pub fn resolve(&self, relative: &Path) -> Result<PathBuf> {
        if relative.as_os_str().is_empty() {
            return Err(OfficeExtractError::InvalidPath {
                path: "empty path".to_string(),
            });
        }

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(OfficeExtractError::InvalidPath {
                path: format!("Path escapes the scratch directory: {}", relative.display()),
            });
        }

        Ok(self.dir.path().join(relative))
    }

    /// Bytes currently materialized in the scratch directory.
    pub fn disk_usage(&self) -> u64 {
        WalkDir::new(self.dir.path())
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum()
    }

    /// Removes the directory now, reporting failures instead of ignoring them.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        log::debug!("Released scratch directory {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scratch_space_is_removed_on_drop() {
        let scratch = ScratchSpace::acquire(None).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_spaces_are_isolated() {
        let root = TempDir::new().unwrap();
        let first = ScratchSpace::acquire(Some(root.path())).unwrap();
        let second = ScratchSpace::acquire(Some(root.path())).unwrap();

        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(root.path()));
        assert!(first
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SCRATCH_PREFIX));
    }

    #[test]
    fn test_resolve_rejects_escaping_paths() {
        let scratch = ScratchSpace::acquire(None).unwrap();

        assert!(scratch.resolve(Path::new("A B_1/report.xlsx")).is_ok());
        assert!(scratch.resolve(Path::new("../outside.xlsx")).is_err());
        assert!(scratch.resolve(Path::new("/etc/passwd")).is_err());
        assert!(scratch.resolve(Path::new("")).is_err());
    }

    #[test]
    fn test_disk_usage_and_close() {
        let scratch = ScratchSpace::acquire(None).unwrap();
        let nested = scratch.resolve(Path::new("a/b.docx")).unwrap();
        fs::create_dir_all(nested.parent().unwrap()).unwrap();
        fs::write(&nested, vec![0u8; 128]).unwrap();
        fs::write(scratch.path().join("c.docx"), vec![0u8; 72]).unwrap();

        assert_eq!(scratch.disk_usage(), 200);

        let path = scratch.path().to_path_buf();
        scratch.close().unwrap();
        assert!(!path.exists());
    }
}
