use crate::error::CeremonyError;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Advisory single-writer lock on a ceremony directory, held for the
/// lifetime of a coordinator.
#[derive(Debug)]
pub struct CeremonyLock {
    path: PathBuf,
}

impl CeremonyLock {
    pub fn acquire(path: &Path) -> Result<Self, CeremonyError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(CeremonyError::io(parent))?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(CeremonyError::Locked(path.to_path_buf()))
            }
            Err(e) => return Err(CeremonyError::io(path)(e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(CeremonyError::io(path))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CeremonyLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "could not release ceremony lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_holder_is_refused_until_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".ceremony.lock");
        let first = CeremonyLock::acquire(&path).unwrap();
        assert!(matches!(CeremonyLock::acquire(&path), Err(CeremonyError::Locked(_))));
        drop(first);
        assert!(!path.exists());
        assert!(CeremonyLock::acquire(&path).is_ok());
    }
}
