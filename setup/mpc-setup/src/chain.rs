use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const PARTIAL_SUFFIX: &str = "partial";

/// File naming for one append-only chain of contributions:
/// `{stem}_{index:04}.{ext}` for intermediates and `{stem}_final.{ext}` for
/// the terminal artifact, all in one directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContributionChain {
    dir: PathBuf,
    stem: String,
    extension: &'static str,
}

impl ContributionChain {
    pub fn new<P: AsRef<Path>>(dir: P, stem: impl Into<String>, extension: &'static str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            stem: stem.into(),
            extension,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("{}_{:04}.{}", self.stem, index, self.extension))
    }

    pub fn final_path(&self) -> PathBuf {
        self.dir.join(format!("{}_final.{}", self.stem, self.extension))
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.dir.join("contributions.json")
    }

    pub fn is_final(&self) -> bool {
        self.final_path().is_file()
    }

    fn parse_index(&self, file_name: &str) -> Option<u32> {
        let digits = file_name
            .strip_prefix(self.stem.as_str())?
            .strip_prefix('_')?
            .strip_suffix(self.extension)?
            .strip_suffix('.')?;
        if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Intermediate indices present on disk, ascending. A missing directory
    /// is an empty chain.
    pub fn indices(&self) -> io::Result<Vec<u32>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut indices = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(index) = entry.file_name().to_str().and_then(|name| self.parse_index(name)) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    /// The current (highest-index) intermediate.
    pub fn latest(&self) -> io::Result<Option<(u32, PathBuf)>> {
        Ok(self.indices()?.last().map(|&index| (index, self.path(index))))
    }

    pub fn intermediates(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self.indices()?.into_iter().map(|index| self.path(index)).collect())
    }

    /// Removes scratch files left behind by an interrupted step.
    pub fn discard_partials(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut removed = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let owned = path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with(self.stem.as_str()))
                && path.extension().and_then(|ext| ext.to_str()) == Some(PARTIAL_SUFFIX);
            if owned {
                fs::remove_file(&path)?;
                removed.push(path);
            }
        }
        Ok(removed)
    }
}

/// Scratch location a step writes to before its output is renamed into place.
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn names_are_zero_padded() {
        let chain = ContributionChain::new("/c/pot", "pot12", "ptau");
        assert_eq!(chain.path(0), PathBuf::from("/c/pot/pot12_0000.ptau"));
        assert_eq!(chain.path(17), PathBuf::from("/c/pot/pot12_0017.ptau"));
        assert_eq!(chain.final_path(), PathBuf::from("/c/pot/pot12_final.ptau"));
        assert_eq!(
            partial_path(&chain.path(1)),
            PathBuf::from("/c/pot/pot12_0001.ptau.partial")
        );
    }

    #[test]
    fn latest_ignores_foreign_and_final_files() {
        let dir = TempDir::new().unwrap();
        let chain = ContributionChain::new(dir.path(), "pot12", "ptau");
        assert_eq!(chain.latest().unwrap(), None);
        for name in [
            "pot12_0000.ptau",
            "pot12_0002.ptau",
            "pot12_0001.ptau",
            "pot12_final.ptau",
            "pot14_0009.ptau",
            "pot12_12.ptau",
            "pot12_0003.ptau.partial",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        assert_eq!(chain.indices().unwrap(), vec![0, 1, 2]);
        assert_eq!(chain.latest().unwrap(), Some((2, chain.path(2))));
        assert!(chain.is_final());

        let removed = chain.discard_partials().unwrap();
        assert_eq!(removed, vec![dir.path().join("pot12_0003.ptau.partial")]);
    }

    #[test]
    fn missing_directory_is_an_empty_chain() {
        let chain = ContributionChain::new("/definitely/not/here", "MerkleTreeProof_3", "zkey");
        assert!(chain.indices().unwrap().is_empty());
        assert!(chain.discard_partials().unwrap().is_empty());
    }
}
