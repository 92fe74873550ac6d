use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("depth {depth} is outside [1, {max}]")]
    InvalidDepth { depth: usize, max: usize },
    #[error("expected artifact not found: {}", .0.display())]
    NotFound(PathBuf),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ConstraintSystem,
    WitnessProgram,
    ProvingKey,
    VerificationKey,
    VerifierExport,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::ConstraintSystem => "constraint system",
            ArtifactKind::WitnessProgram => "witness program",
            ArtifactKind::ProvingKey => "proving key",
            ArtifactKind::VerificationKey => "verification key",
            ArtifactKind::VerifierExport => "verifier export",
        };
        f.write_str(name)
    }
}

/// Maps a circuit depth to its artifact files under
/// `{circuits_dir}/{prefix}_{depth}/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactLocator {
    circuits_dir: PathBuf,
    prefix: String,
    max_depth: usize,
}

impl ArtifactLocator {
    pub fn new<P: AsRef<Path>>(circuits_dir: P, prefix: String, max_depth: usize) -> Self {
        Self {
            circuits_dir: circuits_dir.as_ref().to_path_buf(),
            prefix,
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn check_depth(&self, depth: usize) -> Result<(), LocateError> {
        if depth == 0 || depth > self.max_depth {
            return Err(LocateError::InvalidDepth {
                depth,
                max: self.max_depth,
            });
        }
        Ok(())
    }

    pub fn circuit_name(&self, depth: usize) -> String {
        format!("{}_{}", self.prefix, depth)
    }

    pub fn circuit_dir(&self, depth: usize) -> Result<PathBuf, LocateError> {
        self.check_depth(depth)?;
        Ok(self.circuits_dir.join(self.circuit_name(depth)))
    }

    /// Where `kind` lives for `depth`, whether or not it exists yet.
    pub fn expected_path(&self, depth: usize, kind: ArtifactKind) -> Result<PathBuf, LocateError> {
        let dir = self.circuit_dir(depth)?;
        let name = self.circuit_name(depth);
        let file = match kind {
            ArtifactKind::ConstraintSystem => format!("{}.r1cs", name),
            ArtifactKind::WitnessProgram => format!("{}.wasm", name),
            ArtifactKind::ProvingKey => format!("{}_final.zkey", name),
            ArtifactKind::VerificationKey => format!("{}_verification_key.json", name),
            ArtifactKind::VerifierExport => format!("verifier_{}.sol", name),
        };
        Ok(dir.join(file))
    }

    pub fn locate(&self, depth: usize, kind: ArtifactKind) -> Result<PathBuf, LocateError> {
        let path = self.expected_path(depth, kind)?;
        if !path.is_file() {
            return Err(LocateError::NotFound(path));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn locator(dir: &Path) -> ArtifactLocator {
        ArtifactLocator::new(dir, "MerkleTreeProof".to_string(), 15)
    }

    #[test]
    fn paths_follow_circuit_naming() {
        let locator = locator(Path::new("/c"));
        assert_eq!(
            locator.expected_path(3, ArtifactKind::ProvingKey).unwrap(),
            PathBuf::from("/c/MerkleTreeProof_3/MerkleTreeProof_3_final.zkey")
        );
        assert_eq!(
            locator.expected_path(15, ArtifactKind::VerifierExport).unwrap(),
            PathBuf::from("/c/MerkleTreeProof_15/verifier_MerkleTreeProof_15.sol")
        );
        assert_eq!(
            locator.expected_path(1, ArtifactKind::VerificationKey).unwrap(),
            PathBuf::from("/c/MerkleTreeProof_1/MerkleTreeProof_1_verification_key.json")
        );
    }

    #[test]
    fn depth_bounds_are_enforced() {
        let locator = locator(Path::new("/c"));
        for depth in [0, 16, 100] {
            assert_eq!(
                locator.locate(depth, ArtifactKind::WitnessProgram),
                Err(LocateError::InvalidDepth { depth, max: 15 })
            );
        }
    }

    #[test]
    fn locate_checks_existence() {
        let dir = TempDir::new().unwrap();
        let locator = locator(dir.path());
        let expected = locator.expected_path(2, ArtifactKind::WitnessProgram).unwrap();
        assert_eq!(
            locator.locate(2, ArtifactKind::WitnessProgram),
            Err(LocateError::NotFound(expected.clone()))
        );
        std::fs::create_dir_all(expected.parent().unwrap()).unwrap();
        std::fs::write(&expected, b"wasm").unwrap();
        assert_eq!(locator.locate(2, ArtifactKind::WitnessProgram), Ok(expected));
    }
}
