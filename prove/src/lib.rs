pub mod cli;

use libs::backend::{BackendError, Groth16Proof, ProvingBackend};
use libs::field_structures::{EncodingError, FieldSerde, LeafValue};
use libs::iotools::{ArtifactKind, ArtifactLocator, CeremonyConfig, LocateError};
use libs::merkle::{depth_for, LeafTarget, MerkleError, MerkleProof, MerkleTreeBuilder};
use libs::{impl_read_from_json, impl_write_into_json};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ProofError {
    #[error("depth {depth} is outside [1, {max}]")]
    InvalidDepth { depth: usize, max: usize },
    #[error("depth {depth} has not been finalized: missing {}", path.display())]
    ArtifactMissing { depth: usize, path: PathBuf },
    #[error("cannot prove membership in an empty leaf set")]
    EmptyLeafSet,
    #[error("leaf {0} is not part of the tree")]
    LeafNotFound(String),
    #[error("leaf encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    #[error("malformed verification key {}: {reason}", path.display())]
    MalformedVerificationKey { path: PathBuf, reason: String },
    #[error("proving system failed for depth {depth} with {}: {source}", path.display())]
    Backend {
        depth: usize,
        path: PathBuf,
        source: BackendError,
    },
}

impl From<MerkleError> for ProofError {
    fn from(err: MerkleError) -> Self {
        match err {
            MerkleError::EmptyLeafSet => ProofError::EmptyLeafSet,
            MerkleError::LeafNotFound(leaf) => ProofError::LeafNotFound(leaf),
            MerkleError::Encoding(e) => ProofError::Encoding(e),
        }
    }
}

fn located(depth: usize, result: Result<PathBuf, LocateError>) -> Result<PathBuf, ProofError> {
    result.map_err(|e| match e {
        LocateError::InvalidDepth { depth, max } => ProofError::InvalidDepth { depth, max },
        LocateError::NotFound(path) => ProofError::ArtifactMissing { depth, path },
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResult {
    pub proof: Groth16Proof,
    pub public_signals: Vec<String>,
    pub root: FieldSerde,
    pub depth: usize,
    pub merkle_proof: MerkleProof,
}

impl_read_from_json!(ProofResult);
impl_write_into_json!(ProofResult);

/// Membership proofs against the keys a finished ceremony left on disk.
pub struct ProofService<B: ProvingBackend> {
    backend: B,
    locator: ArtifactLocator,
    builder: MerkleTreeBuilder,
}

impl<B: ProvingBackend> ProofService<B> {
    pub fn new(backend: B, locator: ArtifactLocator) -> Self {
        Self {
            backend,
            locator,
            builder: MerkleTreeBuilder::default(),
        }
    }

    pub fn from_config(config: &CeremonyConfig, backend: B) -> Self {
        Self::new(backend, config.locator())
    }

    pub fn locator(&self) -> &ArtifactLocator {
        &self.locator
    }

    /// Proves that `target` is a leaf of the tree over `leaves`, using the
    /// circuit whose depth matches the leaf count.
    pub fn generate_proof(&self, leaves: &[LeafValue], target: &LeafTarget) -> Result<ProofResult, ProofError> {
        if leaves.is_empty() {
            return Err(ProofError::EmptyLeafSet);
        }
        let depth = depth_for(leaves.len());
        let witness_program = located(depth, self.locator.locate(depth, ArtifactKind::WitnessProgram))?;
        let proving_key = located(depth, self.locator.locate(depth, ArtifactKind::ProvingKey))?;

        let (tree, merkle_proof) = self.builder.build(leaves, target)?;
        debug!(depth, leaf_index = merkle_proof.leaf_index, "merkle witness built");

        let input = merkle_proof.to_circuit_input();
        let (proof, public_signals) = self
            .backend
            .prove(&input, &witness_program, &proving_key)
            .map_err(|source| ProofError::Backend {
                depth,
                path: proving_key.clone(),
                source,
            })?;
        info!(depth, leaves = leaves.len(), "membership proof generated");

        Ok(ProofResult {
            proof,
            public_signals,
            root: FieldSerde(tree.root()),
            depth,
            merkle_proof,
        })
    }

    /// `Ok(false)` for a proof that does not check out; errors only when the
    /// verification key is missing or unusable.
    pub fn verify_proof(
        &self,
        proof: &Groth16Proof,
        public_signals: &[String],
        depth: usize,
    ) -> Result<bool, ProofError> {
        let vk_path = located(depth, self.locator.locate(depth, ArtifactKind::VerificationKey))?;
        let verification_key = read_verification_key(&vk_path)?;
        match self.backend.verify_proof(&verification_key, public_signals, proof) {
            Ok(valid) => {
                info!(depth, valid, "proof checked");
                Ok(valid)
            }
            Err(BackendError::Malformed { reason, .. }) => Err(ProofError::MalformedVerificationKey {
                path: vk_path,
                reason,
            }),
            Err(source) => Err(ProofError::Backend {
                depth,
                path: vk_path,
                source,
            }),
        }
    }

    pub fn verify_result(&self, result: &ProofResult) -> Result<bool, ProofError> {
        self.verify_proof(&result.proof, &result.public_signals, result.depth)
    }

    /// Verifier contract source for `depth`. Prefers the copy exported at
    /// finalization and falls back to generating it from the final key.
    pub fn export_verifier_contract(&self, depth: usize) -> Result<String, ProofError> {
        if let Ok(path) = self.locator.locate(depth, ArtifactKind::VerifierExport) {
            return fs::read_to_string(&path).map_err(|e| ProofError::Backend {
                depth,
                path: path.clone(),
                source: BackendError::Io { path, source: e },
            });
        }
        let proving_key = located(depth, self.locator.locate(depth, ArtifactKind::ProvingKey))?;
        self.backend
            .export_verifier_source(&proving_key, None)
            .map_err(|source| ProofError::Backend {
                depth,
                path: proving_key,
                source,
            })
    }
}

fn read_verification_key(path: &Path) -> Result<serde_json::Value, ProofError> {
    let malformed = |reason: String| ProofError::MalformedVerificationKey {
        path: path.to_path_buf(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    let key: serde_json::Value = serde_json::from_str(&text).map_err(|e| malformed(e.to_string()))?;
    if !key.is_object() {
        return Err(malformed("expected a JSON object".to_string()));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libs::backend::mock::MockBackend;
    use std::path::Path;
    use tempfile::TempDir;

    fn service(dir: &Path) -> ProofService<MockBackend> {
        ProofService::new(
            MockBackend::new(),
            ArtifactLocator::new(dir, "MerkleTreeProof".to_string(), 15),
        )
    }

    #[test]
    fn missing_keys_are_reported_per_depth() {
        let dir = TempDir::new().unwrap();
        let leaves: Vec<LeafValue> = ["a", "b", "c", "d", "e"].iter().map(|v| LeafValue::from(*v)).collect();
        match service(dir.path()).generate_proof(&leaves, &"a".into()) {
            Err(ProofError::ArtifactMissing { depth, path }) => {
                assert_eq!(depth, 3);
                assert!(path.ends_with("MerkleTreeProof_3/MerkleTreeProof_3.wasm"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn single_leaf_has_no_circuit() {
        let dir = TempDir::new().unwrap();
        let leaves = vec![LeafValue::from("only")];
        assert!(matches!(
            service(dir.path()).generate_proof(&leaves, &"only".into()),
            Err(ProofError::InvalidDepth { depth: 0, .. })
        ));
        assert!(matches!(
            service(dir.path()).generate_proof(&[], &"only".into()),
            Err(ProofError::EmptyLeafSet)
        ));
    }

    #[test]
    fn unreadable_verification_key_is_malformed() {
        let dir = TempDir::new().unwrap();
        let service = service(dir.path());
        let vk = service.locator().expected_path(2, ArtifactKind::VerificationKey).unwrap();
        fs::create_dir_all(vk.parent().unwrap()).unwrap();
        fs::write(&vk, "[1, 2").unwrap();
        let proof = Groth16Proof {
            pi_a: vec![],
            pi_b: vec![],
            pi_c: vec![],
            protocol: "groth16".to_string(),
            curve: "bn128".to_string(),
        };
        assert!(matches!(
            service.verify_proof(&proof, &[], 2),
            Err(ProofError::MalformedVerificationKey { .. })
        ));
        assert!(matches!(
            service.verify_proof(&proof, &[], 16),
            Err(ProofError::InvalidDepth { depth: 16, max: 15 })
        ));
    }
}
