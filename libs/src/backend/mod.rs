//! Seam to the external proving system.
//!
//! The ceremony and proof service only ever talk to a [`ProvingBackend`];
//! the accumulator, key and proof formats stay opaque to them.

mod snarkjs;
#[cfg(any(test, feature = "testing-mode"))]
pub mod mock;

pub use snarkjs::SnarkjsBackend;

use crate::merkle::CircuitInput;
use crate::{impl_read_from_json, impl_write_into_json};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("i/o error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("malformed artifact {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl BackendError {
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> BackendError + '_ {
        move |source| BackendError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> BackendError + '_ {
        move |source| BackendError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Groth16 proof in the snarkjs JSON layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
    pub protocol: String,
    pub curve: String,
}

impl_read_from_json!(Groth16Proof);
impl_write_into_json!(Groth16Proof);

/// Accumulator, proving-key and proof primitives supplied by the proving
/// system. Every `dst` path is written whole or not at all from the caller's
/// point of view; callers stage into a scratch path and rename.
pub trait ProvingBackend {
    fn new_accumulator(&self, curve: &str, power: u32, path: &Path) -> Result<(), BackendError>;

    fn contribute(&self, src: &Path, dst: &Path, name: &str, entropy: &str) -> Result<(), BackendError>;

    fn beacon(
        &self,
        src: &Path,
        dst: &Path,
        name: &str,
        beacon_hash: &str,
        iterations_exp: u32,
    ) -> Result<(), BackendError>;

    fn prepare_phase2(&self, src: &Path, dst: &Path) -> Result<(), BackendError>;

    /// `Ok(false)` means the file was read but does not check out.
    fn verify(&self, path: &Path) -> Result<bool, BackendError>;

    fn new_proving_key(
        &self,
        constraint_system: &Path,
        accumulator: &Path,
        key: &Path,
    ) -> Result<(), BackendError>;

    fn contribute_key(&self, src: &Path, dst: &Path, name: &str, entropy: &str) -> Result<(), BackendError>;

    fn beacon_key(
        &self,
        src: &Path,
        dst: &Path,
        name: &str,
        beacon_hash: &str,
        iterations_exp: u32,
    ) -> Result<(), BackendError>;

    fn verify_key(
        &self,
        constraint_system: &Path,
        accumulator: &Path,
        key: &Path,
    ) -> Result<bool, BackendError>;

    fn export_verification_key(&self, key: &Path) -> Result<serde_json::Value, BackendError>;

    fn export_verifier_source(&self, key: &Path, template: Option<&Path>) -> Result<String, BackendError>;

    fn prove(
        &self,
        input: &CircuitInput,
        witness_program: &Path,
        key: &Path,
    ) -> Result<(Groth16Proof, Vec<String>), BackendError>;

    /// `Ok(false)` for a well-formed proof that does not verify.
    fn verify_proof(
        &self,
        verification_key: &serde_json::Value,
        public_signals: &[String],
        proof: &Groth16Proof,
    ) -> Result<bool, BackendError>;
}
