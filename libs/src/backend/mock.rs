//! In-process stand-in for the proving system.
//!
//! Accumulators and keys are small JSON files carrying a hash chain over
//! their contributions, so `verify` notices edited or truncated files. A
//! proof is a tag binding the verification key id to the public signals.

use super::{BackendError, Groth16Proof, ProvingBackend};
use crate::field_structures::FieldHasher;
use crate::merkle::CircuitInput;
use crate::utils::blake2b_bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const ACCUMULATOR_FORMAT: &str = "mock-ptau";
const KEY_FORMAT: &str = "mock-zkey";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MockStep {
    NewAccumulator,
    Contribute,
    Beacon,
    PreparePhase2,
    NewProvingKey,
    ContributeKey,
    BeaconKey,
    Prove,
}

#[derive(Clone, Debug, Default)]
pub struct MockBackend {
    failing: HashSet<MockStep>,
    reject_keys: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Link {
    name: String,
    contribution: String,
    digest: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct MockAccumulator {
    format: String,
    curve: String,
    power: u32,
    prepared: bool,
    chain: Vec<Link>,
    digest: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct MockKey {
    format: String,
    curve: String,
    circuit: String,
    accumulator: String,
    chain: Vec<Link>,
    digest: String,
}

fn digest(parts: &[&[u8]]) -> String {
    let mut data = Vec::new();
    for part in parts {
        data.extend_from_slice(&(part.len() as u64).to_le_bytes());
        data.extend_from_slice(part);
    }
    hex::encode(&blake2b_bytes(&data)[..])
}

fn chain_is_intact(genesis: String, chain: &[Link], head: &str) -> bool {
    let mut current = genesis;
    for link in chain {
        let next = digest(&[current.as_bytes(), link.name.as_bytes(), link.contribution.as_bytes()]);
        if next != link.digest {
            return false;
        }
        current = next;
    }
    current == head
}

fn extend(chain: &mut Vec<Link>, head: &mut String, name: &str, contribution: String) {
    let next = digest(&[head.as_bytes(), name.as_bytes(), contribution.as_bytes()]);
    chain.push(Link {
        name: name.to_string(),
        contribution,
        digest: next.clone(),
    });
    *head = next;
}

impl MockAccumulator {
    fn genesis(curve: &str, power: u32) -> String {
        digest(&[&b"ptau"[..], curve.as_bytes(), &power.to_le_bytes()[..]])
    }

    fn is_valid(&self) -> bool {
        self.format == ACCUMULATOR_FORMAT
            && chain_is_intact(Self::genesis(&self.curve, self.power), &self.chain, &self.digest)
    }
}

impl MockKey {
    fn genesis(circuit: &str, accumulator: &str) -> String {
        digest(&[&b"zkey"[..], circuit.as_bytes(), accumulator.as_bytes()])
    }

    fn is_valid(&self) -> bool {
        self.format == KEY_FORMAT
            && chain_is_intact(Self::genesis(&self.circuit, &self.accumulator), &self.chain, &self.digest)
    }
}

fn read<T: DeserializeOwned>(path: &Path) -> Result<T, BackendError> {
    let text = fs::read_to_string(path).map_err(BackendError::io(path))?;
    serde_json::from_str(&text).map_err(BackendError::json(path))
}

// Unparseable content is a failed check, a missing file is an error.
fn read_for_check<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, BackendError> {
    let text = fs::read_to_string(path).map_err(BackendError::io(path))?;
    Ok(serde_json::from_str(&text).ok())
}

fn malformed(path: &Path, reason: &str) -> BackendError {
    BackendError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn file_digest(path: &Path) -> Result<String, BackendError> {
    let bytes = fs::read(path).map_err(BackendError::io(path))?;
    Ok(digest(&[&b"r1cs"[..], &bytes[..]]))
}

fn proof_tag(vk_id: &str, public_signals: &[String]) -> String {
    digest(&[vk_id.as_bytes(), public_signals.join(",").as_bytes()])
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `step` leave a truncated output file behind and then fail.
    pub fn failing(mut self, step: MockStep) -> Self {
        self.failing.insert(step);
        self
    }

    /// Makes `verify_key` report every key as invalid.
    pub fn rejecting_keys(mut self) -> Self {
        self.reject_keys = true;
        self
    }

    fn write<T: Serialize>(&self, step: MockStep, path: &Path, value: &T) -> Result<(), BackendError> {
        if self.failing.contains(&step) {
            fs::write(path, b"{\"truncated\":").map_err(BackendError::io(path))?;
            return Err(BackendError::CommandFailed {
                command: format!("mock {:?}", step),
                stderr: "interrupted".to_string(),
            });
        }
        let text = serde_json::to_string_pretty(value).map_err(BackendError::json(path))?;
        fs::write(path, text).map_err(BackendError::io(path))
    }

    fn load_accumulator(&self, path: &Path) -> Result<MockAccumulator, BackendError> {
        let acc: MockAccumulator = read(path)?;
        if !acc.is_valid() {
            return Err(malformed(path, "accumulator fails verification"));
        }
        Ok(acc)
    }

    fn load_key(&self, path: &Path) -> Result<MockKey, BackendError> {
        let key: MockKey = read(path)?;
        if !key.is_valid() {
            return Err(malformed(path, "proving key fails verification"));
        }
        Ok(key)
    }

    fn advance_accumulator(
        &self,
        step: MockStep,
        src: &Path,
        dst: &Path,
        name: &str,
        contribution: String,
    ) -> Result<(), BackendError> {
        let mut acc = self.load_accumulator(src)?;
        if acc.prepared {
            return Err(malformed(src, "accumulator is already prepared for phase 2"));
        }
        extend(&mut acc.chain, &mut acc.digest, name, contribution);
        self.write(step, dst, &acc)
    }

    fn advance_key(
        &self,
        step: MockStep,
        src: &Path,
        dst: &Path,
        name: &str,
        contribution: String,
    ) -> Result<(), BackendError> {
        let mut key = self.load_key(src)?;
        extend(&mut key.chain, &mut key.digest, name, contribution);
        self.write(step, dst, &key)
    }
}

impl ProvingBackend for MockBackend {
    fn new_accumulator(&self, curve: &str, power: u32, path: &Path) -> Result<(), BackendError> {
        let acc = MockAccumulator {
            format: ACCUMULATOR_FORMAT.to_string(),
            curve: curve.to_string(),
            power,
            prepared: false,
            chain: Vec::new(),
            digest: MockAccumulator::genesis(curve, power),
        };
        self.write(MockStep::NewAccumulator, path, &acc)
    }

    fn contribute(&self, src: &Path, dst: &Path, name: &str, entropy: &str) -> Result<(), BackendError> {
        let contribution = digest(&[&b"entropy"[..], entropy.as_bytes()]);
        self.advance_accumulator(MockStep::Contribute, src, dst, name, contribution)
    }

    fn beacon(
        &self,
        src: &Path,
        dst: &Path,
        name: &str,
        beacon_hash: &str,
        iterations_exp: u32,
    ) -> Result<(), BackendError> {
        let contribution = digest(&[&b"beacon"[..], beacon_hash.as_bytes(), &iterations_exp.to_le_bytes()[..]]);
        self.advance_accumulator(MockStep::Beacon, src, dst, name, contribution)
    }

    fn prepare_phase2(&self, src: &Path, dst: &Path) -> Result<(), BackendError> {
        let mut acc = self.load_accumulator(src)?;
        acc.prepared = true;
        self.write(MockStep::PreparePhase2, dst, &acc)
    }

    fn verify(&self, path: &Path) -> Result<bool, BackendError> {
        Ok(read_for_check::<MockAccumulator>(path)?.map_or(false, |acc| acc.is_valid()))
    }

    fn new_proving_key(
        &self,
        constraint_system: &Path,
        accumulator: &Path,
        key: &Path,
    ) -> Result<(), BackendError> {
        let circuit = file_digest(constraint_system)?;
        let acc = self.load_accumulator(accumulator)?;
        if !acc.prepared {
            return Err(malformed(accumulator, "accumulator is not prepared for phase 2"));
        }
        let proving_key = MockKey {
            format: KEY_FORMAT.to_string(),
            curve: acc.curve.clone(),
            digest: MockKey::genesis(&circuit, &acc.digest),
            circuit,
            accumulator: acc.digest,
            chain: Vec::new(),
        };
        self.write(MockStep::NewProvingKey, key, &proving_key)
    }

    fn contribute_key(&self, src: &Path, dst: &Path, name: &str, entropy: &str) -> Result<(), BackendError> {
        let contribution = digest(&[&b"entropy"[..], entropy.as_bytes()]);
        self.advance_key(MockStep::ContributeKey, src, dst, name, contribution)
    }

    fn beacon_key(
        &self,
        src: &Path,
        dst: &Path,
        name: &str,
        beacon_hash: &str,
        iterations_exp: u32,
    ) -> Result<(), BackendError> {
        let contribution = digest(&[&b"beacon"[..], beacon_hash.as_bytes(), &iterations_exp.to_le_bytes()[..]]);
        self.advance_key(MockStep::BeaconKey, src, dst, name, contribution)
    }

    fn verify_key(
        &self,
        constraint_system: &Path,
        accumulator: &Path,
        key: &Path,
    ) -> Result<bool, BackendError> {
        if self.reject_keys {
            return Ok(false);
        }
        let circuit = file_digest(constraint_system)?;
        let acc: MockAccumulator = read(accumulator)?;
        let Some(proving_key) = read_for_check::<MockKey>(key)? else {
            return Ok(false);
        };
        Ok(proving_key.is_valid()
            && proving_key.circuit == circuit
            && proving_key.accumulator == acc.digest)
    }

    fn export_verification_key(&self, key: &Path) -> Result<serde_json::Value, BackendError> {
        let proving_key = self.load_key(key)?;
        Ok(serde_json::json!({
            "protocol": "groth16",
            "curve": proving_key.curve,
            "nPublic": 1,
            "vk_id": proving_key.digest,
        }))
    }

    fn export_verifier_source(&self, key: &Path, template: Option<&Path>) -> Result<String, BackendError> {
        let proving_key = self.load_key(key)?;
        match template {
            Some(template) => {
                let text = fs::read_to_string(template).map_err(BackendError::io(template))?;
                Ok(text.replace("{{vk_id}}", &proving_key.digest))
            }
            None => Ok(format!(
                "// SPDX-License-Identifier: GPL-3.0\npragma solidity >=0.7.0 <0.9.0;\n\ncontract Groth16Verifier {{\n    // vk {}\n}}\n",
                proving_key.digest
            )),
        }
    }

    fn prove(
        &self,
        input: &CircuitInput,
        witness_program: &Path,
        key: &Path,
    ) -> Result<(Groth16Proof, Vec<String>), BackendError> {
        fs::metadata(witness_program).map_err(BackendError::io(witness_program))?;
        let proving_key = self.load_key(key)?;
        if self.failing.contains(&MockStep::Prove) || !input.clone().into_proof().verify(&FieldHasher::new()) {
            return Err(BackendError::CommandFailed {
                command: "mock groth16 fullprove".to_string(),
                stderr: "Error: Assert Failed".to_string(),
            });
        }
        let public_signals = vec![input.root.to_decimal()];
        let tag = proof_tag(&proving_key.digest, &public_signals);
        let (head, tail) = tag.split_at(tag.len() / 2);
        let proof = Groth16Proof {
            pi_a: vec![head.to_string(), tail.to_string(), "1".to_string()],
            pi_b: vec![
                vec!["0".to_string(), "0".to_string()],
                vec!["0".to_string(), "0".to_string()],
                vec!["1".to_string(), "0".to_string()],
            ],
            pi_c: vec!["0".to_string(), "0".to_string(), "1".to_string()],
            protocol: "groth16".to_string(),
            curve: proving_key.curve,
        };
        Ok((proof, public_signals))
    }

    fn verify_proof(
        &self,
        verification_key: &serde_json::Value,
        public_signals: &[String],
        proof: &Groth16Proof,
    ) -> Result<bool, BackendError> {
        let vk_id = verification_key
            .get("vk_id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| malformed(Path::new("<verification key>"), "missing vk_id"))?;
        if proof.protocol != "groth16" || proof.pi_a.len() < 2 {
            return Ok(false);
        }
        let tag = proof_tag(vk_id, public_signals);
        Ok(format!("{}{}", proof.pi_a[0], proof.pi_a[1]) == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_structures::LeafValue;
    use crate::merkle::MerkleTreeBuilder;
    use tempfile::TempDir;

    #[test]
    fn contributions_chain_and_verify() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let p0 = dir.path().join("pot8_0000.ptau");
        let p1 = dir.path().join("pot8_0001.ptau");
        backend.new_accumulator("bn128", 8, &p0).unwrap();
        backend.contribute(&p0, &p1, "alice", "entropy").unwrap();
        assert!(backend.verify(&p0).unwrap());
        assert!(backend.verify(&p1).unwrap());

        let text = fs::read_to_string(&p1).unwrap().replace("alice", "mallory");
        fs::write(&p1, text).unwrap();
        assert!(!backend.verify(&p1).unwrap());

        fs::write(&p1, b"not json").unwrap();
        assert!(!backend.verify(&p1).unwrap());
    }

    #[test]
    fn proof_binds_public_signals() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let p0 = dir.path().join("p0.ptau");
        let prepared = dir.path().join("final.ptau");
        let r1cs = dir.path().join("c.r1cs");
        let wasm = dir.path().join("c.wasm");
        let zkey = dir.path().join("c.zkey");
        fs::write(&r1cs, b"constraints").unwrap();
        fs::write(&wasm, b"wasm").unwrap();
        backend.new_accumulator("bn128", 8, &p0).unwrap();
        backend.prepare_phase2(&p0, &prepared).unwrap();
        backend.new_proving_key(&r1cs, &prepared, &zkey).unwrap();
        assert!(backend.verify_key(&r1cs, &prepared, &zkey).unwrap());

        let leaves: Vec<LeafValue> = vec!["a".into(), "b".into()];
        let (_, merkle) = MerkleTreeBuilder::default().build(&leaves, &"b".into()).unwrap();
        let (proof, signals) = backend.prove(&merkle.to_circuit_input(), &wasm, &zkey).unwrap();
        let vk = backend.export_verification_key(&zkey).unwrap();
        assert!(backend.verify_proof(&vk, &signals, &proof).unwrap());
        assert!(!backend.verify_proof(&vk, &["1".to_string()], &proof).unwrap());
    }

    #[test]
    fn failing_step_leaves_truncated_output() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new().failing(MockStep::Contribute);
        let p0 = dir.path().join("p0.ptau");
        let p1 = dir.path().join("p1.ptau");
        backend.new_accumulator("bn128", 8, &p0).unwrap();
        assert!(backend.contribute(&p0, &p1, "bob", "e").is_err());
        assert!(!backend.verify(&p1).unwrap());
    }
}
