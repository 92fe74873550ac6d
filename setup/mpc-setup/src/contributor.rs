use crate::error::CeremonyError;
use crate::utils::EntropySource;
use libs::backend::ProvingBackend;
use libs::utils::blake2b_hex;
use libs::{impl_read_from_json, impl_write_into_json};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    One,
    Two { depth: usize },
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::One => write!(f, "phase 1"),
            Phase::Two { depth } => write!(f, "phase 2 (depth {})", depth),
        }
    }
}

/// What the coordinator hands an external contributor: a copy of the current
/// chain head and the hash it must still have on arrival.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeHandoff {
    pub phase: Phase,
    pub index: u32,
    pub path: PathBuf,
    pub hash: String,
}

/// What comes back: the contributed file, the index it claims, its hash and
/// the hash of the challenge it was computed on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionResponse {
    pub phase: Phase,
    pub index: u32,
    pub name: String,
    pub path: PathBuf,
    pub hash: String,
    pub challenge_hash: String,
}

impl_read_from_json!(ChallengeHandoff);
impl_write_into_json!(ChallengeHandoff);
impl_read_from_json!(ContributionResponse);
impl_write_into_json!(ContributionResponse);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    Local,
    Imported,
    Beacon,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub contributor_no: u32,
    pub kind: ContributionKind,
    pub date: String,
    pub name: String,
    pub prev_hash: String,
    pub current_hash: String,
    pub time_taken_seconds: f64,
}

impl fmt::Display for ContributionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "### Contributor No: {:02}\n\n\
            **Date:** {}\n\n\
            Name: {}\n\n\
            Kind: {:?}\n\n\
            Previous hash:\n    Blake2b: {}\n\n\
            Response hash:\n    Blake2b: {}\n\n\
            Time taken: ~{} seconds",
            self.contributor_no,
            self.date,
            self.name,
            self.kind,
            self.prev_hash,
            self.current_hash,
            self.time_taken_seconds,
        )
    }
}

/// Append-only log of accepted contributions for one chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub contributions: Vec<ContributionRecord>,
}

impl_read_from_json!(Transcript);
impl_write_into_json!(Transcript);

impl Transcript {
    pub fn load_or_default(path: &Path) -> Result<Self, CeremonyError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::read_from_json(path).map_err(CeremonyError::io(path))
    }

    pub fn append(path: &Path, record: ContributionRecord) -> Result<(), CeremonyError> {
        let mut transcript = Self::load_or_default(path)?;
        transcript.contributions.push(record);
        transcript.write_into_json(path).map_err(CeremonyError::io(path))
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.contributions.iter().enumerate() {
            if i > 0 {
                write!(f, "\n\n")?;
            }
            write!(f, "{}", record)?;
        }
        Ok(())
    }
}

pub(crate) fn hash_file(path: &Path) -> Result<String, CeremonyError> {
    blake2b_hex(path).map_err(CeremonyError::io(path))
}

/// An external party contributing out of process. It only ever writes into
/// its own working directory.
pub struct Contributor<B: ProvingBackend> {
    name: String,
    work_dir: PathBuf,
    backend: B,
    entropy: EntropySource,
}

impl<B: ProvingBackend> Contributor<B> {
    pub fn new<P: AsRef<Path>>(name: impl Into<String>, work_dir: P, backend: B, entropy: EntropySource) -> Self {
        Self {
            name: name.into(),
            work_dir: work_dir.as_ref().to_path_buf(),
            backend,
            entropy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks the challenge arrived intact, contributes to it and returns the
    /// response. Phase 1 challenges are also verified before contributing;
    /// phase 2 keys need the circuit to verify and are checked on import.
    pub fn contribute(&mut self, handoff: &ChallengeHandoff) -> Result<ContributionResponse, CeremonyError> {
        let received_hash = hash_file(&handoff.path)?;
        if received_hash != handoff.hash {
            return Err(CeremonyError::HashMismatch {
                path: handoff.path.clone(),
                expected: handoff.hash.clone(),
                actual: received_hash,
            });
        }

        fs::create_dir_all(&self.work_dir).map_err(CeremonyError::io(&self.work_dir))?;
        let extension = match handoff.phase {
            Phase::One => "ptau",
            Phase::Two { .. } => "zkey",
        };
        let challenge = self.work_dir.join(format!("challenge_{:04}.{}", handoff.index, extension));
        fs::copy(&handoff.path, &challenge).map_err(CeremonyError::io(&handoff.path))?;

        if handoff.phase == Phase::One {
            let valid = self
                .backend
                .verify(&challenge)
                .map_err(CeremonyError::backend("verify", &challenge))?;
            if !valid {
                return Err(CeremonyError::VerificationFailed(handoff.path.clone()));
            }
        }

        let index = handoff.index + 1;
        let response = self.work_dir.join(format!("response_{:04}.{}", index, extension));
        let entropy = self.entropy.next_entropy();
        let start = Instant::now();
        let contributed = match handoff.phase {
            Phase::One => self.backend.contribute(&challenge, &response, &self.name, &entropy),
            Phase::Two { .. } => self.backend.contribute_key(&challenge, &response, &self.name, &entropy),
        };
        contributed.map_err(CeremonyError::backend("contribute", &challenge))?;
        info!(
            phase = %handoff.phase,
            index,
            elapsed = start.elapsed().as_secs_f64(),
            "contribution computed"
        );

        Ok(ContributionResponse {
            phase: handoff.phase,
            index,
            name: self.name.clone(),
            hash: hash_file(&response)?,
            path: response,
            challenge_hash: handoff.hash.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_renders_as_markdown() {
        let record = ContributionRecord {
            contributor_no: 3,
            kind: ContributionKind::Imported,
            date: "2024-01-01 00:00:00".to_string(),
            name: "alice".to_string(),
            prev_hash: "aa".to_string(),
            current_hash: "bb".to_string(),
            time_taken_seconds: 1.5,
        };
        let text = record.to_string();
        assert!(text.starts_with("### Contributor No: 03"));
        assert!(text.contains("Name: alice"));
        assert!(text.contains("Response hash:\n    Blake2b: bb"));
    }

    #[test]
    fn handoff_phase_serializes_with_depth() {
        let handoff = ChallengeHandoff {
            phase: Phase::Two { depth: 4 },
            index: 2,
            path: PathBuf::from("x.zkey"),
            hash: "00".to_string(),
        };
        let json = serde_json::to_value(&handoff).unwrap();
        assert_eq!(json["phase"]["two"]["depth"], 4);
        let back: ChallengeHandoff = serde_json::from_value(json).unwrap();
        assert_eq!(back, handoff);
    }
}
