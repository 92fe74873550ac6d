mod locator;

pub use locator::{ArtifactKind, ArtifactLocator, LocateError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[macro_export]
macro_rules! impl_read_from_json {
    ($t:ty) => {
        impl $t {
            pub fn read_from_json<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
                use std::io::BufReader;
                use std::fs::File;
                use serde_json::from_reader;
                let file = File::open(path.as_ref())?;
                let reader = BufReader::new(file);
                let res: Self = from_reader(reader)?;
                Ok(res)
            }
        }
    };
}

#[macro_export]
macro_rules! impl_write_into_json {
    ($t:ty) => {
        impl $t {
            pub fn write_into_json<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
                use std::io::{BufWriter, Write};
                use std::fs::{self, File};
                use serde_json::to_writer_pretty;
                let path = path.as_ref();
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let file = File::create(path)?;
                let mut writer = BufWriter::new(file);
                to_writer_pretty(&mut writer, self)?;
                writer.flush()?;
                Ok(())
            }
        }
    };
}

pub const DEFAULT_CURVE: &str = "bn128";
pub const DEFAULT_POWER: u32 = 15;
pub const DEFAULT_MAX_DEPTH: usize = 15;
pub const DEFAULT_CIRCUIT_PREFIX: &str = "MerkleTreeProof";
pub const DEFAULT_BEACON_HASH: &str =
    "0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

const MAX_POWER: u32 = 28;
const MAX_SUPPORTED_DEPTH: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("power must be in [1, 28], got {0}")]
    InvalidPower(u32),
    #[error("max_depth must be in [1, 32], got {0}")]
    InvalidMaxDepth(usize),
    #[error("beacon hash must be a non-empty even-length hex string, got {0:?}")]
    InvalidBeaconHash(String),
    #[error("beacon iterations exponent must be in [10, 63], got {0}")]
    InvalidBeaconIterations(u32),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub hash: String,
    pub iterations_exp: u32,
    pub apply_to_phase1: bool,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            hash: DEFAULT_BEACON_HASH.to_string(),
            iterations_exp: 10,
            apply_to_phase1: false,
        }
    }
}

/// Parameters of one ceremony run. Passed explicitly to every coordinator;
/// nothing here is global.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CeremonyConfig {
    pub curve: String,
    pub power: u32,
    pub base_dir: PathBuf,
    pub max_depth: usize,
    pub circuit_prefix: String,
    pub beacon: BeaconConfig,
    pub export_verifier: bool,
    pub verifier_template: Option<PathBuf>,
}

impl_read_from_json!(CeremonyConfig);
impl_write_into_json!(CeremonyConfig);

impl Default for CeremonyConfig {
    fn default() -> Self {
        Self {
            curve: DEFAULT_CURVE.to_string(),
            power: DEFAULT_POWER,
            base_dir: PathBuf::from("ceremony"),
            max_depth: DEFAULT_MAX_DEPTH,
            circuit_prefix: DEFAULT_CIRCUIT_PREFIX.to_string(),
            beacon: BeaconConfig::default(),
            export_verifier: true,
            verifier_template: None,
        }
    }
}

impl CeremonyConfig {
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.power == 0 || self.power > MAX_POWER {
            return Err(ConfigError::InvalidPower(self.power));
        }
        if self.max_depth == 0 || self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::InvalidMaxDepth(self.max_depth));
        }
        let hash = &self.beacon.hash;
        if hash.is_empty() || hex::decode(hash).is_err() {
            return Err(ConfigError::InvalidBeaconHash(hash.clone()));
        }
        if !(10..=63).contains(&self.beacon.iterations_exp) {
            return Err(ConfigError::InvalidBeaconIterations(self.beacon.iterations_exp));
        }
        Ok(())
    }

    pub fn pot_dir(&self) -> PathBuf {
        self.base_dir.join("pot")
    }

    pub fn circuits_dir(&self) -> PathBuf {
        self.base_dir.join("circuits")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".ceremony.lock")
    }

    pub fn locator(&self) -> ArtifactLocator {
        ArtifactLocator::new(self.circuits_dir(), self.circuit_prefix.clone(), self.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = CeremonyConfig::default();
        assert_eq!(config.curve, "bn128");
        assert_eq!(config.power, 15);
        assert_eq!(config.max_depth, 15);
        assert_eq!(config.beacon.iterations_exp, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = CeremonyConfig::default();
        config.power = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPower(0)));
        config.power = 29;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPower(29)));
        config.power = 12;
        config.max_depth = 33;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxDepth(33)));
        config.max_depth = 4;
        config.beacon.hash = "xyz".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBeaconHash(_))));
        config.beacon.hash = DEFAULT_BEACON_HASH.to_string();
        config.beacon.iterations_exp = 64;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBeaconIterations(64)));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ceremony.json");
        std::fs::write(&path, r#"{ "power": 12, "base_dir": "/tmp/c" }"#).unwrap();
        let config = CeremonyConfig::read_from_json(&path).unwrap();
        assert_eq!(config.power, 12);
        assert_eq!(config.base_dir, PathBuf::from("/tmp/c"));
        assert_eq!(config.circuit_prefix, DEFAULT_CIRCUIT_PREFIX);

        let copy = dir.path().join("nested/copy.json");
        config.write_into_json(&copy).unwrap();
        assert_eq!(CeremonyConfig::read_from_json(&copy).unwrap(), config);
    }
}
