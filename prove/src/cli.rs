//! Arguments shared by the proving binaries.

use crate::{ProofError, ProofService};
use clap::Args;
use libs::backend::SnarkjsBackend;
use libs::field_structures::LeafValue;
use libs::iotools::{CeremonyConfig, ConfigError};
use libs::merkle::LeafTarget;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Proof(#[from] ProofError),
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl CliError {
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> CliError + '_ {
        move |source| CliError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// JSON ceremony configuration
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ceremony base directory holding the finalized circuits
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Highest circuit depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Path of the snarkjs executable
    #[arg(long, value_name = "PATH", default_value = "snarkjs")]
    pub snarkjs: PathBuf,
}

impl ServiceArgs {
    pub fn load(&self) -> Result<CeremonyConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => CeremonyConfig::read_from_json(path).map_err(CliError::io(path))?,
            None => CeremonyConfig::default(),
        };
        if let Some(base_dir) = &self.base_dir {
            config.base_dir = base_dir.clone();
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn service(&self) -> Result<ProofService<SnarkjsBackend>, CliError> {
        let config = self.load()?;
        Ok(ProofService::from_config(&config, SnarkjsBackend::new(&self.snarkjs)))
    }
}

/// Leaf set as a JSON array of strings, non-negative integers or byte arrays.
pub fn read_leaves(path: &Path) -> Result<Vec<LeafValue>, CliError> {
    let text = fs::read_to_string(path).map_err(CliError::io(path))?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn target(value: Option<&str>, index: Option<usize>) -> LeafTarget {
    match (value, index) {
        (_, Some(index)) => LeafTarget::Index(index),
        (Some(value), None) => LeafTarget::from(value),
        (None, None) => LeafTarget::Index(0),
    }
}

/// Logs the error and exits non-zero.
pub fn exit_on_error<T>(result: Result<T, CliError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn index_wins_over_value() {
        assert_eq!(target(Some("a"), Some(2)), LeafTarget::Index(2));
        assert_eq!(target(Some("a"), None), LeafTarget::Value(LeafValue::from("a")));
    }

    #[test]
    fn leaves_file_accepts_mixed_values() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"["alice", 42, [222, 173]]"#).unwrap();
        let leaves = read_leaves(file.path()).unwrap();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[1], LeafValue::Number(42));
    }

    #[test]
    fn invalid_max_depth_is_a_config_error() {
        let args = ServiceArgs {
            config: None,
            base_dir: None,
            max_depth: Some(0),
            snarkjs: PathBuf::from("snarkjs"),
        };
        assert!(matches!(args.load(), Err(CliError::Config(ConfigError::InvalidMaxDepth(0)))));
    }
}
