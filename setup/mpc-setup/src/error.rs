use libs::backend::BackendError;
use libs::iotools::{ConfigError, LocateError};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CeremonyError {
    #[error("depth {depth} is outside [1, {max}]")]
    InvalidDepth { depth: usize, max: usize },
    #[error("expected artifact not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("no accumulator to build on, expected at least {}", .0.display())]
    NoPriorAccumulator(PathBuf),
    #[error("no proving key to build on, expected at least {}", .0.display())]
    NoPriorKey(PathBuf),
    #[error("verification failed for {}", .0.display())]
    VerificationFailed(PathBuf),
    #[error("phase 1 is final, no further contributions accepted: {}", .0.display())]
    Phase1Finalized(PathBuf),
    #[error("phase 2 is final for this circuit: {}", .0.display())]
    Phase2Finalized(PathBuf),
    #[error("ceremony directory is held by another coordinator: {}", .0.display())]
    Locked(PathBuf),
    #[error("hash mismatch for {}: expected {expected}, got {actual}", path.display())]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("response for {} carries index {actual}, expected {expected}", path.display())]
    OutOfOrder {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },
    #[error("response {} was computed on {}, which is no longer the chain head", path.display(), challenge.display())]
    StaleChallenge { path: PathBuf, challenge: PathBuf },
    #[error("invalid ceremony configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{step} failed on {}: {source}", path.display())]
    Backend {
        step: &'static str,
        path: PathBuf,
        source: BackendError,
    },
    #[error("i/o error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl CeremonyError {
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> CeremonyError + '_ {
        move |source| CeremonyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn backend<'a>(step: &'static str, path: &'a Path) -> impl FnOnce(BackendError) -> CeremonyError + 'a {
        move |source| CeremonyError::Backend {
            step,
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<LocateError> for CeremonyError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::InvalidDepth { depth, max } => CeremonyError::InvalidDepth { depth, max },
            LocateError::NotFound(path) => CeremonyError::NotFound(path),
        }
    }
}
