//! Arguments shared by the ceremony binaries.

use crate::contributor::{ChallengeHandoff, ContributionResponse, Contributor};
use crate::coordinator::{BatchReport, Coordinator};
use crate::error::CeremonyError;
use crate::utils::{initialize_entropy, prompt_user_input, EntropySource, Mode};
use clap::{Args, Subcommand};
use libs::backend::{ProvingBackend, SnarkjsBackend};
use libs::iotools::CeremonyConfig;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;

#[derive(Args, Debug)]
pub struct CeremonyArgs {
    /// JSON ceremony configuration; flags below override its fields
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ceremony base directory
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Accumulator power (2^power constraints)
    #[arg(long)]
    pub power: Option<u32>,

    /// Highest circuit depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Path of the snarkjs executable
    #[arg(long, value_name = "PATH", default_value = "snarkjs")]
    pub snarkjs: PathBuf,
}

impl CeremonyArgs {
    pub fn load(&self) -> Result<CeremonyConfig, CeremonyError> {
        let mut config = match &self.config {
            Some(path) => CeremonyConfig::read_from_json(path).map_err(CeremonyError::io(path))?,
            None => CeremonyConfig::default(),
        };
        if let Some(base_dir) = &self.base_dir {
            config.base_dir = base_dir.clone();
        }
        if let Some(power) = self.power {
            config.power = power;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn backend(&self) -> SnarkjsBackend {
        SnarkjsBackend::new(&self.snarkjs)
    }
}

/// Ways a contribution can reach the chain.
#[derive(Subcommand, Debug)]
pub enum ContributionAction {
    /// Contribute directly in the ceremony directory
    Local {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum, default_value = "random")]
        mode: Mode,
    },
    /// Copy the current head out for an external contributor
    Export {
        #[arg(long, value_name = "OUTFOLDER")]
        outfolder: PathBuf,
    },
    /// Act as the external contributor on an exported challenge
    Respond {
        #[arg(long, value_name = "FILE")]
        challenge: PathBuf,
        #[arg(long, value_name = "DIR")]
        workdir: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum, default_value = "random")]
        mode: Mode,
    },
    /// Accept a contributor's response (or a bare contributed file)
    Import {
        #[arg(long, value_name = "FILE", conflicts_with = "file")]
        response: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub fn contributor_name(name: Option<&str>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => prompt_user_input("Enter your name: "),
    }
}

/// Runs the contributor side of a hand-off and writes `response.json` next
/// to the response file.
pub fn respond(
    args: &CeremonyArgs,
    challenge: &Path,
    workdir: &Path,
    name: Option<&str>,
    mode: &Mode,
) -> Result<PathBuf, CeremonyError> {
    let handoff = ChallengeHandoff::read_from_json(challenge).map_err(CeremonyError::io(challenge))?;
    let mut contributor = Contributor::new(
        contributor_name(name),
        workdir,
        args.backend(),
        initialize_entropy(mode),
    );
    let response: ContributionResponse = contributor.contribute(&handoff)?;
    let response_path = workdir.join("response.json");
    response
        .write_into_json(&response_path)
        .map_err(CeremonyError::io(&response_path))?;
    Ok(response_path)
}

/// Opens a coordinator for one step. The directory lock is released when
/// this returns, whether `step` failed or not.
pub fn with_coordinator<B, T, F>(
    config: CeremonyConfig,
    backend: B,
    entropy: EntropySource,
    step: F,
) -> Result<T, CeremonyError>
where
    B: ProvingBackend,
    F: FnOnce(&mut Coordinator<B>) -> Result<T, CeremonyError>,
{
    let mut coordinator = Coordinator::open(config, backend, entropy)?;
    step(&mut coordinator)
}

/// Logs the error and maps the outcome to the process exit status.
pub fn exit_code(result: Result<ExitCode, CeremonyError>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

pub fn batch_exit_code(report: &BatchReport) -> ExitCode {
    if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct DepthSelection {
    /// A single circuit depth
    #[arg(long)]
    pub depth: Option<usize>,

    /// Every depth in [1, max_depth]
    #[arg(long)]
    pub all: bool,
}

impl DepthSelection {
    pub fn depths(&self, max_depth: usize) -> Vec<usize> {
        match self.depth {
            Some(depth) => vec![depth],
            None => (1..=max_depth).collect(),
        }
    }
}

pub fn print_batch(report: &BatchReport) {
    for (depth, result) in &report.results {
        match result {
            Ok(circuit) => println!("depth {:>2}: ok   {}", depth, circuit.proving_key.display()),
            Err(e) => println!("depth {:>2}: FAIL {}", depth, e),
        }
    }
    println!(
        "{} of {} depths finalized",
        report.succeeded().len(),
        report.results.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use libs::backend::mock::MockBackend;
    use tempfile::TempDir;

    fn config(dir: &Path) -> CeremonyConfig {
        let mut config = CeremonyConfig::with_base_dir(dir);
        config.power = 8;
        config.max_depth = 2;
        config
    }

    #[test]
    fn failed_step_releases_the_lock() {
        let dir = TempDir::new().unwrap();
        let failed = with_coordinator(config(dir.path()), MockBackend::new(), EntropySource::System, |c| {
            c.finalize_phase1()
        });
        assert!(matches!(failed, Err(CeremonyError::NoPriorAccumulator(_))));
        assert!(!config(dir.path()).lock_path().exists());

        let genesis = with_coordinator(config(dir.path()), MockBackend::new(), EntropySource::System, |c| {
            c.init_phase1()
        })
        .unwrap();
        assert!(genesis.ends_with("pot8_0000.ptau"));
        assert!(!config(dir.path()).lock_path().exists());
    }

    #[test]
    fn depth_selection_expands_all() {
        let all = DepthSelection { depth: None, all: true };
        assert_eq!(all.depths(3), vec![1, 2, 3]);
        let one = DepthSelection { depth: Some(2), all: false };
        assert_eq!(one.depths(3), vec![2]);
    }
}
