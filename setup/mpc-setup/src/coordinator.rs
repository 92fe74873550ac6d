use crate::chain::{partial_path, ContributionChain};
use crate::contributor::{
    hash_file, ChallengeHandoff, ContributionKind, ContributionRecord, ContributionResponse, Phase, Transcript,
};
use crate::error::CeremonyError;
use crate::lock::CeremonyLock;
use crate::utils::EntropySource;
use chrono::Local;
use libs::backend::{BackendError, ProvingBackend};
use libs::iotools::{ArtifactKind, ArtifactLocator, CeremonyConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

const PHASE1_BEACON_NAME: &str = "Final Beacon";
const PHASE2_BEACON_NAME: &str = "Final Beacon phase2";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CeremonyState {
    Uninitialized,
    Phase1Open { index: u32 },
    Phase1Final,
    Cleaned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase2State {
    NotStarted,
    Open { index: u32 },
    Final,
}

/// Artifacts of one finalized circuit depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizedCircuit {
    pub depth: usize,
    pub proving_key: PathBuf,
    pub verification_key: PathBuf,
    pub verifier: Option<PathBuf>,
}

/// Per-depth outcome of a batch run. Depths finalize independently, so a
/// failure never undoes an earlier success.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(usize, Result<FinalizedCircuit, CeremonyError>)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> Vec<usize> {
        self.results
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(depth, _)| *depth)
            .collect()
    }

    pub fn failed(&self) -> Vec<(usize, &CeremonyError)> {
        self.results
            .iter()
            .filter_map(|(depth, result)| result.as_ref().err().map(|e| (*depth, e)))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|(_, result)| result.is_ok())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub retained: Vec<PathBuf>,
    /// Depths whose key chain was left alone because it has no final key.
    pub skipped_depths: Vec<usize>,
}

/// Sole writer of a ceremony directory for the duration of one run.
pub struct Coordinator<B: ProvingBackend> {
    config: CeremonyConfig,
    backend: B,
    entropy: EntropySource,
    locator: ArtifactLocator,
    pot: ContributionChain,
    _lock: CeremonyLock,
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "discarded"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not discard file"),
    }
}

// Runs `produce` against a scratch file and moves the result to `target`
// only on success, so `target` is either absent or complete.
fn stage<F>(step: &'static str, input: &Path, target: &Path, produce: F) -> Result<(), CeremonyError>
where
    F: FnOnce(&Path) -> Result<(), BackendError>,
{
    stage_checked(step, input, target, produce, |_| Ok(true))
}

// Same as `stage`, but `check` has to accept the scratch file before it is
// renamed. A rejected output never appears under the target name.
fn stage_checked<F, V>(
    step: &'static str,
    input: &Path,
    target: &Path,
    produce: F,
    check: V,
) -> Result<(), CeremonyError>
where
    F: FnOnce(&Path) -> Result<(), BackendError>,
    V: FnOnce(&Path) -> Result<bool, BackendError>,
{
    let partial = partial_path(target);
    discard(&partial);
    if let Err(source) = produce(&partial) {
        discard(&partial);
        return Err(CeremonyError::Backend {
            step,
            path: input.to_path_buf(),
            source,
        });
    }
    match check(&partial) {
        Ok(true) => {}
        Ok(false) => {
            discard(&partial);
            return Err(CeremonyError::VerificationFailed(target.to_path_buf()));
        }
        Err(e) => {
            discard(&partial);
            return Err(CeremonyError::backend("verify", target)(e));
        }
    }
    fs::rename(&partial, target).map_err(CeremonyError::io(target))
}

fn write_atomic(target: &Path, contents: &str) -> Result<(), CeremonyError> {
    let partial = partial_path(target);
    fs::write(&partial, contents).map_err(CeremonyError::io(&partial))?;
    fs::rename(&partial, target).map_err(CeremonyError::io(target))
}

fn head(chain: &ContributionChain) -> Result<Option<(u32, PathBuf)>, CeremonyError> {
    chain.latest().map_err(CeremonyError::io(chain.dir()))
}

// A beacon at the head was left by a finalization that failed afterwards.
fn head_is_beacon(chain: &ContributionChain, index: u32) -> Result<bool, CeremonyError> {
    let transcript = Transcript::load_or_default(&chain.transcript_path())?;
    Ok(transcript
        .contributions
        .last()
        .map_or(false, |last| last.contributor_no == index && last.kind == ContributionKind::Beacon))
}

fn record(
    chain: &ContributionChain,
    index: u32,
    name: &str,
    kind: ContributionKind,
    prev: &Path,
    current: &Path,
    started: Instant,
) -> Result<(), CeremonyError> {
    let record = ContributionRecord {
        contributor_no: index,
        kind,
        date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        name: name.to_string(),
        prev_hash: hash_file(prev)?,
        current_hash: hash_file(current)?,
        time_taken_seconds: started.elapsed().as_secs_f64(),
    };
    Transcript::append(&chain.transcript_path(), record)
}

// Copies an external file into the chain at `index + 1` if `verify` accepts
// it. A rejected file never becomes visible under a chain name.
fn accept_import<V>(
    chain: &ContributionChain,
    index: u32,
    prev: &Path,
    source: &Path,
    name: &str,
    verify: V,
) -> Result<PathBuf, CeremonyError>
where
    V: FnOnce(&Path) -> Result<bool, BackendError>,
{
    let started = Instant::now();
    let target = chain.path(index + 1);
    let partial = partial_path(&target);
    fs::copy(source, &partial).map_err(CeremonyError::io(source))?;
    match verify(&partial) {
        Ok(true) => {}
        Ok(false) => {
            discard(&partial);
            return Err(CeremonyError::VerificationFailed(source.to_path_buf()));
        }
        Err(e) => {
            discard(&partial);
            return Err(CeremonyError::backend("verify", source)(e));
        }
    }
    fs::rename(&partial, &target).map_err(CeremonyError::io(&target))?;
    record(chain, index + 1, name, ContributionKind::Imported, prev, &target, started)?;
    Ok(target)
}

fn export_head(chain: &ContributionChain, index: u32, src: &Path, dir: &Path, phase: Phase) -> Result<ChallengeHandoff, CeremonyError> {
    fs::create_dir_all(dir).map_err(CeremonyError::io(dir))?;
    let file_name = src
        .file_name()
        .ok_or_else(|| CeremonyError::NotFound(src.to_path_buf()))?;
    let dst = dir.join(file_name);
    fs::copy(src, &dst).map_err(CeremonyError::io(&dst))?;
    info!(index, path = %dst.display(), dir = %chain.dir().display(), "challenge exported");
    Ok(ChallengeHandoff {
        phase,
        index,
        hash: hash_file(&dst)?,
        path: dst,
    })
}

fn imported_name(path: &Path) -> String {
    let file = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
    format!("imported:{}", file)
}

impl<B: ProvingBackend> Coordinator<B> {
    /// Takes the directory lock and discards scratch files left by an
    /// interrupted run.
    pub fn open(config: CeremonyConfig, backend: B, entropy: EntropySource) -> Result<Self, CeremonyError> {
        config.validate()?;
        let lock = CeremonyLock::acquire(&config.lock_path())?;
        let pot = ContributionChain::new(config.pot_dir(), format!("pot{}", config.power), "ptau");
        fs::create_dir_all(pot.dir()).map_err(CeremonyError::io(pot.dir()))?;
        let circuits_dir = config.circuits_dir();
        fs::create_dir_all(&circuits_dir).map_err(CeremonyError::io(&circuits_dir))?;

        let coordinator = Self {
            locator: config.locator(),
            pot,
            config,
            backend,
            entropy,
            _lock: lock,
        };
        coordinator.discard_partials()?;
        info!(
            base_dir = %coordinator.config.base_dir.display(),
            curve = %coordinator.config.curve,
            power = coordinator.config.power,
            "ceremony opened"
        );
        Ok(coordinator)
    }

    pub fn config(&self) -> &CeremonyConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn locator(&self) -> &ArtifactLocator {
        &self.locator
    }

    pub fn pot_chain(&self) -> &ContributionChain {
        &self.pot
    }

    pub fn key_chain(&self, depth: usize) -> Result<ContributionChain, CeremonyError> {
        let dir = self.locator.circuit_dir(depth)?;
        Ok(ContributionChain::new(dir, self.locator.circuit_name(depth), "zkey"))
    }

    fn discard_partials(&self) -> Result<(), CeremonyError> {
        let mut chains = vec![self.pot.clone()];
        for depth in 1..=self.config.max_depth {
            chains.push(self.key_chain(depth)?);
        }
        for chain in &chains {
            for path in chain.discard_partials().map_err(CeremonyError::io(chain.dir()))? {
                warn!(path = %path.display(), "discarded partial output of an interrupted step");
            }
        }
        Ok(())
    }

    fn phase1_final(&self) -> Result<PathBuf, CeremonyError> {
        let path = self.pot.final_path();
        if !path.is_file() {
            return Err(CeremonyError::NotFound(path));
        }
        Ok(path)
    }

    pub fn state(&self) -> Result<CeremonyState, CeremonyError> {
        if self.pot.is_final() {
            let intermediates = self.pot.intermediates().map_err(CeremonyError::io(self.pot.dir()))?;
            return Ok(if intermediates.is_empty() {
                CeremonyState::Cleaned
            } else {
                CeremonyState::Phase1Final
            });
        }
        Ok(match head(&self.pot)? {
            Some((index, _)) => CeremonyState::Phase1Open { index },
            None => CeremonyState::Uninitialized,
        })
    }

    pub fn phase2_state(&self, depth: usize) -> Result<Phase2State, CeremonyError> {
        let chain = self.key_chain(depth)?;
        if chain.is_final() {
            return Ok(Phase2State::Final);
        }
        Ok(match head(&chain)? {
            Some((index, _)) => Phase2State::Open { index },
            None => Phase2State::NotStarted,
        })
    }

    /// Creates accumulator 0000. Returns the existing one untouched if it is
    /// already there.
    pub fn init_phase1(&self) -> Result<PathBuf, CeremonyError> {
        let genesis = self.pot.path(0);
        if genesis.is_file() {
            info!(path = %genesis.display(), "phase 1 already initialized");
            return Ok(genesis);
        }
        if self.pot.is_final() {
            return Err(CeremonyError::Phase1Finalized(self.pot.final_path()));
        }
        stage("new accumulator", &genesis, &genesis, |partial| {
            self.backend
                .new_accumulator(&self.config.curve, self.config.power, partial)
        })?;
        info!(path = %genesis.display(), curve = %self.config.curve, power = self.config.power, "phase 1 initialized");
        Ok(genesis)
    }

    pub fn contribute_phase1(&mut self, name: &str) -> Result<PathBuf, CeremonyError> {
        if self.pot.is_final() {
            return Err(CeremonyError::Phase1Finalized(self.pot.final_path()));
        }
        let (index, src) = head(&self.pot)?.ok_or_else(|| CeremonyError::NoPriorAccumulator(self.pot.path(0)))?;
        let dst = self.pot.path(index + 1);
        let entropy = self.entropy.next_entropy();
        let started = Instant::now();
        stage("contribute", &src, &dst, |partial| {
            self.backend.contribute(&src, partial, name, &entropy)
        })?;
        record(&self.pot, index + 1, name, ContributionKind::Local, &src, &dst, started)?;
        info!(index = index + 1, path = %dst.display(), "phase 1 contribution accepted");
        Ok(dst)
    }

    pub fn export_for_contributor(&self, dir: &Path) -> Result<ChallengeHandoff, CeremonyError> {
        if self.pot.is_final() {
            return Err(CeremonyError::Phase1Finalized(self.pot.final_path()));
        }
        let (index, src) = head(&self.pot)?.ok_or_else(|| CeremonyError::NoPriorAccumulator(self.pot.path(0)))?;
        export_head(&self.pot, index, &src, dir, Phase::One)
    }

    /// Re-imports an externally contributed accumulator as the next index,
    /// after it passes verification.
    pub fn import_contribution(&mut self, path: &Path) -> Result<PathBuf, CeremonyError> {
        self.import_phase1(path, &imported_name(path))
    }

    fn import_phase1(&self, path: &Path, name: &str) -> Result<PathBuf, CeremonyError> {
        if !path.is_file() {
            return Err(CeremonyError::NotFound(path.to_path_buf()));
        }
        if self.pot.is_final() {
            return Err(CeremonyError::Phase1Finalized(self.pot.final_path()));
        }
        let (index, prev) = head(&self.pot)?.ok_or_else(|| CeremonyError::NoPriorAccumulator(self.pot.path(0)))?;
        let accepted = accept_import(&self.pot, index, &prev, path, name, |partial| self.backend.verify(partial))?;
        info!(index = index + 1, path = %accepted.display(), "phase 1 contribution imported");
        Ok(accepted)
    }

    /// Receipt gate for a [`ContributionResponse`]: the file must still hash
    /// to what the contributor reported and must have been computed on the
    /// current head.
    pub fn import_response(&mut self, response: &ContributionResponse) -> Result<PathBuf, CeremonyError> {
        if !response.path.is_file() {
            return Err(CeremonyError::NotFound(response.path.clone()));
        }
        let actual = hash_file(&response.path)?;
        if actual != response.hash {
            return Err(CeremonyError::HashMismatch {
                path: response.path.clone(),
                expected: response.hash.clone(),
                actual,
            });
        }
        let chain = match response.phase {
            Phase::One => self.pot.clone(),
            Phase::Two { depth } => self.key_chain(depth)?,
        };
        let current = head(&chain)?;
        let expected = current.as_ref().map_or(0, |(index, _)| index + 1);
        if response.index != expected {
            return Err(CeremonyError::OutOfOrder {
                path: response.path.clone(),
                expected,
                actual: response.index,
            });
        }
        if let Some((_, head_path)) = current {
            if hash_file(&head_path)? != response.challenge_hash {
                return Err(CeremonyError::StaleChallenge {
                    path: response.path.clone(),
                    challenge: head_path,
                });
            }
        }
        match response.phase {
            Phase::One => self.import_phase1(&response.path, &response.name),
            Phase::Two { depth } => self.import_phase2(depth, &response.path, &response.name),
        }
    }

    /// Seals phase 1. Needs at least one contribution past the initial
    /// accumulator. Returns the existing final file if there is one.
    pub fn finalize_phase1(&self) -> Result<PathBuf, CeremonyError> {
        let final_path = self.pot.final_path();
        if final_path.is_file() {
            info!(path = %final_path.display(), "phase 1 already finalized");
            return Ok(final_path);
        }
        let (index, mut src) = match head(&self.pot)? {
            None => return Err(CeremonyError::NoPriorAccumulator(self.pot.path(0))),
            Some((0, _)) => return Err(CeremonyError::NoPriorAccumulator(self.pot.path(1))),
            Some(current) => current,
        };

        let beacon = &self.config.beacon;
        if beacon.apply_to_phase1 && head_is_beacon(&self.pot, index)? {
            info!(index, "phase 1 beacon already applied");
        } else if beacon.apply_to_phase1 {
            let dst = self.pot.path(index + 1);
            let started = Instant::now();
            stage("beacon", &src, &dst, |partial| {
                self.backend
                    .beacon(&src, partial, PHASE1_BEACON_NAME, &beacon.hash, beacon.iterations_exp)
            })?;
            record(&self.pot, index + 1, PHASE1_BEACON_NAME, ContributionKind::Beacon, &src, &dst, started)?;
            src = dst;
        }

        stage("prepare phase2", &src, &final_path, |partial| {
            self.backend.prepare_phase2(&src, partial)
        })?;
        info!(path = %final_path.display(), "phase 1 finalized");
        Ok(final_path)
    }

    /// Creates proving key 0000 for `depth` from the final accumulator.
    pub fn init_phase2(&self, depth: usize) -> Result<PathBuf, CeremonyError> {
        let chain = self.key_chain(depth)?;
        let ptau = self.phase1_final()?;
        let constraint_system = self.locator.locate(depth, ArtifactKind::ConstraintSystem)?;
        let genesis = chain.path(0);
        if genesis.is_file() {
            info!(depth, path = %genesis.display(), "phase 2 already initialized");
            return Ok(genesis);
        }
        if chain.is_final() {
            return Err(CeremonyError::Phase2Finalized(chain.final_path()));
        }
        stage("new proving key", &constraint_system, &genesis, |partial| {
            self.backend.new_proving_key(&constraint_system, &ptau, partial)
        })?;
        info!(depth, path = %genesis.display(), "phase 2 initialized");
        Ok(genesis)
    }

    pub fn contribute_phase2(&mut self, depth: usize, name: &str) -> Result<PathBuf, CeremonyError> {
        let chain = self.key_chain(depth)?;
        if chain.is_final() {
            return Err(CeremonyError::Phase2Finalized(chain.final_path()));
        }
        let (index, src) = head(&chain)?.ok_or_else(|| CeremonyError::NoPriorKey(chain.path(0)))?;
        let dst = chain.path(index + 1);
        let entropy = self.entropy.next_entropy();
        let started = Instant::now();
        stage("contribute key", &src, &dst, |partial| {
            self.backend.contribute_key(&src, partial, name, &entropy)
        })?;
        record(&chain, index + 1, name, ContributionKind::Local, &src, &dst, started)?;
        info!(depth, index = index + 1, path = %dst.display(), "phase 2 contribution accepted");
        Ok(dst)
    }

    pub fn export_key_for_contributor(&self, depth: usize, dir: &Path) -> Result<ChallengeHandoff, CeremonyError> {
        let chain = self.key_chain(depth)?;
        if chain.is_final() {
            return Err(CeremonyError::Phase2Finalized(chain.final_path()));
        }
        let (index, src) = head(&chain)?.ok_or_else(|| CeremonyError::NoPriorKey(chain.path(0)))?;
        export_head(&chain, index, &src, dir, Phase::Two { depth })
    }

    pub fn import_key_contribution(&mut self, depth: usize, path: &Path) -> Result<PathBuf, CeremonyError> {
        self.import_phase2(depth, path, &imported_name(path))
    }

    fn import_phase2(&self, depth: usize, path: &Path, name: &str) -> Result<PathBuf, CeremonyError> {
        let chain = self.key_chain(depth)?;
        if !path.is_file() {
            return Err(CeremonyError::NotFound(path.to_path_buf()));
        }
        if chain.is_final() {
            return Err(CeremonyError::Phase2Finalized(chain.final_path()));
        }
        let (index, prev) = head(&chain)?.ok_or_else(|| CeremonyError::NoPriorKey(chain.path(0)))?;
        let ptau = self.phase1_final()?;
        let constraint_system = self.locator.locate(depth, ArtifactKind::ConstraintSystem)?;
        let accepted = accept_import(&chain, index, &prev, path, name, |partial| {
            self.backend.verify_key(&constraint_system, &ptau, partial)
        })?;
        info!(depth, index = index + 1, path = %accepted.display(), "phase 2 contribution imported");
        Ok(accepted)
    }

    /// Applies the beacon to the depth's key, verifies the result and exports
    /// the verification key (plus the verifier source when configured).
    pub fn finalize_phase2(&self, depth: usize) -> Result<FinalizedCircuit, CeremonyError> {
        let chain = self.key_chain(depth)?;
        let ptau = self.phase1_final()?;
        let constraint_system = self.locator.locate(depth, ArtifactKind::ConstraintSystem)?;
        let proving_key = chain.final_path();
        let verification_key = self.locator.expected_path(depth, ArtifactKind::VerificationKey)?;
        let verifier_path = self.locator.expected_path(depth, ArtifactKind::VerifierExport)?;

        if proving_key.is_file() {
            let verifier_done = !self.config.export_verifier || verifier_path.is_file();
            if verification_key.is_file() && verifier_done {
                info!(depth, path = %proving_key.display(), "phase 2 already finalized");
                return Ok(FinalizedCircuit {
                    depth,
                    proving_key,
                    verification_key,
                    verifier: verifier_path.is_file().then_some(verifier_path),
                });
            }
            // An earlier run stopped before exporting. Check the key again.
            match self.backend.verify_key(&constraint_system, &ptau, &proving_key) {
                Ok(true) => {}
                Ok(false) => {
                    discard(&proving_key);
                    return Err(CeremonyError::VerificationFailed(proving_key));
                }
                Err(e) => return Err(CeremonyError::backend("verify key", &proving_key)(e)),
            }
        } else {
            let (index, src) = match head(&chain)? {
                None => return Err(CeremonyError::NoPriorKey(chain.path(0))),
                Some((0, _)) => return Err(CeremonyError::NoPriorKey(chain.path(1))),
                Some(current) => current,
            };
            let beacon = &self.config.beacon;
            let started = Instant::now();
            stage_checked(
                "beacon key",
                &src,
                &proving_key,
                |partial| {
                    self.backend
                        .beacon_key(&src, partial, PHASE2_BEACON_NAME, &beacon.hash, beacon.iterations_exp)
                },
                |partial| self.backend.verify_key(&constraint_system, &ptau, partial),
            )?;
            record(&chain, index + 1, PHASE2_BEACON_NAME, ContributionKind::Beacon, &src, &proving_key, started)?;
        }

        let vk = self
            .backend
            .export_verification_key(&proving_key)
            .map_err(CeremonyError::backend("export verification key", &proving_key))?;
        let vk_text = serde_json::to_string_pretty(&vk).map_err(|e| CeremonyError::io(&verification_key)(e.into()))?;
        write_atomic(&verification_key, &vk_text)?;

        let verifier = if self.config.export_verifier {
            let source = self
                .backend
                .export_verifier_source(&proving_key, self.config.verifier_template.as_deref())
                .map_err(CeremonyError::backend("export verifier", &proving_key))?;
            write_atomic(&verifier_path, &source)?;
            Some(verifier_path)
        } else {
            None
        };
        info!(depth, path = %proving_key.display(), "phase 2 finalized");
        Ok(FinalizedCircuit {
            depth,
            proving_key,
            verification_key,
            verifier,
        })
    }

    pub fn finalize_all_depths(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for depth in 1..=self.config.max_depth {
            let result = self.finalize_phase2(depth);
            if let Err(e) = &result {
                warn!(depth, error = %e, "finalization failed");
            }
            report.results.push((depth, result));
        }
        report
    }

    /// Initializes, contributes once to and finalizes one depth. A depth that
    /// is already final is only completed, never re-keyed.
    pub fn setup_circuit(&mut self, depth: usize, name: &str) -> Result<FinalizedCircuit, CeremonyError> {
        if self.phase2_state(depth)? != Phase2State::Final {
            self.init_phase2(depth)?;
            self.contribute_phase2(depth, name)?;
        }
        self.finalize_phase2(depth)
    }

    pub fn setup_all_circuits(&mut self, name: &str) -> BatchReport {
        let mut report = BatchReport::default();
        for depth in 1..=self.config.max_depth {
            let result = self.setup_circuit(depth, name);
            if let Err(e) = &result {
                warn!(depth, error = %e, "circuit setup failed");
            }
            report.results.push((depth, result));
        }
        report
    }

    /// Deletes every intermediate chain file whose final artifact exists.
    /// Refuses to run at all before the final accumulator exists.
    pub fn cleanup(&self) -> Result<CleanupReport, CeremonyError> {
        let ptau_final = self.phase1_final()?;
        let mut report = CleanupReport::default();

        let remove = |path: PathBuf, report: &mut CleanupReport| -> Result<(), CeremonyError> {
            fs::remove_file(&path).map_err(CeremonyError::io(&path))?;
            debug!(path = %path.display(), "removed intermediate");
            report.removed.push(path);
            Ok(())
        };

        for path in self.pot.intermediates().map_err(CeremonyError::io(self.pot.dir()))? {
            remove(path, &mut report)?;
        }
        report.retained.push(ptau_final);

        for depth in 1..=self.config.max_depth {
            let chain = self.key_chain(depth)?;
            let intermediates = chain.intermediates().map_err(CeremonyError::io(chain.dir()))?;
            if chain.is_final() {
                for path in intermediates {
                    remove(path, &mut report)?;
                }
                report.retained.push(chain.final_path());
            } else if !intermediates.is_empty() {
                report.skipped_depths.push(depth);
            }
        }
        info!(
            removed = report.removed.len(),
            skipped = ?report.skipped_depths,
            "cleanup finished"
        );
        Ok(report)
    }
}
