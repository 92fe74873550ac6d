use super::{BackendError, Groth16Proof, ProvingBackend};
use crate::merkle::CircuitInput;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use tracing::debug;

const EXPORT_WITH_TEMPLATE: &str = r#"
const snarkjs = require("snarkjs");
const fs = require("fs");
const [zkey, template, out] = process.argv.slice(-3);
snarkjs.zKey
    .exportSolidityVerifier(zkey, { groth16: fs.readFileSync(template, "utf8") })
    .then((code) => { fs.writeFileSync(out, code); process.exit(0); })
    .catch((err) => { console.error(err); process.exit(1); });
"#;

/// Drives the `snarkjs` command line tool. Scratch files for commands that
/// exchange JSON live in a per-call temporary directory.
#[derive(Clone, Debug)]
pub struct SnarkjsBackend {
    program: PathBuf,
    node: PathBuf,
}

impl Default for SnarkjsBackend {
    fn default() -> Self {
        Self {
            program: PathBuf::from("snarkjs"),
            node: PathBuf::from("node"),
        }
    }
}

impl SnarkjsBackend {
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    fn run<I, S>(&self, args: I) -> Result<Output, BackendError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let command = describe(&self.program, &args);
        debug!(%command, "running snarkjs");
        Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| BackendError::CommandFailed {
                command,
                stderr: e.to_string(),
            })
    }

    fn run_checked<I, S>(&self, args: I) -> Result<Output, BackendError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let output = self.run(&args)?;
        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                command: describe(&self.program, &args),
                stderr: failure_text(&output),
            });
        }
        Ok(output)
    }

    /// Verification commands exit non-zero on a bad artifact. Only a
    /// recognised rejection message maps to `Ok(false)`.
    fn run_verdict<I, S>(&self, args: I, rejection: &[&str]) -> Result<bool, BackendError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let output = self.run(&args)?;
        if output.status.success() {
            return Ok(true);
        }
        let text = failure_text(&output);
        if rejection.iter().any(|marker| text.contains(marker)) {
            return Ok(false);
        }
        Err(BackendError::CommandFailed {
            command: describe(&self.program, &args),
            stderr: text,
        })
    }
}

fn describe(program: &Path, args: &[OsString]) -> String {
    let mut parts = vec![program.to_string_lossy().into_owned()];
    parts.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    format!("{}\n{}", stderr.trim(), stdout.trim())
}

fn scratch_dir() -> Result<TempDir, BackendError> {
    TempDir::new().map_err(BackendError::io(Path::new("<tempdir>")))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), BackendError> {
    let text = serde_json::to_string(value).map_err(BackendError::json(path))?;
    fs::write(path, text).map_err(BackendError::io(path))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, BackendError> {
    let text = fs::read_to_string(path).map_err(BackendError::io(path))?;
    serde_json::from_str(&text).map_err(BackendError::json(path))
}

const VERIFY_REJECTIONS: &[&str] = &["INVALID", "Invalid", "invalid", "not match"];

impl ProvingBackend for SnarkjsBackend {
    fn new_accumulator(&self, curve: &str, power: u32, path: &Path) -> Result<(), BackendError> {
        let power = power.to_string();
        self.run_checked([
            OsStr::new("powersoftau"),
            OsStr::new("new"),
            OsStr::new(curve),
            OsStr::new(&power),
            path.as_os_str(),
        ])?;
        Ok(())
    }

    fn contribute(&self, src: &Path, dst: &Path, name: &str, entropy: &str) -> Result<(), BackendError> {
        self.run_checked([
            OsString::from("powersoftau"),
            OsString::from("contribute"),
            src.into(),
            dst.into(),
            format!("--name={}", name).into(),
            format!("-e={}", entropy).into(),
        ])?;
        Ok(())
    }

    fn beacon(
        &self,
        src: &Path,
        dst: &Path,
        name: &str,
        beacon_hash: &str,
        iterations_exp: u32,
    ) -> Result<(), BackendError> {
        self.run_checked([
            OsString::from("powersoftau"),
            OsString::from("beacon"),
            src.into(),
            dst.into(),
            beacon_hash.into(),
            iterations_exp.to_string().into(),
            format!("--name={}", name).into(),
        ])?;
        Ok(())
    }

    fn prepare_phase2(&self, src: &Path, dst: &Path) -> Result<(), BackendError> {
        self.run_checked([
            OsStr::new("powersoftau"),
            OsStr::new("prepare"),
            OsStr::new("phase2"),
            src.as_os_str(),
            dst.as_os_str(),
        ])?;
        Ok(())
    }

    fn verify(&self, path: &Path) -> Result<bool, BackendError> {
        self.run_verdict(
            [OsStr::new("powersoftau"), OsStr::new("verify"), path.as_os_str()],
            VERIFY_REJECTIONS,
        )
    }

    fn new_proving_key(
        &self,
        constraint_system: &Path,
        accumulator: &Path,
        key: &Path,
    ) -> Result<(), BackendError> {
        self.run_checked([
            OsStr::new("groth16"),
            OsStr::new("setup"),
            constraint_system.as_os_str(),
            accumulator.as_os_str(),
            key.as_os_str(),
        ])?;
        Ok(())
    }

    fn contribute_key(&self, src: &Path, dst: &Path, name: &str, entropy: &str) -> Result<(), BackendError> {
        self.run_checked([
            OsString::from("zkey"),
            OsString::from("contribute"),
            src.into(),
            dst.into(),
            format!("--name={}", name).into(),
            format!("-e={}", entropy).into(),
        ])?;
        Ok(())
    }

    fn beacon_key(
        &self,
        src: &Path,
        dst: &Path,
        name: &str,
        beacon_hash: &str,
        iterations_exp: u32,
    ) -> Result<(), BackendError> {
        self.run_checked([
            OsString::from("zkey"),
            OsString::from("beacon"),
            src.into(),
            dst.into(),
            beacon_hash.into(),
            iterations_exp.to_string().into(),
            format!("--name={}", name).into(),
        ])?;
        Ok(())
    }

    fn verify_key(
        &self,
        constraint_system: &Path,
        accumulator: &Path,
        key: &Path,
    ) -> Result<bool, BackendError> {
        self.run_verdict(
            [
                OsStr::new("zkey"),
                OsStr::new("verify"),
                constraint_system.as_os_str(),
                accumulator.as_os_str(),
                key.as_os_str(),
            ],
            VERIFY_REJECTIONS,
        )
    }

    fn export_verification_key(&self, key: &Path) -> Result<serde_json::Value, BackendError> {
        let scratch = scratch_dir()?;
        let out = scratch.path().join("verification_key.json");
        self.run_checked([
            OsStr::new("zkey"),
            OsStr::new("export"),
            OsStr::new("verificationkey"),
            key.as_os_str(),
            out.as_os_str(),
        ])?;
        read_json(&out)
    }

    fn export_verifier_source(&self, key: &Path, template: Option<&Path>) -> Result<String, BackendError> {
        let scratch = scratch_dir()?;
        let out = scratch.path().join("verifier.sol");
        match template {
            None => {
                self.run_checked([
                    OsStr::new("zkey"),
                    OsStr::new("export"),
                    OsStr::new("solidityverifier"),
                    key.as_os_str(),
                    out.as_os_str(),
                ])?;
            }
            Some(template) => {
                let args = [
                    OsStr::new("-e"),
                    OsStr::new(EXPORT_WITH_TEMPLATE),
                    key.as_os_str(),
                    template.as_os_str(),
                    out.as_os_str(),
                ];
                let output = Command::new(&self.node).args(args).output().map_err(|e| {
                    BackendError::CommandFailed {
                        command: format!("{} -e <export verifier>", self.node.display()),
                        stderr: e.to_string(),
                    }
                })?;
                if !output.status.success() {
                    return Err(BackendError::CommandFailed {
                        command: format!("{} -e <export verifier>", self.node.display()),
                        stderr: failure_text(&output),
                    });
                }
            }
        }
        fs::read_to_string(&out).map_err(BackendError::io(&out))
    }

    fn prove(
        &self,
        input: &CircuitInput,
        witness_program: &Path,
        key: &Path,
    ) -> Result<(Groth16Proof, Vec<String>), BackendError> {
        let scratch = scratch_dir()?;
        let input_path = scratch.path().join("input.json");
        let proof_path = scratch.path().join("proof.json");
        let public_path = scratch.path().join("public.json");
        write_json(&input_path, input)?;
        self.run_checked([
            OsStr::new("groth16"),
            OsStr::new("fullprove"),
            input_path.as_os_str(),
            witness_program.as_os_str(),
            key.as_os_str(),
            proof_path.as_os_str(),
            public_path.as_os_str(),
        ])?;
        Ok((read_json(&proof_path)?, read_json(&public_path)?))
    }

    fn verify_proof(
        &self,
        verification_key: &serde_json::Value,
        public_signals: &[String],
        proof: &Groth16Proof,
    ) -> Result<bool, BackendError> {
        let scratch = scratch_dir()?;
        let vk_path = scratch.path().join("verification_key.json");
        let public_path = scratch.path().join("public.json");
        let proof_path = scratch.path().join("proof.json");
        write_json(&vk_path, verification_key)?;
        write_json(&public_path, &public_signals)?;
        write_json(&proof_path, proof)?;
        self.run_verdict(
            [
                OsStr::new("groth16"),
                OsStr::new("verify"),
                vk_path.as_os_str(),
                public_path.as_os_str(),
                proof_path.as_os_str(),
            ],
            &["Invalid proof"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_surfaces_the_command() {
        let backend = SnarkjsBackend::new("/nonexistent/snarkjs-binary");
        let err = backend.verify(Path::new("pot12_0000.ptau")).unwrap_err();
        match err {
            BackendError::CommandFailed { command, .. } => {
                assert!(command.contains("powersoftau verify pot12_0000.ptau"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
