use clap::Parser;
use libs::utils::init_tracing;
use mpc_setup::cli::{batch_exit_code, exit_code, print_batch, with_coordinator, CeremonyArgs, DepthSelection};
use mpc_setup::utils::EntropySource;
use mpc_setup::CeremonyError;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Apply the beacon and export keys for circuit depths", long_about = None)]
struct Config {
    #[command(flatten)]
    ceremony: CeremonyArgs,

    #[command(flatten)]
    selection: DepthSelection,
}

// cargo run --release --bin phase2_finalize -- --base-dir ./setup/mpc-setup/output --depth 5
// cargo run --release --bin phase2_finalize -- --base-dir ./setup/mpc-setup/output --all

fn run(config: &Config) -> Result<ExitCode, CeremonyError> {
    let args = &config.ceremony;
    with_coordinator(args.load()?, args.backend(), EntropySource::System, |c| {
        match config.selection.depth {
            Some(depth) => {
                let circuit = c.finalize_phase2(depth)?;
                println!("proving key: {}", circuit.proving_key.display());
                println!("verification key: {}", circuit.verification_key.display());
                if let Some(verifier) = circuit.verifier {
                    println!("verifier: {}", verifier.display());
                }
                Ok(ExitCode::SUCCESS)
            }
            None => {
                let report = c.finalize_all_depths();
                print_batch(&report);
                Ok(batch_exit_code(&report))
            }
        }
    })
}

fn main() -> ExitCode {
    init_tracing();
    let config = Config::parse();
    exit_code(run(&config))
}
