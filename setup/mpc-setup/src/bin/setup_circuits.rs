use clap::Parser;
use libs::utils::init_tracing;
use mpc_setup::cli::{batch_exit_code, exit_code, print_batch, with_coordinator, CeremonyArgs, DepthSelection};
use mpc_setup::utils::{initialize_entropy, Mode};
use mpc_setup::CeremonyError;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run prepare, one contribution and finalize for circuit depths", long_about = None)]
struct Config {
    #[command(flatten)]
    ceremony: CeremonyArgs,

    #[command(flatten)]
    selection: DepthSelection,

    /// Name recorded for the contribution
    #[arg(long, default_value = "coordinator")]
    name: String,

    #[arg(long, value_enum, default_value = "random")]
    mode: Mode,
}

// cargo run --release --bin setup_circuits -- --base-dir ./setup/mpc-setup/output --all --mode testing

fn run(config: &Config) -> Result<ExitCode, CeremonyError> {
    let args = &config.ceremony;
    with_coordinator(args.load()?, args.backend(), initialize_entropy(&config.mode), |c| {
        match config.selection.depth {
            Some(depth) => {
                let circuit = c.setup_circuit(depth, &config.name)?;
                println!("proving key: {}", circuit.proving_key.display());
                Ok(ExitCode::SUCCESS)
            }
            None => {
                let report = c.setup_all_circuits(&config.name);
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
