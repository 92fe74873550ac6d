use clap::Parser;
use libs::utils::init_tracing;
use mpc_setup::cli::{exit_code, with_coordinator, CeremonyArgs};
use mpc_setup::utils::EntropySource;
use mpc_setup::CeremonyError;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Create the initial phase 1 accumulator", long_about = None)]
struct Config {
    #[command(flatten)]
    ceremony: CeremonyArgs,
}

// cargo run --release --bin phase1_initialize -- --base-dir ./setup/mpc-setup/output --power 15

fn run(config: &Config) -> Result<ExitCode, CeremonyError> {
    let args = &config.ceremony;
    let path = with_coordinator(args.load()?, args.backend(), EntropySource::System, |c| c.init_phase1())?;
    println!("current accumulator: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();
    let config = Config::parse();
    exit_code(run(&config))
}
