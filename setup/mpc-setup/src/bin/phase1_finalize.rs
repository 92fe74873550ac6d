use clap::Parser;
use libs::utils::init_tracing;
use mpc_setup::cli::{exit_code, with_coordinator, CeremonyArgs};
use mpc_setup::utils::EntropySource;
use mpc_setup::CeremonyError;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Seal phase 1 and prepare the accumulator for phase 2", long_about = None)]
struct Config {
    #[command(flatten)]
    ceremony: CeremonyArgs,

    /// Apply the configured public beacon before preparing phase 2
    #[arg(long)]
    beacon: bool,
}

// cargo run --release --bin phase1_finalize -- --base-dir ./setup/mpc-setup/output

fn run(config: &Config) -> Result<ExitCode, CeremonyError> {
    let args = &config.ceremony;
    let mut settings = args.load()?;
    settings.beacon.apply_to_phase1 |= config.beacon;
    let path = with_coordinator(settings, args.backend(), EntropySource::System, |c| c.finalize_phase1())?;
    println!("final accumulator: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();
    let config = Config::parse();
    exit_code(run(&config))
}
