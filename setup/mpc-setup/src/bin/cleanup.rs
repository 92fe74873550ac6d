use clap::Parser;
use libs::utils::init_tracing;
use mpc_setup::cli::{exit_code, with_coordinator, CeremonyArgs};
use mpc_setup::utils::{prompt_user_input, EntropySource};
use mpc_setup::CeremonyError;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Delete intermediate accumulators and keys, keeping final artifacts", long_about = None)]
struct Config {
    #[command(flatten)]
    ceremony: CeremonyArgs,

    /// Skip the confirmation prompt
    #[arg(long)]
    yes: bool,
}

// cargo run --release --bin cleanup -- --base-dir ./setup/mpc-setup/output --yes

fn run(config: &Config) -> Result<ExitCode, CeremonyError> {
    let args = &config.ceremony;
    let settings = args.load()?;
    if !config.yes {
        let answer = prompt_user_input("This permanently deletes every intermediate file. Type 'yes' to continue: ");
        if answer != "yes" {
            println!("aborted");
            return Ok(ExitCode::SUCCESS);
        }
    }
    let report = with_coordinator(settings, args.backend(), EntropySource::System, |c| c.cleanup())?;
    for path in &report.removed {
        println!("removed  {}", path.display());
    }
    for path in &report.retained {
        println!("retained {}", path.display());
    }
    if !report.skipped_depths.is_empty() {
        println!("depths without a final key were left untouched: {:?}", report.skipped_depths);
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();
    let config = Config::parse();
    exit_code(run(&config))
}
