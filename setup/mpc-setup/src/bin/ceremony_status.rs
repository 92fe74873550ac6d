use clap::Parser;
use libs::utils::init_tracing;
use mpc_setup::cli::{exit_code, with_coordinator, CeremonyArgs};
use mpc_setup::contributor::Transcript;
use mpc_setup::utils::EntropySource;
use mpc_setup::{CeremonyError, Phase2State};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Show where the ceremony stands", long_about = None)]
struct Config {
    #[command(flatten)]
    ceremony: CeremonyArgs,

    /// Print the phase 1 transcript as markdown
    #[arg(long)]
    transcript: bool,
}

// cargo run --release --bin ceremony_status -- --base-dir ./setup/mpc-setup/output --transcript

fn run(config: &Config) -> Result<ExitCode, CeremonyError> {
    let args = &config.ceremony;
    let settings = args.load()?;
    let max_depth = settings.max_depth;
    with_coordinator(settings, args.backend(), EntropySource::System, |c| {
        println!("phase 1: {:?}", c.state()?);
        for depth in 1..=max_depth {
            let state = c.phase2_state(depth)?;
            if state != Phase2State::NotStarted {
                println!("depth {:>2}: {:?}", depth, state);
            }
        }
        if config.transcript {
            let transcript = Transcript::load_or_default(&c.pot_chain().transcript_path())?;
            println!("\n{}", transcript);
        }
        Ok(ExitCode::SUCCESS)
    })
}

fn main() -> ExitCode {
    init_tracing();
    let config = Config::parse();
    exit_code(run(&config))
}
