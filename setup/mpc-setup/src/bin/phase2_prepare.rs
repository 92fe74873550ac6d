use clap::Parser;
use libs::utils::init_tracing;
use mpc_setup::cli::{exit_code, with_coordinator, CeremonyArgs, DepthSelection};
use mpc_setup::utils::EntropySource;
use mpc_setup::CeremonyError;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Create the initial proving key of circuit depths", long_about = None)]
struct Config {
    #[command(flatten)]
    ceremony: CeremonyArgs,

    #[command(flatten)]
    selection: DepthSelection,
}

// cargo run --release --bin phase2_prepare -- --base-dir ./setup/mpc-setup/output --depth 5
// cargo run --release --bin phase2_prepare -- --base-dir ./setup/mpc-setup/output --all

fn run(config: &Config) -> Result<ExitCode, CeremonyError> {
    let args = &config.ceremony;
    let settings = args.load()?;
    let depths = config.selection.depths(settings.max_depth);
    let failures = with_coordinator(settings, args.backend(), EntropySource::System, |c| {
        let mut failures = 0;
        for depth in depths {
            match c.init_phase2(depth) {
                Ok(path) => println!("depth {:>2}: {}", depth, path.display()),
                Err(e) => {
                    failures += 1;
                    println!("depth {:>2}: FAIL {}", depth, e);
                }
            }
        }
        Ok(failures)
    })?;
    Ok(if failures > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn main() -> ExitCode {
    init_tracing();
    let config = Config::parse();
    exit_code(run(&config))
}
