use clap::Parser;
use libs::utils::init_tracing;
use prove::cli::{exit_on_error, CliError, ServiceArgs};
use prove::ProofResult;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(author, version, about = "Check a membership proof against its depth's verification key", long_about = None)]
struct Config {
    #[command(flatten)]
    service: ServiceArgs,

    /// Output of the prove binary
    #[arg(long, value_name = "FILE", default_value = "proof.json")]
    proof: PathBuf,
}

// cargo run --release --bin verify -- --base-dir ./setup/mpc-setup/output --proof ./proof.json

fn main() {
    init_tracing();
    let config = Config::parse();
    let service = exit_on_error(config.service.service());
    let result = exit_on_error(ProofResult::read_from_json(&config.proof).map_err(CliError::io(&config.proof)));
    if exit_on_error(service.verify_result(&result).map_err(CliError::from)) {
        println!("valid proof for root {} at depth {}", result.root, result.depth);
    } else {
        println!("INVALID proof");
        process::exit(1);
    }
}
