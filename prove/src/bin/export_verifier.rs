use clap::Parser;
use libs::utils::init_tracing;
use prove::cli::{exit_on_error, CliError, ServiceArgs};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print or save the verifier contract for a circuit depth", long_about = None)]
struct Config {
    #[command(flatten)]
    service: ServiceArgs,

    #[arg(long)]
    depth: usize,

    /// Write the contract here instead of stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

// cargo run --release --bin export_verifier -- --base-dir ./setup/mpc-setup/output --depth 4 --out ./Verifier.sol

fn main() {
    init_tracing();
    let config = Config::parse();
    let service = exit_on_error(config.service.service());
    let source = exit_on_error(service.export_verifier_contract(config.depth).map_err(CliError::from));
    match &config.out {
        Some(out) => exit_on_error(fs::write(out, source).map_err(CliError::io(out))),
        None => print!("{}", source),
    }
}
