use clap::Parser;
use libs::utils::init_tracing;
use prove::cli::{exit_on_error, read_leaves, target, CliError, ServiceArgs};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Prove that a value belongs to a leaf set", long_about = None)]
struct Config {
    #[command(flatten)]
    service: ServiceArgs,

    /// JSON array with the full leaf set
    #[arg(long, value_name = "FILE")]
    leaves: PathBuf,

    /// Leaf value to prove (the leftmost match is used)
    #[arg(long, conflicts_with = "index")]
    value: Option<String>,

    /// Leaf position to prove
    #[arg(long)]
    index: Option<usize>,

    /// Where to write proof, public signals and Merkle path
    #[arg(long, value_name = "FILE", default_value = "proof.json")]
    out: PathBuf,
}

// cargo run --release --bin prove -- --base-dir ./setup/mpc-setup/output --leaves ./leaves.json --value alice
// cargo run --release --bin prove -- --base-dir ./setup/mpc-setup/output --leaves ./leaves.json --index 3 --out ./proof.json

fn main() {
    init_tracing();
    let config = Config::parse();
    let service = exit_on_error(config.service.service());
    let leaves = exit_on_error(read_leaves(&config.leaves));
    let target = target(config.value.as_deref(), config.index);
    let result = exit_on_error(service.generate_proof(&leaves, &target).map_err(CliError::from));
    exit_on_error(result.write_into_json(&config.out).map_err(CliError::io(&config.out)));
    println!("depth {} root {}", result.depth, result.root);
    println!("proof written to {}", config.out.display());
}
