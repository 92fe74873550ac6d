use clap::Parser;
use libs::utils::init_tracing;
use mpc_setup::cli::{contributor_name, exit_code, respond, CeremonyArgs, ContributionAction};
use mpc_setup::utils::{initialize_entropy, EntropySource};
use mpc_setup::{CeremonyError, ContributionResponse, Coordinator};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Add a phase 1 contribution", long_about = None)]
struct Config {
    #[command(flatten)]
    ceremony: CeremonyArgs,

    #[command(subcommand)]
    action: ContributionAction,
}

// cargo run --release --bin phase1_next_contributor -- --base-dir ./setup/mpc-setup/output local --mode testing --name alice
// cargo run --release --bin phase1_next_contributor -- --base-dir ./setup/mpc-setup/output export --outfolder ./handoff
// cargo run --release --bin phase1_next_contributor -- respond --challenge ./handoff/challenge.json --workdir ./mine --mode random
// cargo run --release --bin phase1_next_contributor -- --base-dir ./setup/mpc-setup/output import --response ./mine/response.json

fn run(config: &Config) -> Result<ExitCode, CeremonyError> {
    let args = &config.ceremony;
    match &config.action {
        ContributionAction::Local { name, mode } => {
            let name = contributor_name(name.as_deref());
            let mut coordinator = Coordinator::open(args.load()?, args.backend(), initialize_entropy(mode))?;
            let path = coordinator.contribute_phase1(&name)?;
            println!("new accumulator: {}", path.display());
        }
        ContributionAction::Export { outfolder } => {
            let coordinator = Coordinator::open(args.load()?, args.backend(), EntropySource::System)?;
            let handoff = coordinator.export_for_contributor(outfolder)?;
            let path = outfolder.join("challenge.json");
            handoff.write_into_json(&path).map_err(CeremonyError::io(&path))?;
            println!("challenge {:04} written to {}", handoff.index, path.display());
        }
        ContributionAction::Respond {
            challenge,
            workdir,
            name,
            mode,
        } => {
            let path = respond(args, challenge, workdir, name.as_deref(), mode)?;
            println!("response written to {}", path.display());
        }
        ContributionAction::Import { response, file } => {
            let mut coordinator = Coordinator::open(args.load()?, args.backend(), EntropySource::System)?;
            let path = match (response, file) {
                (Some(response), _) => {
                    let response = ContributionResponse::read_from_json(response).map_err(CeremonyError::io(response))?;
                    coordinator.import_response(&response)?
                }
                (None, Some(file)) => coordinator.import_contribution(file)?,
                (None, None) => return Err(CeremonyError::NotFound(PathBuf::from("response.json"))),
            };
            println!("accepted {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();
    let config = Config::parse();
    exit_code(run(&config))
}
