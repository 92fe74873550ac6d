pub mod chain;
pub mod cli;
pub mod contributor;
pub mod coordinator;
pub mod error;
pub mod lock;
pub mod utils;

pub use contributor::{ChallengeHandoff, ContributionResponse, Contributor, Phase};
pub use coordinator::{BatchReport, CeremonyState, CleanupReport, Coordinator, FinalizedCircuit, Phase2State};
pub use error::CeremonyError;
