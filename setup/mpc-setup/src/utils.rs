use blake2::{Blake2b, Digest};
use clap::ValueEnum;
use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::io::{self, Write};
use tracing::info;

const ENTROPY_BYTES: usize = 32;

#[derive(Debug, Clone, ValueEnum)]
pub enum Mode {
    Testing,
    Random,
    Beacon, //deterministic from a given seed
}

/// Where contribution entropy comes from.
///
/// Every contribution must use fresh entropy. Feeding the same bytes to two
/// contributions is not detected, and leaves the ceremony only as strong as
/// the remaining honest contributions.
pub enum EntropySource {
    /// Operating system randomness only.
    System,
    /// Reproducible stream, for tests and public beacons.
    Seeded(Box<ChaCha20Rng>),
    /// Operating system randomness mixed with a stream seeded from user input.
    Hybrid(Box<ChaCha20Rng>),
}

impl EntropySource {
    pub fn seeded(seed: [u8; 32]) -> Self {
        EntropySource::Seeded(Box::new(ChaCha20Rng::from_seed(seed)))
    }

    pub fn hybrid(seed: [u8; 32]) -> Self {
        EntropySource::Hybrid(Box::new(ChaCha20Rng::from_seed(seed)))
    }

    /// 32 fresh bytes, hex encoded, as handed to the proving system.
    pub fn next_entropy(&mut self) -> String {
        let mut bytes = [0u8; ENTROPY_BYTES];
        match self {
            EntropySource::System => OsRng.fill_bytes(&mut bytes),
            EntropySource::Seeded(rng) => rng.fill_bytes(&mut bytes),
            EntropySource::Hybrid(rng) => {
                let mut user = [0u8; ENTROPY_BYTES];
                rng.fill_bytes(&mut user);
                OsRng.fill_bytes(&mut bytes);
                for (b, u) in bytes.iter_mut().zip(user.iter()) {
                    *b ^= u;
                }
            }
        }
        hex::encode(bytes)
    }
}

impl Default for EntropySource {
    fn default() -> Self {
        EntropySource::System
    }
}

/// Prompts user for a line of input
pub fn prompt_user_input(title: &str) -> String {
    print!("{}", title);
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return String::new();
    }
    input.trim().to_string()
}

pub fn seed_from_text(text: &str) -> [u8; 32] {
    let hash = Blake2b::digest(text.trim().as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&hash[..32]);
    seed
}

/// Builds the entropy source for a mode, prompting for a seed where needed.
pub fn initialize_entropy(mode: &Mode) -> EntropySource {
    let (source, message) = match mode {
        Mode::Testing => (
            EntropySource::seeded([0u8; 32]),
            "Initializing entropy in testing mode",
        ),
        Mode::Beacon => (
            EntropySource::seeded(seed_from_text(&prompt_user_input(
                "Enter seed input for randomization: ",
            ))),
            "Initializing entropy in deterministic mode",
        ),
        Mode::Random => (
            EntropySource::hybrid(seed_from_text(&prompt_user_input(
                "Enter seed input for randomization: ",
            ))),
            "Initializing entropy in hybrid random mode",
        ),
    };
    info!("{}", message);
    source
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_entropy_is_reproducible_and_fresh() {
        let mut a = EntropySource::seeded([7u8; 32]);
        let mut b = EntropySource::seeded([7u8; 32]);
        let first = a.next_entropy();
        assert_eq!(first, b.next_entropy());
        assert_eq!(first.len(), 64);
        assert_ne!(first, a.next_entropy());
    }

    #[test]
    fn system_entropy_does_not_repeat() {
        let mut source = EntropySource::System;
        assert_ne!(source.next_entropy(), source.next_entropy());
    }

    #[test]
    fn seeds_ignore_surrounding_whitespace() {
        assert_eq!(seed_from_text("  beacon\n"), seed_from_text("beacon"));
        assert_ne!(seed_from_text("beacon"), seed_from_text("other"));
    }
}
