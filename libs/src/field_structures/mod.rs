pub mod field_serde;

pub use field_serde::FieldSerde;

use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge};
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::{PrimeField, Zero};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Scalar field of BN254 (`bn128` in snarkjs naming), the field the Merkle
/// circuit is defined over.
pub type ScalarField = ark_bn254::Fr;

const POSEIDON_RATE: usize = 2;
const POSEIDON_CAPACITY: usize = 1;
const POSEIDON_FULL_ROUNDS: u64 = 8;
const POSEIDON_PARTIAL_ROUNDS: u64 = 57;
const POSEIDON_ALPHA: u64 = 5;

const DOMAIN_LEAF: u64 = 1;
const DOMAIN_NODE: u64 = 2;

lazy_static! {
    static ref POSEIDON_CONFIG: PoseidonConfig<ScalarField> = {
        let (ark, mds) = find_poseidon_ark_and_mds::<ScalarField>(
            ScalarField::MODULUS_BIT_SIZE as u64,
            POSEIDON_RATE,
            POSEIDON_FULL_ROUNDS,
            POSEIDON_PARTIAL_ROUNDS,
            0,
        );
        PoseidonConfig::new(
            POSEIDON_FULL_ROUNDS as usize,
            POSEIDON_PARTIAL_ROUNDS as usize,
            POSEIDON_ALPHA,
            mds,
            ark,
            POSEIDON_RATE,
            POSEIDON_CAPACITY,
        )
    };
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("negative value {0} has no canonical field encoding")]
    NegativeNumber(i64),
    #[error("not a decimal field element: {0:?}")]
    NotDecimal(String),
    #[error("decimal {0} is not reduced modulo the field prime")]
    NotCanonical(String),
}

/// An application value stored in a Merkle leaf.
///
/// Numbers are encoded through their decimal rendering, so `Number(7)` and
/// `Text("7")` are the same leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeafValue {
    Number(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl LeafValue {
    fn canonical_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        match self {
            LeafValue::Number(n) if *n < 0 => Err(EncodingError::NegativeNumber(*n)),
            LeafValue::Number(n) => Ok(n.to_string().into_bytes()),
            LeafValue::Text(s) => Ok(s.as_bytes().to_vec()),
            LeafValue::Bytes(b) => Ok(b.clone()),
        }
    }
}

impl From<&str> for LeafValue {
    fn from(value: &str) -> Self {
        LeafValue::Text(value.to_string())
    }
}

impl From<String> for LeafValue {
    fn from(value: String) -> Self {
        LeafValue::Text(value)
    }
}

impl From<i64> for LeafValue {
    fn from(value: i64) -> Self {
        LeafValue::Number(value)
    }
}

impl fmt::Display for LeafValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafValue::Number(n) => write!(f, "{}", n),
            LeafValue::Text(s) => write!(f, "{:?}", s),
            LeafValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

/// Field-friendly hashing used by the Merkle circuit.
///
/// Poseidon with the arkworks Grain-LFSR round constants, prefixed by a
/// domain tag (1 for leaves, 2 for inner nodes). This is not circomlib's
/// Poseidon: a `MerkleTreeProof_{depth}` circuit must implement exactly this
/// permutation and these tags or it will reject the roots computed here.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldHasher;

impl FieldHasher {
    pub fn new() -> Self {
        FieldHasher
    }

    /// SHA-256 of the canonical bytes, reduced modulo the field prime.
    pub fn encode(&self, value: &LeafValue) -> Result<ScalarField, EncodingError> {
        let bytes = value.canonical_bytes()?;
        let digest = Sha256::digest(&bytes);
        Ok(ScalarField::from_be_bytes_mod_order(&digest))
    }

    pub fn hash_leaf(&self, x: ScalarField) -> ScalarField {
        poseidon(&[ScalarField::from(DOMAIN_LEAF), x])
    }

    /// Order matters: `left` and `right` must follow the circuit wiring.
    pub fn hash_pair(&self, left: ScalarField, right: ScalarField) -> ScalarField {
        poseidon(&[ScalarField::from(DOMAIN_NODE), left, right])
    }

    pub fn hash_leaf_value(&self, value: &LeafValue) -> Result<ScalarField, EncodingError> {
        Ok(self.hash_leaf(self.encode(value)?))
    }

    /// Hash of the padding leaf appended to short leaf sets.
    pub fn zero_leaf(&self) -> ScalarField {
        self.hash_leaf(ScalarField::zero())
    }
}

fn poseidon(inputs: &[ScalarField]) -> ScalarField {
    let mut sponge = PoseidonSponge::<ScalarField>::new(&POSEIDON_CONFIG);
    sponge.absorb(&inputs.to_vec());
    sponge.squeeze_field_elements::<ScalarField>(1)[0]
}
