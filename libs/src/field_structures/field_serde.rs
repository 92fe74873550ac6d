use super::{EncodingError, ScalarField};
use ark_ff::PrimeField;
use num_bigint::BigUint;
use serde::de::{Deserializer, Error, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar field element that travels as a decimal string, the way the
/// circuit tooling writes witness inputs and public signals.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldSerde(pub ScalarField);

impl FieldSerde {
    pub fn to_decimal(&self) -> String {
        BigUint::from(self.0.into_bigint()).to_string()
    }

    /// Parses a canonical decimal residue. Values at or above the modulus are
    /// rejected instead of being silently reduced.
    pub fn from_decimal(s: &str) -> Result<Self, EncodingError> {
        let trimmed = s.trim();
        let value = BigUint::from_str(trimmed)
            .map_err(|_| EncodingError::NotDecimal(trimmed.to_string()))?;
        if value >= BigUint::from(ScalarField::MODULUS) {
            return Err(EncodingError::NotCanonical(trimmed.to_string()));
        }
        Ok(FieldSerde(ScalarField::from(value)))
    }
}

impl From<ScalarField> for FieldSerde {
    fn from(value: ScalarField) -> Self {
        FieldSerde(value)
    }
}

impl fmt::Display for FieldSerde {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

impl Serialize for FieldSerde {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for FieldSerde {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldVisitor;

        impl<'de> Visitor<'de> for FieldVisitor {
            type Value = FieldSerde;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a decimal string representing a canonical ScalarField residue")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                FieldSerde::from_decimal(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(FieldVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_round_trip_through_json() {
        let x = FieldSerde(ScalarField::from(1234567890u64));
        let json = serde_json::to_string(&x).unwrap();
        assert_eq!(json, "\"1234567890\"");
        let back: FieldSerde = serde_json::from_str(&json).unwrap();
        assert_eq!(back, x);
    }

    #[test]
    fn zero_renders_as_single_digit() {
        assert_eq!(FieldSerde::default().to_decimal(), "0");
    }

    #[test]
    fn modulus_is_not_canonical() {
        let modulus = BigUint::from(ScalarField::MODULUS).to_string();
        assert!(matches!(
            FieldSerde::from_decimal(&modulus),
            Err(EncodingError::NotCanonical(_))
        ));
        assert!(matches!(
            FieldSerde::from_decimal("0x12"),
            Err(EncodingError::NotDecimal(_))
        ));
    }
}
