//! Binary Merkle tree over field elements.
//!
//! The leaf sequence is right-padded with the canonical zero leaf up to the
//! next power of two, so every level above the leaves has an even number of
//! nodes. Paths are recorded bottom-up: `path_elements[i]` is the sibling at
//! level `i` and `path_indices[i]` is 0 when the running node is the left
//! child, 1 when it is the right child.

use crate::field_structures::{EncodingError, FieldHasher, FieldSerde, LeafValue, ScalarField};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree from an empty leaf set")]
    EmptyLeafSet,
    #[error("leaf {0} is not part of the tree")]
    LeafNotFound(String),
    #[error("leaf encoding failed: {0}")]
    Encoding(#[from] EncodingError),
}

/// What to prove membership of: a raw value or a position in the leaf list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeafTarget {
    Value(LeafValue),
    Index(usize),
}

impl From<LeafValue> for LeafTarget {
    fn from(value: LeafValue) -> Self {
        LeafTarget::Value(value)
    }
}

impl From<&str> for LeafTarget {
    fn from(value: &str) -> Self {
        LeafTarget::Value(value.into())
    }
}

impl From<usize> for LeafTarget {
    fn from(index: usize) -> Self {
        LeafTarget::Index(index)
    }
}

/// `ceil(log2(n))`, with a single leaf giving depth 0.
pub fn depth_for(leaf_count: usize) -> usize {
    leaf_count.max(1).next_power_of_two().trailing_zeros() as usize
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    depth: usize,
    leaf_count: usize,
    // levels[0] holds the hashed, padded leaves; the last level holds the root.
    levels: Vec<Vec<ScalarField>>,
}

impl MerkleTree {
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaves supplied by the caller, before padding.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn padded_leaves(&self) -> &[ScalarField] {
        &self.levels[0]
    }

    pub fn root(&self) -> ScalarField {
        self.levels[self.depth][0]
    }

    pub fn proof(&self, leaf_index: usize) -> Result<MerkleProof, MerkleError> {
        if leaf_index >= self.leaf_count {
            return Err(MerkleError::LeafNotFound(format!("at index {}", leaf_index)));
        }

        let mut path_elements = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut index = leaf_index;

        for level in &self.levels[..self.depth] {
            let is_left = index % 2 == 0;
            let sibling_index = if is_left { index + 1 } else { index - 1 };
            let sibling = level.get(sibling_index).copied().unwrap_or(level[index]);
            path_elements.push(FieldSerde(sibling));
            path_indices.push(if is_left { 0 } else { 1 });
            index /= 2;
        }

        Ok(MerkleProof {
            leaf: FieldSerde(self.levels[0][leaf_index]),
            path_elements,
            path_indices,
            root: FieldSerde(self.root()),
            leaf_index,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    pub leaf: FieldSerde,
    pub path_elements: Vec<FieldSerde>,
    pub path_indices: Vec<u8>,
    pub root: FieldSerde,
    pub leaf_index: usize,
}

/// Witness input handed to the circuit's witness program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitInput {
    pub leaf: FieldSerde,
    pub root: FieldSerde,
    pub path_elements: Vec<FieldSerde>,
    pub path_indices: Vec<u8>,
}

impl MerkleProof {
    pub fn depth(&self) -> usize {
        self.path_elements.len()
    }

    /// Folds the leaf up the path. Returns `None` for a malformed path
    /// (length mismatch or an index outside `{0, 1}`).
    pub fn compute_root(&self, hasher: &FieldHasher) -> Option<ScalarField> {
        if self.path_elements.len() != self.path_indices.len() {
            return None;
        }
        let mut current = self.leaf.0;
        for (sibling, bit) in self.path_elements.iter().zip(&self.path_indices) {
            current = match bit {
                0 => hasher.hash_pair(current, sibling.0),
                1 => hasher.hash_pair(sibling.0, current),
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn verify(&self, hasher: &FieldHasher) -> bool {
        self.compute_root(hasher) == Some(self.root.0)
    }

    pub fn to_circuit_input(&self) -> CircuitInput {
        CircuitInput {
            leaf: self.leaf,
            root: self.root,
            path_elements: self.path_elements.clone(),
            path_indices: self.path_indices.clone(),
        }
    }
}

impl CircuitInput {
    pub fn into_proof(self) -> MerkleProof {
        MerkleProof {
            leaf: self.leaf,
            path_elements: self.path_elements,
            path_indices: self.path_indices,
            root: self.root,
            leaf_index: 0,
        }
    }
}

impl fmt::Display for MerkleProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MerkleProof:\n  Leaf: {}\n  Root: {}\n  Index: {}\n  Depth: {}",
            self.leaf,
            self.root,
            self.leaf_index,
            self.depth()
        )
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MerkleTreeBuilder {
    hasher: FieldHasher,
}

impl MerkleTreeBuilder {
    pub fn new(hasher: FieldHasher) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &FieldHasher {
        &self.hasher
    }

    pub fn build_tree(&self, leaves: &[LeafValue]) -> Result<MerkleTree, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyLeafSet);
        }
        let depth = depth_for(leaves.len());
        let width = 1usize << depth;

        let mut hashed = leaves
            .par_iter()
            .map(|value| self.hasher.hash_leaf_value(value))
            .collect::<Result<Vec<_>, _>>()?;
        hashed.resize(width, self.hasher.zero_leaf());

        let mut levels = Vec::with_capacity(depth + 1);
        levels.push(hashed);
        for _ in 0..depth {
            let next = next_level(&self.hasher, levels.last().map(Vec::as_slice).unwrap_or(&[]));
            levels.push(next);
        }
        debug!(leaves = leaves.len(), depth, "built merkle tree");

        Ok(MerkleTree {
            depth,
            leaf_count: leaves.len(),
            levels,
        })
    }

    /// Builds the tree and the inclusion path of `target`. A value target
    /// resolves to its leftmost occurrence when the leaf set has duplicates.
    pub fn build(
        &self,
        leaves: &[LeafValue],
        target: &LeafTarget,
    ) -> Result<(MerkleTree, MerkleProof), MerkleError> {
        let tree = self.build_tree(leaves)?;
        let index = match target {
            LeafTarget::Index(index) => *index,
            LeafTarget::Value(value) => {
                let hashed = self.hasher.hash_leaf_value(value)?;
                tree.padded_leaves()[..tree.leaf_count()]
                    .iter()
                    .position(|leaf| *leaf == hashed)
                    .ok_or_else(|| MerkleError::LeafNotFound(value.to_string()))?
            }
        };
        let proof = tree.proof(index)?;
        Ok((tree, proof))
    }
}

// An odd-length level pairs its last node with itself.
pub(crate) fn next_level(hasher: &FieldHasher, level: &[ScalarField]) -> Vec<ScalarField> {
    level
        .par_chunks(2)
        .map(|pair| match pair {
            [left, right] => hasher.hash_pair(*left, *right),
            [lone] => hasher.hash_pair(*lone, *lone),
            _ => unreachable!("chunks of two"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(values: &[&str]) -> Vec<LeafValue> {
        values.iter().map(|v| LeafValue::from(*v)).collect()
    }

    #[test]
    fn depth_is_ceil_log2() {
        assert_eq!(depth_for(1), 0);
        assert_eq!(depth_for(2), 1);
        assert_eq!(depth_for(3), 2);
        assert_eq!(depth_for(4), 2);
        assert_eq!(depth_for(5), 3);
        assert_eq!(depth_for(1024), 10);
        assert_eq!(depth_for(1025), 11);
    }

    #[test]
    fn five_leaves_pad_to_eight() {
        let builder = MerkleTreeBuilder::default();
        let (tree, proof) = builder
            .build(&leaves(&["a", "b", "c", "d", "e"]), &"a".into())
            .unwrap();

        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.padded_leaves().len(), 8);
        let zero = builder.hasher().zero_leaf();
        assert_eq!(tree.padded_leaves()[5..].iter().filter(|l| **l == zero).count(), 3);
        assert_eq!(proof.path_elements.len(), 3);
        assert_eq!(proof.path_indices.len(), 3);
        assert_eq!(proof.path_indices[0], 0);
        assert!(proof.verify(builder.hasher()));
        assert_eq!(proof.root.0, tree.root());
    }

    #[test]
    fn every_leaf_reproduces_the_root() {
        let builder = MerkleTreeBuilder::default();
        let values = leaves(&["w", "x", "y", "z", "v", "u", "t"]);
        let tree = builder.build_tree(&values).unwrap();
        for i in 0..values.len() {
            let proof = tree.proof(i).unwrap();
            assert_eq!(proof.compute_root(builder.hasher()), Some(tree.root()));
        }
    }

    #[test]
    fn single_leaf_tree_has_empty_path() {
        let builder = MerkleTreeBuilder::default();
        let (tree, proof) = builder.build(&leaves(&["only"]), &0usize.into()).unwrap();
        assert_eq!(tree.depth(), 0);
        assert!(proof.path_elements.is_empty());
        assert_eq!(tree.root(), builder.hasher().hash_leaf_value(&"only".into()).unwrap());
        assert!(proof.verify(builder.hasher()));
    }

    #[test]
    fn missing_target_is_reported() {
        let builder = MerkleTreeBuilder::default();
        let err = builder.build(&leaves(&["a", "b"]), &"c".into()).unwrap_err();
        assert!(matches!(err, MerkleError::LeafNotFound(_)));
        let err = builder.build(&leaves(&["a", "b", "c"]), &3usize.into()).unwrap_err();
        assert!(matches!(err, MerkleError::LeafNotFound(_)));
    }

    #[test]
    fn empty_leaf_set_is_rejected() {
        let builder = MerkleTreeBuilder::default();
        assert_eq!(builder.build_tree(&[]).unwrap_err(), MerkleError::EmptyLeafSet);
    }

    #[test]
    fn duplicate_values_resolve_to_leftmost() {
        let builder = MerkleTreeBuilder::default();
        let (_, proof) = builder.build(&leaves(&["x", "y", "x", "z"]), &"x".into()).unwrap();
        assert_eq!(proof.leaf_index, 0);
    }

    #[test]
    fn lone_node_is_paired_with_itself() {
        let hasher = FieldHasher::new();
        let a = ScalarField::from(1u64);
        let b = ScalarField::from(2u64);
        let c = ScalarField::from(3u64);
        let next = next_level(&hasher, &[a, b, c]);
        assert_eq!(next, vec![hasher.hash_pair(a, b), hasher.hash_pair(c, c)]);
    }

    #[test]
    fn tampered_path_fails_verification() {
        let builder = MerkleTreeBuilder::default();
        let (_, mut proof) = builder.build(&leaves(&["a", "b", "c", "d"]), &"c".into()).unwrap();
        proof.path_indices[0] ^= 1;
        assert!(!proof.verify(builder.hasher()));
        proof.path_indices[0] = 7;
        assert_eq!(proof.compute_root(builder.hasher()), None);
    }

    #[test]
    fn circuit_input_uses_camel_case_decimal_strings() {
        let builder = MerkleTreeBuilder::default();
        let (_, proof) = builder.build(&leaves(&["a", "b"]), &"b".into()).unwrap();
        let json = serde_json::to_value(proof.to_circuit_input()).unwrap();
        assert!(json["pathElements"][0].is_string());
        assert_eq!(json["pathIndices"][0], 1);
        assert!(json["root"].is_string());
    }
}
