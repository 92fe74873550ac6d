use libs::field_structures::LeafValue;
use libs::merkle::{depth_for, LeafTarget, MerkleTreeBuilder};
use proptest::prelude::*;

fn leaf_sets() -> impl Strategy<Value = Vec<LeafValue>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z0-9]{0,12}".prop_map(LeafValue::Text),
            (0i64..1_000_000).prop_map(LeafValue::Number),
            prop::collection::vec(any::<u8>(), 0..16).prop_map(LeafValue::Bytes),
        ],
        1..40,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn padded_width_is_next_power_of_two(leaves in leaf_sets()) {
        let tree = MerkleTreeBuilder::default().build_tree(&leaves).unwrap();
        let depth = depth_for(leaves.len());
        prop_assert_eq!(tree.depth(), depth);
        prop_assert_eq!(tree.padded_leaves().len(), 1usize << depth);
        prop_assert!(leaves.len() <= 1usize << depth);
        if depth > 0 {
            prop_assert!(leaves.len() > 1usize << (depth - 1));
        }
    }

    #[test]
    fn every_path_recomputes_the_root(leaves in leaf_sets(), pick in any::<prop::sample::Index>()) {
        let builder = MerkleTreeBuilder::default();
        let index = pick.index(leaves.len());
        let (tree, proof) = builder.build(&leaves, &LeafTarget::Index(index)).unwrap();
        prop_assert_eq!(proof.path_elements.len(), tree.depth());
        prop_assert_eq!(proof.path_indices.len(), tree.depth());
        prop_assert!(proof.path_indices.iter().all(|bit| *bit <= 1));
        prop_assert_eq!(proof.compute_root(builder.hasher()), Some(tree.root()));
    }

    #[test]
    fn value_target_finds_leftmost_match(leaves in leaf_sets(), pick in any::<prop::sample::Index>()) {
        let builder = MerkleTreeBuilder::default();
        let target = leaves[pick.index(leaves.len())].clone();
        let (_, proof) = builder.build(&leaves, &LeafTarget::Value(target.clone())).unwrap();
        let hasher = builder.hasher();
        let first = leaves
            .iter()
            .position(|leaf| hasher.hash_leaf_value(leaf).unwrap() == hasher.hash_leaf_value(&target).unwrap())
            .unwrap();
        prop_assert_eq!(proof.leaf_index, first);
        prop_assert!(proof.verify(hasher));
    }
}
