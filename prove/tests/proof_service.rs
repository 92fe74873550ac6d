use libs::backend::mock::MockBackend;
use libs::field_structures::{FieldHasher, LeafValue};
use libs::iotools::{ArtifactKind, CeremonyConfig};
use libs::merkle::LeafTarget;
use mpc_setup::utils::EntropySource;
use mpc_setup::Coordinator;
use prove::{ProofError, ProofService};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config(dir: &Path) -> CeremonyConfig {
    let mut config = CeremonyConfig::with_base_dir(dir);
    config.power = 8;
    config.max_depth = 6;
    config
}

/// Runs a mock ceremony that finalizes the given depths.
fn ceremony(dir: &Path, depths: &[usize]) -> CeremonyConfig {
    let config = config(dir);
    let mut coordinator = Coordinator::open(config.clone(), MockBackend::new(), EntropySource::seeded([7u8; 32])).unwrap();
    coordinator.init_phase1().unwrap();
    coordinator.contribute_phase1("alice").unwrap();
    coordinator.finalize_phase1().unwrap();
    for &depth in depths {
        let locator = coordinator.locator();
        let r1cs = locator.expected_path(depth, ArtifactKind::ConstraintSystem).unwrap();
        fs::create_dir_all(r1cs.parent().unwrap()).unwrap();
        fs::write(&r1cs, format!("constraints for depth {}", depth)).unwrap();
        let wasm = locator.expected_path(depth, ArtifactKind::WitnessProgram).unwrap();
        fs::write(wasm, b"witness program").unwrap();
        coordinator.setup_circuit(depth, "bob").unwrap();
    }
    config
}

fn leaves(values: &[&str]) -> Vec<LeafValue> {
    values.iter().map(|v| LeafValue::from(*v)).collect()
}

#[test]
fn five_leaves_prove_and_verify_at_depth_three() {
    let dir = TempDir::new().unwrap();
    let config = ceremony(dir.path(), &[2, 3]);
    let service = ProofService::from_config(&config, MockBackend::new());

    let result = service
        .generate_proof(&leaves(&["a", "b", "c", "d", "e"]), &"c".into())
        .unwrap();
    assert_eq!(result.depth, 3);
    assert_eq!(result.merkle_proof.leaf_index, 2);
    assert_eq!(result.merkle_proof.path_elements.len(), 3);
    assert_eq!(result.merkle_proof.path_indices, vec![0, 1, 0]);
    assert_eq!(result.public_signals, vec![result.root.to_decimal()]);
    assert!(result.merkle_proof.verify(&FieldHasher::new()));

    assert!(service.verify_result(&result).unwrap());
}

#[test]
fn altered_signals_or_wrong_depth_do_not_verify() {
    let dir = TempDir::new().unwrap();
    let config = ceremony(dir.path(), &[2, 3]);
    let service = ProofService::from_config(&config, MockBackend::new());
    let result = service
        .generate_proof(&leaves(&["a", "b", "c", "d", "e"]), &LeafTarget::Index(4))
        .unwrap();

    let forged = vec!["12345".to_string()];
    assert!(!service.verify_proof(&result.proof, &forged, 3).unwrap());
    assert!(!service.verify_proof(&result.proof, &result.public_signals, 2).unwrap());
}

#[test]
fn unknown_leaf_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = ceremony(dir.path(), &[2]);
    let service = ProofService::from_config(&config, MockBackend::new());

    assert!(matches!(
        service.generate_proof(&leaves(&["a", "b", "c"]), &"z".into()),
        Err(ProofError::LeafNotFound(_))
    ));
    assert!(matches!(
        service.generate_proof(&leaves(&["a", "b", "c"]), &LeafTarget::Index(3)),
        Err(ProofError::LeafNotFound(_))
    ));
    let negative = vec![LeafValue::Number(3), LeafValue::Number(-3), LeafValue::Number(5)];
    assert!(matches!(
        service.generate_proof(&negative, &LeafTarget::Index(0)),
        Err(ProofError::Encoding(_))
    ));
}

#[test]
fn depth_without_a_finished_ceremony_is_missing() {
    let dir = TempDir::new().unwrap();
    let config = ceremony(dir.path(), &[3]);
    let service = ProofService::from_config(&config, MockBackend::new());

    let nine: Vec<LeafValue> = (0..9i64).map(LeafValue::from).collect();
    match service.generate_proof(&nine, &LeafTarget::Index(0)) {
        Err(ProofError::ArtifactMissing { depth, .. }) => assert_eq!(depth, 4),
        other => panic!("unexpected {other:?}"),
    }
    let too_many: Vec<LeafValue> = (0..65i64).map(LeafValue::from).collect();
    assert!(matches!(
        service.generate_proof(&too_many, &LeafTarget::Index(0)),
        Err(ProofError::InvalidDepth { depth: 7, max: 6 })
    ));
}

#[test]
fn verification_needs_the_key_file() {
    let dir = TempDir::new().unwrap();
    let config = ceremony(dir.path(), &[2]);
    let service = ProofService::from_config(&config, MockBackend::new());
    let result = service
        .generate_proof(&leaves(&["a", "b", "c", "d"]), &"d".into())
        .unwrap();

    let vk = service.locator().locate(2, ArtifactKind::VerificationKey).unwrap();
    fs::write(&vk, r#"{"protocol": "groth16"}"#).unwrap();
    assert!(matches!(
        service.verify_result(&result),
        Err(ProofError::MalformedVerificationKey { .. })
    ));

    fs::remove_file(&vk).unwrap();
    assert!(matches!(
        service.verify_result(&result),
        Err(ProofError::ArtifactMissing { depth: 2, .. })
    ));
}

#[test]
fn verifier_contract_comes_from_the_finalized_depth() {
    let dir = TempDir::new().unwrap();
    let config = ceremony(dir.path(), &[3]);
    let service = ProofService::from_config(&config, MockBackend::new());

    let exported = service.locator().locate(3, ArtifactKind::VerifierExport).unwrap();
    let contract = service.export_verifier_contract(3).unwrap();
    assert_eq!(contract, fs::read_to_string(&exported).unwrap());
    assert!(contract.contains("contract Groth16Verifier"));

    fs::remove_file(&exported).unwrap();
    assert_eq!(service.export_verifier_contract(3).unwrap(), contract);

    assert!(matches!(
        service.export_verifier_contract(4),
        Err(ProofError::ArtifactMissing { depth: 4, .. })
    ));
}
