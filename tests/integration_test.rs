//! End-to-end scenarios: set creation, trust pinning, proof generation over
//! real Groth16 parameters, wire round-trips and the staged verifier.
//!
//! Parameter generation for the depth-20 circuit is expensive, so one setup
//! is shared by every test in this file.

use ark_std::rand::{rngs::StdRng, SeedableRng};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use uuid::Uuid;
use zkp_credential_membership::artifacts::{CircuitArtifacts, VerificationKeyJson};
use zkp_credential_membership::circuit::generate_parameters;
use zkp_credential_membership::codec;
use zkp_credential_membership::config::Config;
use zkp_credential_membership::error::ErrorCode;
use zkp_credential_membership::prover::{MembershipProof, ZkProver};
use zkp_credential_membership::registry::{TrustedRootEntry, TrustedRootRegistry};
use zkp_credential_membership::sets::SetManager;
use zkp_credential_membership::verifier::ProofVerifier;

static ARTIFACTS: OnceLock<Arc<CircuitArtifacts>> = OnceLock::new();

fn artifacts() -> Arc<CircuitArtifacts> {
    Arc::clone(ARTIFACTS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(42);
        let proving_key = generate_parameters(&mut rng).expect("parameter generation");
        Arc::new(CircuitArtifacts::from_parts("credential_membership", proving_key))
    }))
}

struct Fixture {
    set_id: Uuid,
    merkle_root: String,
    proof: MembershipProof,
}

static FIXTURE: OnceLock<Fixture> = OnceLock::new();

/// A `Universities` set with a proof for `"Harvard"`, shared across tests.
fn fixture() -> &'static Fixture {
    FIXTURE.get_or_init(|| {
        let config = Config::default();
        let manager = SetManager::new(config.sets.max_credentials_per_set);
        let set = manager
            .create(
                "Universities",
                vec![
                    "MIT".to_string(),
                    "Stanford".to_string(),
                    "Harvard".to_string(),
                    "Berkeley".to_string(),
                ],
                None,
                None,
            )
            .expect("create set");

        let witness = manager
            .generate_witness(set.id, "Harvard")
            .expect("witness");
        let prover = ZkProver::new(artifacts(), &config).expect("prover");
        let proof = prover.generate(set.id, &witness, "Harvard").expect("proof");

        Fixture {
            set_id: set.id,
            merkle_root: set.merkle_root,
            proof,
        }
    })
}

fn verifier_with(registry: Arc<TrustedRootRegistry>) -> ProofVerifier {
    ProofVerifier::new(artifacts(), registry)
}

#[test]
fn test_trusted_proof_is_accepted() {
    let fixture = fixture();
    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(fixture.set_id, &fixture.merkle_root))
        .unwrap();

    let report = verifier_with(registry).verify(&fixture.proof);
    assert!(report.valid, "errors: {:?}", report.errors);
    assert_eq!(report.credential_set_id, Some(fixture.set_id));
    assert!(report.errors.is_empty());
}

#[test]
fn test_trust_gate_rejects_unregistered_root() {
    let fixture = fixture();
    let registry = Arc::new(TrustedRootRegistry::new());

    let report = verifier_with(registry).verify(&fixture.proof);
    assert!(!report.valid);
    assert_eq!(report.errors, vec![ErrorCode::UntrustedRoot]);
}

#[test]
fn test_wire_roundtrip_preserves_proof() {
    let fixture = fixture();
    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(fixture.set_id, &fixture.merkle_root))
        .unwrap();

    let json = codec::serialize(&fixture.proof).unwrap();
    let decoded = codec::deserialize(&json).unwrap();

    assert_eq!(decoded.metadata, fixture.proof.metadata);
    assert_eq!(decoded.public_signals, fixture.proof.public_signals);

    let report = verifier_with(registry).verify(&decoded);
    assert!(report.valid, "errors: {:?}", report.errors);
}

#[test]
fn test_tampered_metadata_root_is_untrusted() {
    let fixture = fixture();
    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(fixture.set_id, &fixture.merkle_root))
        .unwrap();

    let mut proof = fixture.proof.clone();
    proof.metadata.merkle_root = "0".repeat(64);

    let report = verifier_with(registry).verify(&proof);
    assert!(!report.valid);
    assert_eq!(report.errors, vec![ErrorCode::UntrustedRoot]);
}

#[test]
fn test_metadata_root_swap_to_trusted_root_fails_crypto() {
    // Pointing the metadata at a different trusted root passes the trust
    // stage but the pairing equation sees the mismatch.
    let fixture = fixture();
    let config = Config::default();
    let manager = SetManager::new(config.sets.max_credentials_per_set);
    let other = manager
        .create("Other", vec!["u".to_string(), "v".to_string()], None, None)
        .unwrap();

    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(fixture.set_id, &other.merkle_root))
        .unwrap();

    let mut proof = fixture.proof.clone();
    proof.metadata.merkle_root = other.merkle_root.clone();

    let report = verifier_with(registry).verify(&proof);
    assert!(!report.valid);
    assert_eq!(report.errors, vec![ErrorCode::ProofVerificationFailed]);
}

#[test]
fn test_zero_ttl_proof_expires() {
    let mut config = Config::default();
    config.proof.expiry_hours = 0;

    let manager = SetManager::new(config.sets.max_credentials_per_set);
    let set = manager
        .create("Ephemeral", vec!["x".to_string(), "y".to_string()], None, None)
        .unwrap();
    let witness = manager.generate_witness(set.id, "x").unwrap();
    let prover = ZkProver::new(artifacts(), &config).unwrap();
    let proof = prover.generate(set.id, &witness, "x").unwrap();

    assert_eq!(proof.metadata.expires_at, proof.metadata.timestamp);

    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(set.id, &set.merkle_root))
        .unwrap();

    let report = verifier_with(registry).verify(&proof);
    assert!(!report.valid);
    assert_eq!(report.errors, vec![ErrorCode::ProofExpired]);
}

#[test]
fn test_cross_set_substitution_is_untrusted() {
    let config = Config::default();
    let manager = SetManager::new(config.sets.max_credentials_per_set);
    let set_a = manager
        .create("A", vec!["x".to_string(), "y".to_string()], None, None)
        .unwrap();
    let set_b = manager
        .create("B", vec!["u".to_string(), "v".to_string()], None, None)
        .unwrap();

    let witness = manager.generate_witness(set_a.id, "x").unwrap();
    let prover = ZkProver::new(artifacts(), &config).unwrap();
    let proof = prover.generate(set_a.id, &witness, "x").unwrap();

    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(set_a.id, &set_a.merkle_root))
        .unwrap();
    registry
        .add(TrustedRootEntry::new(set_b.id, &set_b.merkle_root))
        .unwrap();

    // Claiming the proof belongs to set B: B's registry has A's root absent.
    let mut stolen = proof.clone();
    stolen.metadata.credential_set_id = set_b.id;

    let report = verifier_with(registry).verify(&stolen);
    assert!(!report.valid);
    assert_eq!(report.errors, vec![ErrorCode::UntrustedRoot]);
}

#[test]
fn test_nonmember_witness_is_generic_error() {
    let config = Config::default();
    let manager = SetManager::new(config.sets.max_credentials_per_set);
    let set = manager
        .create("Universities", vec!["MIT".to_string()], None, None)
        .unwrap();

    let err = manager
        .generate_witness(set.id, "not-a-member")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::CredentialNotFound);
    assert_eq!(err.to_string(), "Invalid credential");
}

#[test]
fn test_revoked_root_rejects_prior_proofs() {
    let fixture = fixture();
    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(fixture.set_id, &fixture.merkle_root))
        .unwrap();

    let verifier = verifier_with(Arc::clone(&registry));
    assert!(verifier.verify(&fixture.proof).valid);

    assert!(registry.revoke(fixture.set_id, &fixture.merkle_root));

    let report = verifier.verify(&fixture.proof);
    assert!(!report.valid);
    assert_eq!(report.errors, vec![ErrorCode::UntrustedRoot]);
}

#[test]
fn test_temporal_monotonicity_of_metadata() {
    let fixture = fixture();
    let now = chrono::Utc::now();
    assert!(fixture.proof.metadata.timestamp <= now);
    assert!(fixture.proof.metadata.expires_at > fixture.proof.metadata.timestamp);
}

#[test]
fn test_public_signal_is_the_registered_root() {
    let fixture = fixture();
    assert_eq!(fixture.proof.public_signals.len(), 1);
    assert_eq!(
        zkp_credential_membership::field::field_to_hex(&fixture.proof.public_signals[0]),
        fixture.merkle_root
    );
}

#[test]
fn test_artifact_files_roundtrip() {
    let dir = TempDir::new().unwrap();
    let circuit_dir = dir.path().join("credential_membership");
    artifacts().write_artifacts(&circuit_dir).unwrap();

    let mut config = Config::default();
    config.circuit.circuits_path = dir.path().to_path_buf();
    let loaded = CircuitArtifacts::init(&config).unwrap();

    assert_eq!(
        VerificationKeyJson::from_ark(loaded.verifying_key()),
        VerificationKeyJson::from_ark(artifacts().verifying_key())
    );

    // A proof made with the original keys verifies under the reloaded ones.
    let fixture = fixture();
    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(fixture.set_id, &fixture.merkle_root))
        .unwrap();
    let verifier = ProofVerifier::new(Arc::new(loaded), registry);
    assert!(verifier.verify(&fixture.proof).valid);
}

#[test]
fn test_missing_circuit_directory_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.circuit.circuits_path = dir.path().to_path_buf();

    let err = CircuitArtifacts::init(&config).unwrap_err();
    assert_eq!(err.code(), ErrorCode::CircuitNotFound);
}

#[test]
fn test_missing_verification_key_is_reported() {
    let dir = TempDir::new().unwrap();
    let circuit_dir = dir.path().join("credential_membership");
    artifacts().write_artifacts(&circuit_dir).unwrap();
    std::fs::remove_file(circuit_dir.join("verification_key.json")).unwrap();

    let mut config = Config::default();
    config.circuit.circuits_path = dir.path().to_path_buf();

    let err = CircuitArtifacts::init(&config).unwrap_err();
    assert_eq!(err.code(), ErrorCode::VerificationKeyNotFound);
}

#[test]
fn test_verify_envelope_rejects_corrupt_proof_points() {
    let fixture = fixture();
    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(fixture.set_id, &fixture.merkle_root))
        .unwrap();

    let mut envelope = codec::ProofEnvelope::from(&fixture.proof);
    envelope.proof.pi_a[0] = "12345".to_string();

    let report = verifier_with(registry).verify_envelope(&envelope);
    assert!(!report.valid);
    assert_eq!(report.errors, vec![ErrorCode::InvalidProofStructure]);
    assert_eq!(report.credential_set_id, Some(fixture.set_id));
}
