//! Groth16 proof generation with metadata stamping.
//!
//! Proving is CPU-heavy (hundreds of milliseconds to seconds), so the prover
//! owns a worker pool sized to the available cores and bounds every request
//! with a deadline. The caller's thread never runs the pairing-heavy work.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof};
use ark_std::Zero;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::mpsc;
use std::sync::Arc;
use uuid::Uuid;

use crate::artifacts::CircuitArtifacts;
use crate::circuit::MembershipCircuit;
use crate::codec::now_millis;
use crate::config::Config;
use crate::error::{MembershipError, Result};
use crate::field::{ct_field_eq, field_to_hex, str_to_field};
use crate::merkle::{MerkleTree, MerkleWitness};
use crate::PROOF_VERSION;

/// Metadata stamped onto every generated proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofMetadata {
    pub proof_id: Uuid,
    pub credential_set_id: Uuid,
    pub merkle_root: String,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub version: String,
    pub circuit_id: String,
}

/// A Groth16 membership proof with its public signals and metadata.
///
/// The only public signal is the Merkle root.
#[derive(Debug, Clone)]
pub struct MembershipProof {
    pub proof: Proof<Bn254>,
    pub public_signals: Vec<Fr>,
    pub metadata: ProofMetadata,
}

/// Application-level replay tag. Not part of the circuit's soundness
/// argument; callers relying on it need their own nullifier ledger.
#[derive(Debug, Clone)]
pub struct Nullifier {
    /// SHA-256(credential || secret), hex encoded.
    pub value: String,
    pub secret: Vec<u8>,
}

/// Derive a nullifier for a credential. Without an explicit secret, 32 fresh
/// random bytes are drawn so two derivations are unlinkable.
#[must_use]
pub fn nullifier(credential: &str, secret: Option<&[u8]>) -> Nullifier {
    let secret = match secret {
        Some(bytes) => bytes.to_vec(),
        None => {
            let mut bytes = vec![0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            bytes
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    hasher.update(&secret);

    Nullifier {
        value: hex::encode(hasher.finalize()),
        secret,
    }
}

/// Generates membership proofs against the loaded circuit artifacts.
pub struct ZkProver {
    artifacts: Arc<CircuitArtifacts>,
    pool: rayon::ThreadPool,
    expiry_hours: i64,
    max_depth: usize,
    timeout: std::time::Duration,
}

impl ZkProver {
    /// Build a prover around loaded artifacts and configuration.
    ///
    /// # Errors
    ///
    /// Fails if the worker pool cannot be created.
    pub fn new(artifacts: Arc<CircuitArtifacts>, config: &Config) -> Result<Self> {
        let threads = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(2);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("zk-prover-{i}"))
            .build()
            .map_err(|e| {
                log::error!("failed to build prover pool: {e}");
                MembershipError::Internal
            })?;

        Ok(ZkProver {
            artifacts,
            pool,
            expiry_hours: config.proof.expiry_hours as i64,
            max_depth: config.proof.max_merkle_depth,
            timeout: std::time::Duration::from_secs(config.proof.generation_timeout_secs),
        })
    }

    /// Generate a membership proof for `credential` from an inclusion
    /// witness produced by the set manager.
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` for a structurally incomplete witness or one
    ///   deeper than the configured maximum.
    /// - `INVALID_CREDENTIAL` when the credential does not encode to the
    ///   witness leaf.
    /// - `PROOF_GENERATION_FAILED` when the witness does not fold to its own
    ///   root, the deadline expires, or the backend fails.
    pub fn generate(
        &self,
        set_id: Uuid,
        witness: &MerkleWitness,
        credential: &str,
    ) -> Result<MembershipProof> {
        if credential.trim().is_empty() {
            return Err(MembershipError::InvalidCredential {
                details: vec!["credential must not be empty".to_string()],
            });
        }
        if witness.siblings.len() != witness.path_indices.len() {
            return Err(MembershipError::Validation {
                details: vec!["witness sibling and index lengths differ".to_string()],
            });
        }

        // Depth of the witness before sentinel padding.
        let depth = witness
            .siblings
            .iter()
            .rposition(|node| !node.hash.is_zero())
            .map_or(0, |i| i + 1);
        if depth > self.max_depth {
            return Err(MembershipError::Validation {
                details: vec![format!(
                    "witness depth {depth} exceeds the configured maximum {}",
                    self.max_depth
                )],
            });
        }

        let credential_field = str_to_field(credential);
        if !ct_field_eq(&credential_field, &witness.leaf) {
            return Err(MembershipError::InvalidCredential {
                details: vec!["credential does not match the witness leaf".to_string()],
            });
        }

        // The root is the circuit's only public signal; it must equal the
        // witness root or the constraint system cannot be satisfied.
        let folded = MerkleTree::fold_path(witness.leaf, &witness.siblings);
        if !ct_field_eq(&folded, &witness.root) {
            return Err(MembershipError::ProofGenerationFailed {
                details: vec!["witness does not fold to its own root".to_string()],
            });
        }

        let circuit = MembershipCircuit::from_witness(credential, witness);
        let proof = self.prove_with_deadline(circuit)?;

        let timestamp = now_millis();
        let metadata = ProofMetadata {
            proof_id: Uuid::new_v4(),
            credential_set_id: set_id,
            merkle_root: field_to_hex(&witness.root),
            timestamp,
            expires_at: timestamp + Duration::hours(self.expiry_hours),
            version: PROOF_VERSION.to_string(),
            circuit_id: self.artifacts.circuit_id().to_string(),
        };

        log::debug!(
            "generated proof {} for set {} (root {})",
            metadata.proof_id,
            set_id,
            metadata.merkle_root
        );

        Ok(MembershipProof {
            proof,
            public_signals: vec![witness.root],
            metadata,
        })
    }

    fn prove_with_deadline(&self, circuit: MembershipCircuit) -> Result<Proof<Bn254>> {
        let (tx, rx) = mpsc::channel();
        let artifacts = Arc::clone(&self.artifacts);

        self.pool.spawn(move || {
            let mut rng = rand::thread_rng();
            let result = Groth16::<Bn254>::create_random_proof_with_reduction(
                circuit,
                artifacts.proving_key(),
                &mut rng,
            );
            // The receiver may have given up on the deadline already.
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(proof)) => Ok(proof),
            Ok(Err(e)) => Err(MembershipError::ProofGenerationFailed {
                details: vec![format!("proving backend error: {e}")],
            }),
            Err(_) => Err(MembershipError::ProofGenerationFailed {
                details: vec![format!(
                    "timeout: proof generation exceeded {}s",
                    self.timeout.as_secs()
                )],
            }),
        }
    }
}
