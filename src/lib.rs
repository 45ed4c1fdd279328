//! Anonymous credential set membership proofs.
//!
//! An administrator publishes a named set of opaque credential strings and a
//! Poseidon Merkle commitment over them. A holder of any credential in the
//! set can produce a succinct Groth16 proof of membership that reveals
//! neither which credential is held nor anything that links two proofs. A
//! verifier accepts a proof only if its Merkle root has been pinned as
//! trusted for the set, the proof has not expired, and the pairing check
//! passes against the circuit's verification key.
//!
//! # Components
//!
//! - [`field`]: Poseidon hashing over BN254 and the string-to-field encoding
//! - [`merkle::MerkleTree`]: sorted-pair Poseidon Merkle tree and witnesses
//! - [`sets::SetManager`]: named credential sets and witness production
//! - [`circuit::MembershipCircuit`]: the R1CS statement proved with Groth16
//! - [`artifacts::CircuitArtifacts`]: proving/verification key lifecycle
//! - [`prover::ZkProver`]: proof generation with metadata stamping
//! - [`registry::TrustedRootRegistry`] and [`verifier::ProofVerifier`]:
//!   trust pinning and the staged verification pipeline
//! - [`codec`]: the canonical JSON wire format
//!
//! # Example
//!
//! ```no_run
//! use zkp_credential_membership::{
//!     artifacts::CircuitArtifacts, config::Config, prover::ZkProver,
//!     registry::{TrustedRootEntry, TrustedRootRegistry}, sets::SetManager,
//!     verifier::ProofVerifier,
//! };
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let artifacts = Arc::new(CircuitArtifacts::init(&config)?);
//! let manager = SetManager::new(config.sets.max_credentials_per_set);
//! let registry = Arc::new(TrustedRootRegistry::new());
//!
//! let set = manager.create(
//!     "Universities",
//!     vec!["MIT".into(), "Stanford".into(), "Harvard".into()],
//!     None,
//!     None,
//! )?;
//! registry.add(TrustedRootEntry::new(set.id, &set.merkle_root))?;
//!
//! let witness = manager.generate_witness(set.id, "Harvard")?;
//! let prover = ZkProver::new(Arc::clone(&artifacts), &config)?;
//! let proof = prover.generate(set.id, &witness, "Harvard")?;
//!
//! let verifier = ProofVerifier::new(artifacts, registry);
//! assert!(verifier.verify(&proof).valid);
//! # Ok::<(), zkp_credential_membership::error::MembershipError>(())
//! ```

pub mod artifacts;
pub mod circuit;
pub mod codec;
pub mod config;
pub mod error;
pub mod field;
pub mod merkle;
pub mod prover;
pub mod registry;
pub mod sets;
pub mod verifier;


pub use circuit::MembershipCircuit;
pub use codec::ProofEnvelope;
pub use error::{ErrorCode, MembershipError};
pub use merkle::{MerkleTree, MerkleWitness};
pub use prover::{MembershipProof, ZkProver};
pub use registry::TrustedRootRegistry;
pub use sets::SetManager;
pub use verifier::{ProofVerifier, VerificationReport};

/// Fixed logical depth of the membership circuit.
///
/// The circuit always folds exactly `TREE_DEPTH` levels; witnesses from
/// smaller trees are padded with zero-sentinel levels that leave the running
/// hash unchanged. 2^20 leaves is far above the per-set credential limit, so
/// the bound never constrains callers in practice.
///
/// # Security Considerations
///
/// Changing `TREE_DEPTH` changes the constraint system, so the proving and
/// verification keys must be regenerated with the `setup` binary. A prover
/// and verifier disagreeing on this value will never produce accepted proofs.
///
/// # Performance Trade-offs
///
/// Each level adds one in-circuit Poseidon permutation. Shrinking the depth
/// speeds up proving roughly linearly but caps the maximum set size;
/// growing it does the reverse.
pub const TREE_DEPTH: usize = 20;

/// Maximum byte length of a single credential string.
pub const MAX_CREDENTIAL_BYTES: usize = 256;

/// Wire-format version stamped into proof metadata.
pub const PROOF_VERSION: &str = "1.0.0";

/// Version recorded on newly created credential sets.
pub const SET_VERSION: &str = "1.0.0";
