//! Staged proof verification against the trusted-root registry.
//!
//! A proof moves through `Received → Decoded → StructurallyValid → Fresh →
//! Trusted → CryptographicallyValid → Accepted`; any stage can divert it to
//! `Rejected(kind)`. The report only ever carries the normative error kind of
//! the failing stage, never text derived from internal state.

use ark_groth16::Groth16;
use ark_snark::SNARK;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::artifacts::{CircuitArtifacts, N_PUBLIC};
use crate::codec::{self, now_millis, ProofEnvelope};
use crate::error::{ErrorCode, MembershipError, Result, WarningCode};
use crate::field::{ct_field_eq, field_from_hex, is_canonical_hex64};
use crate::prover::{MembershipProof, ProofMetadata};
use crate::registry::TrustedRootRegistry;

/// Accepted clock drift for "timestamp is not in the future".
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Remaining lifetime below which a valid proof gets a near-expiry warning.
const NEAR_EXPIRY_SECS: i64 = 300;

/// Outcome of a verification run.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub valid: bool,
    pub verified_at: DateTime<Utc>,
    pub credential_set_id: Option<Uuid>,
    pub errors: Vec<ErrorCode>,
    pub warnings: Vec<WarningCode>,
}

impl VerificationReport {
    fn accepted(
        set_id: Uuid,
        verified_at: DateTime<Utc>,
        warnings: Vec<WarningCode>,
    ) -> Self {
        VerificationReport {
            valid: true,
            verified_at,
            credential_set_id: Some(set_id),
            errors: Vec::new(),
            warnings,
        }
    }

    fn rejected(set_id: Option<Uuid>, verified_at: DateTime<Utc>, code: ErrorCode) -> Self {
        VerificationReport {
            valid: false,
            verified_at,
            credential_set_id: set_id,
            errors: vec![code],
            warnings: Vec::new(),
        }
    }
}

/// Structure, freshness and trust checks; everything before the pairing work.
fn staged_checks(
    metadata: &ProofMetadata,
    registry: &TrustedRootRegistry,
    now: DateTime<Utc>,
) -> Result<Vec<WarningCode>> {
    // Structural pre-check.
    if !is_canonical_hex64(&metadata.merkle_root) {
        return Err(MembershipError::InvalidRootFormat);
    }
    if metadata.timestamp > now + Duration::seconds(TIMESTAMP_TOLERANCE_SECS) {
        return Err(MembershipError::InvalidProofStructure {
            details: vec!["timestamp is in the future".to_string()],
        });
    }
    if metadata.expires_at < metadata.timestamp {
        return Err(MembershipError::InvalidProofStructure {
            details: vec!["expiresAt must not precede timestamp".to_string()],
        });
    }

    // Temporal check.
    if metadata.expires_at <= now {
        return Err(MembershipError::ProofExpired);
    }

    // Trust check.
    if !registry.is_trusted(metadata.credential_set_id, &metadata.merkle_root) {
        return Err(MembershipError::UntrustedRoot);
    }

    let mut warnings = Vec::new();
    if metadata.expires_at <= now + Duration::seconds(NEAR_EXPIRY_SECS) {
        warnings.push(WarningCode::ProofNearExpiry);
    }
    Ok(warnings)
}

/// Verifies membership proofs. Collaborators are injected at construction and
/// shared read-only.
pub struct ProofVerifier {
    artifacts: Arc<CircuitArtifacts>,
    registry: Arc<TrustedRootRegistry>,
}

impl ProofVerifier {
    #[must_use]
    pub fn new(artifacts: Arc<CircuitArtifacts>, registry: Arc<TrustedRootRegistry>) -> Self {
        ProofVerifier {
            artifacts,
            registry,
        }
    }

    /// Decode a wire envelope and run the full pipeline.
    #[must_use]
    pub fn verify_envelope(&self, envelope: &ProofEnvelope) -> VerificationReport {
        let set_id = envelope.metadata.credential_set_id;
        match codec::decode(envelope) {
            Ok(proof) => self.verify(&proof),
            Err(e) => {
                log::debug!("proof rejected during decode: {}", e.code());
                VerificationReport::rejected(Some(set_id), now_millis(), e.code())
            }
        }
    }

    /// Run the staged pipeline on an already-decoded proof.
    #[must_use]
    pub fn verify(&self, proof: &MembershipProof) -> VerificationReport {
        let now = now_millis();
        let set_id = proof.metadata.credential_set_id;

        let warnings = match staged_checks(&proof.metadata, &self.registry, now) {
            Ok(warnings) => warnings,
            Err(e) => {
                log::debug!("proof {} rejected: {}", proof.metadata.proof_id, e.code());
                return VerificationReport::rejected(Some(set_id), now, e.code());
            }
        };

        // Cryptographic check. The metadata root the trust stage approved
        // must be the root the pairing equation sees, or a proof for an
        // untrusted root could ride on trusted metadata.
        if let Err(e) = self.cryptographic_check(proof) {
            log::debug!("proof {} rejected: {}", proof.metadata.proof_id, e.code());
            return VerificationReport::rejected(Some(set_id), now, e.code());
        }

        VerificationReport::accepted(set_id, now, warnings)
    }

    fn cryptographic_check(&self, proof: &MembershipProof) -> Result<()> {
        if proof.public_signals.len() != N_PUBLIC {
            return Err(MembershipError::ProofVerificationFailed);
        }

        let metadata_root = field_from_hex(&proof.metadata.merkle_root)
            .map_err(|_| MembershipError::ProofVerificationFailed)?;
        if !ct_field_eq(&metadata_root, &proof.public_signals[0]) {
            return Err(MembershipError::ProofVerificationFailed);
        }

        match Groth16::<ark_bn254::Bn254>::verify_with_processed_vk(
            self.artifacts.prepared_vk(),
            &proof.public_signals,
            &proof.proof,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(MembershipError::ProofVerificationFailed),
            Err(e) => {
                log::debug!("pairing check errored: {e}");
                Err(MembershipError::ProofVerificationFailed)
            }
        }
    }
}
