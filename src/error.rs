//! Error types for the credential membership system.
//!
//! Every failure maps to a stable wire code so that HTTP callers receive a
//! machine-readable error kind rather than text derived from internal state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable wire codes for every error the system can surface.
///
/// Serialized in `SCREAMING_SNAKE_CASE`, e.g. `UNTRUSTED_ROOT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidCredential,
    CredentialNotFound,
    CredentialSetNotFound,
    DuplicateCredential,
    CredentialLimitExceeded,
    ProofGenerationFailed,
    ProofVerificationFailed,
    ProofExpired,
    InvalidProofStructure,
    CircuitNotFound,
    CircuitInitializationFailed,
    VerificationKeyNotFound,
    UntrustedRoot,
    InvalidRootFormat,
    ValidationError,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidCredential => "INVALID_CREDENTIAL",
            ErrorCode::CredentialNotFound => "CREDENTIAL_NOT_FOUND",
            ErrorCode::CredentialSetNotFound => "CREDENTIAL_SET_NOT_FOUND",
            ErrorCode::DuplicateCredential => "DUPLICATE_CREDENTIAL",
            ErrorCode::CredentialLimitExceeded => "CREDENTIAL_LIMIT_EXCEEDED",
            ErrorCode::ProofGenerationFailed => "PROOF_GENERATION_FAILED",
            ErrorCode::ProofVerificationFailed => "PROOF_VERIFICATION_FAILED",
            ErrorCode::ProofExpired => "PROOF_EXPIRED",
            ErrorCode::InvalidProofStructure => "INVALID_PROOF_STRUCTURE",
            ErrorCode::CircuitNotFound => "CIRCUIT_NOT_FOUND",
            ErrorCode::CircuitInitializationFailed => "CIRCUIT_INITIALIZATION_FAILED",
            ErrorCode::VerificationKeyNotFound => "VERIFICATION_KEY_NOT_FOUND",
            ErrorCode::UntrustedRoot => "UNTRUSTED_ROOT",
            ErrorCode::InvalidRootFormat => "INVALID_ROOT_FORMAT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal advisories attached to verification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// The proof verifies but expires within five minutes.
    ProofNearExpiry,
}

/// Errors produced by the credential membership core.
///
/// The `CredentialNotFound` message is deliberately the same generic
/// "Invalid credential" used for malformed credentials, so a caller probing a
/// set learns nothing about its contents.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("Invalid credential")]
    InvalidCredential { details: Vec<String> },

    #[error("Invalid credential")]
    CredentialNotFound,

    #[error("Credential set not found")]
    CredentialSetNotFound,

    #[error("Duplicate credential in set")]
    DuplicateCredential { details: Vec<String> },

    #[error("Credential set exceeds the maximum of {max} credentials")]
    CredentialLimitExceeded { max: usize },

    #[error("Proof generation failed")]
    ProofGenerationFailed { details: Vec<String> },

    #[error("Proof verification failed")]
    ProofVerificationFailed,

    #[error("Proof has expired")]
    ProofExpired,

    #[error("Invalid proof structure")]
    InvalidProofStructure { details: Vec<String> },

    #[error("Circuit '{0}' not found")]
    CircuitNotFound(String),

    #[error("Circuit initialization failed")]
    CircuitInitializationFailed { details: Vec<String> },

    #[error("Verification key not found")]
    VerificationKeyNotFound,

    #[error("Merkle root is not trusted for this credential set")]
    UntrustedRoot,

    #[error("Merkle root must be 64 lowercase hex characters")]
    InvalidRootFormat,

    #[error("Validation failed")]
    Validation { details: Vec<String> },

    #[error("Internal error")]
    Internal,
}

impl MembershipError {
    /// Wire code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            MembershipError::InvalidCredential { .. } => ErrorCode::InvalidCredential,
            MembershipError::CredentialNotFound => ErrorCode::CredentialNotFound,
            MembershipError::CredentialSetNotFound => ErrorCode::CredentialSetNotFound,
            MembershipError::DuplicateCredential { .. } => ErrorCode::DuplicateCredential,
            MembershipError::CredentialLimitExceeded { .. } => ErrorCode::CredentialLimitExceeded,
            MembershipError::ProofGenerationFailed { .. } => ErrorCode::ProofGenerationFailed,
            MembershipError::ProofVerificationFailed => ErrorCode::ProofVerificationFailed,
            MembershipError::ProofExpired => ErrorCode::ProofExpired,
            MembershipError::InvalidProofStructure { .. } => ErrorCode::InvalidProofStructure,
            MembershipError::CircuitNotFound(_) => ErrorCode::CircuitNotFound,
            MembershipError::CircuitInitializationFailed { .. } => {
                ErrorCode::CircuitInitializationFailed
            }
            MembershipError::VerificationKeyNotFound => ErrorCode::VerificationKeyNotFound,
            MembershipError::UntrustedRoot => ErrorCode::UntrustedRoot,
            MembershipError::InvalidRootFormat => ErrorCode::InvalidRootFormat,
            MembershipError::Validation { .. } => ErrorCode::ValidationError,
            MembershipError::Internal => ErrorCode::InternalError,
        }
    }

    /// Field-specific detail strings, safe for logs and clients.
    #[must_use]
    pub fn details(&self) -> &[String] {
        match self {
            MembershipError::InvalidCredential { details }
            | MembershipError::DuplicateCredential { details }
            | MembershipError::ProofGenerationFailed { details }
            | MembershipError::InvalidProofStructure { details }
            | MembershipError::CircuitInitializationFailed { details }
            | MembershipError::Validation { details } => details,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, MembershipError>;
