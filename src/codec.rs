//! Canonical wire serialization of membership proofs, plus the JSON payloads
//! the HTTP layer exchanges with the core.
//!
//! Curve points travel as decimal-string projective coordinates in the
//! snarkjs layout, public signals as decimal-string field elements, and
//! timestamps as millisecond-precision UTC ISO-8601. Deserialization is
//! strict; anything that does not parse is `INVALID_PROOF_STRUCTURE`.

use ark_bn254::{Fq, Fq2, Fr, G1Affine, G2Affine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ErrorCode, MembershipError, Result, WarningCode};
use crate::prover::{MembershipProof, ProofMetadata};
use crate::sets::{CredentialSet, CredentialSetType};
use crate::verifier::VerificationReport;
use crate::field::field_from_decimal;

pub const PROTOCOL: &str = "groth16";
pub const CURVE: &str = "bn128";

/// Millisecond-precision UTC ISO-8601 timestamps, e.g.
/// `2026-08-02T09:30:00.000Z`. Parsing requires exactly this shape.
pub mod ts_millis {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    pub fn serialize<S: Serializer>(
        date: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// Current instant truncated to millisecond precision, so stamped metadata
/// round-trips through the wire format unchanged.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Groth16 proof body in the snarkjs JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16ProofJson {
    pub pi_a: [String; 3],
    pub pi_b: [[String; 2]; 3],
    pub pi_c: [String; 3],
    pub protocol: String,
    pub curve: String,
}

/// Proof metadata as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofMetadataJson {
    pub proof_id: Uuid,
    pub credential_set_id: Uuid,
    pub merkle_root: String,
    #[serde(with = "ts_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "ts_millis")]
    pub expires_at: DateTime<Utc>,
    pub version: String,
    pub circuit_id: String,
}

impl From<&ProofMetadata> for ProofMetadataJson {
    fn from(metadata: &ProofMetadata) -> Self {
        ProofMetadataJson {
            proof_id: metadata.proof_id,
            credential_set_id: metadata.credential_set_id,
            merkle_root: metadata.merkle_root.clone(),
            timestamp: metadata.timestamp,
            expires_at: metadata.expires_at,
            version: metadata.version.clone(),
            circuit_id: metadata.circuit_id.clone(),
        }
    }
}

impl From<&ProofMetadataJson> for ProofMetadata {
    fn from(json: &ProofMetadataJson) -> Self {
        ProofMetadata {
            proof_id: json.proof_id,
            credential_set_id: json.credential_set_id,
            merkle_root: json.merkle_root.clone(),
            timestamp: json.timestamp,
            expires_at: json.expires_at,
            version: json.version.clone(),
            circuit_id: json.circuit_id.clone(),
        }
    }
}

fn proof_object_or_string<'de, D>(deserializer: D) -> std::result::Result<Groth16ProofJson, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Object(Groth16ProofJson),
        Encoded(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Object(proof) => Ok(proof),
        Repr::Encoded(s) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
    }
}

/// The canonical proof wire form. The `proof` field is accepted either as an
/// object or as a JSON-encoded string of that object; it always serializes
/// as an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEnvelope {
    #[serde(deserialize_with = "proof_object_or_string")]
    pub proof: Groth16ProofJson,
    #[serde(rename = "publicSignals")]
    pub public_signals: Vec<String>,
    pub metadata: ProofMetadataJson,
}

fn fq_from_dec(s: &str, field_name: &str) -> Result<Fq> {
    Fq::from_str(s).map_err(|_| MembershipError::InvalidProofStructure {
        details: vec![format!("{field_name}: not a decimal base-field element")],
    })
}

pub(crate) fn g1_to_json(point: &G1Affine) -> [String; 3] {
    if point.infinity {
        return ["0".to_string(), "1".to_string(), "0".to_string()];
    }
    [point.x.to_string(), point.y.to_string(), "1".to_string()]
}

pub(crate) fn g1_from_json(coords: &[String; 3], field_name: &str) -> Result<G1Affine> {
    if coords[2] != "1" {
        return Err(MembershipError::InvalidProofStructure {
            details: vec![format!("{field_name}: expected affine point with z = 1")],
        });
    }
    let x = fq_from_dec(&coords[0], field_name)?;
    let y = fq_from_dec(&coords[1], field_name)?;
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(MembershipError::InvalidProofStructure {
            details: vec![format!("{field_name}: point is not on the curve")],
        });
    }
    Ok(point)
}

pub(crate) fn g2_to_json(point: &G2Affine) -> [[String; 2]; 3] {
    if point.infinity {
        return [
            ["0".to_string(), "0".to_string()],
            ["1".to_string(), "0".to_string()],
            ["0".to_string(), "0".to_string()],
        ];
    }
    [
        [point.x.c0.to_string(), point.x.c1.to_string()],
        [point.y.c0.to_string(), point.y.c1.to_string()],
        ["1".to_string(), "0".to_string()],
    ]
}

pub(crate) fn g2_from_json(coords: &[[String; 2]; 3], field_name: &str) -> Result<G2Affine> {
    if coords[2][0] != "1" || coords[2][1] != "0" {
        return Err(MembershipError::InvalidProofStructure {
            details: vec![format!("{field_name}: expected affine point with z = 1")],
        });
    }
    let x = Fq2::new(
        fq_from_dec(&coords[0][0], field_name)?,
        fq_from_dec(&coords[0][1], field_name)?,
    );
    let y = Fq2::new(
        fq_from_dec(&coords[1][0], field_name)?,
        fq_from_dec(&coords[1][1], field_name)?,
    );
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(MembershipError::InvalidProofStructure {
            details: vec![format!("{field_name}: point is not on the curve")],
        });
    }
    Ok(point)
}

impl From<&MembershipProof> for ProofEnvelope {
    fn from(proof: &MembershipProof) -> Self {
        ProofEnvelope {
            proof: Groth16ProofJson {
                pi_a: g1_to_json(&proof.proof.a),
                pi_b: g2_to_json(&proof.proof.b),
                pi_c: g1_to_json(&proof.proof.c),
                protocol: PROTOCOL.to_string(),
                curve: CURVE.to_string(),
            },
            public_signals: proof
                .public_signals
                .iter()
                .map(std::string::ToString::to_string)
                .collect(),
            metadata: (&proof.metadata).into(),
        }
    }
}

/// Serialize a proof into its canonical JSON wire form.
///
/// # Errors
///
/// Serialization of a well-formed proof cannot fail in practice; any
/// serde_json failure surfaces as `INTERNAL_ERROR`.
pub fn serialize(proof: &MembershipProof) -> Result<String> {
    let envelope = ProofEnvelope::from(proof);
    serde_json::to_string(&envelope).map_err(|e| {
        log::error!("proof serialization failed: {e}");
        MembershipError::Internal
    })
}

/// Reconstruct a proof from a decoded envelope, checking that every curve
/// point is on-curve and in the right subgroup.
///
/// # Errors
///
/// `INVALID_PROOF_STRUCTURE` for unknown protocol/curve tags, malformed
/// points, or malformed public signals.
pub fn decode(envelope: &ProofEnvelope) -> Result<MembershipProof> {
    if envelope.proof.protocol != PROTOCOL {
        return Err(MembershipError::InvalidProofStructure {
            details: vec![format!("unsupported protocol {:?}", envelope.proof.protocol)],
        });
    }
    if envelope.proof.curve != CURVE {
        return Err(MembershipError::InvalidProofStructure {
            details: vec![format!("unsupported curve {:?}", envelope.proof.curve)],
        });
    }
    if envelope.public_signals.is_empty() {
        return Err(MembershipError::InvalidProofStructure {
            details: vec!["publicSignals must not be empty".to_string()],
        });
    }

    let public_signals: Vec<Fr> = envelope
        .public_signals
        .iter()
        .map(|s| field_from_decimal(s))
        .collect::<Result<_>>()?;

    Ok(MembershipProof {
        proof: ark_groth16::Proof {
            a: g1_from_json(&envelope.proof.pi_a, "pi_a")?,
            b: g2_from_json(&envelope.proof.pi_b, "pi_b")?,
            c: g1_from_json(&envelope.proof.pi_c, "pi_c")?,
        },
        public_signals,
        metadata: (&envelope.metadata).into(),
    })
}

/// Parse the canonical wire form back into a proof.
///
/// # Errors
///
/// A parse failure is a non-operational `INVALID_PROOF_STRUCTURE`.
pub fn deserialize(input: &str) -> Result<MembershipProof> {
    let envelope: ProofEnvelope =
        serde_json::from_str(input).map_err(|e| MembershipError::InvalidProofStructure {
            details: vec![e.to_string()],
        })?;
    decode(&envelope)
}

fn is_hex64_value(value: &serde_json::Value) -> bool {
    value
        .as_str()
        .is_some_and(crate::field::is_canonical_hex64)
}

fn is_uuid_value(value: &serde_json::Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| Uuid::parse_str(s).is_ok())
}

fn is_timestamp_value(value: &serde_json::Value) -> bool {
    value.as_str().is_some_and(|s| {
        chrono::NaiveDateTime::parse_from_str(s, ts_millis::FORMAT).is_ok()
    })
}

fn is_proof_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(_) => {
            serde_json::from_value::<Groth16ProofJson>(value.clone()).is_ok()
        }
        serde_json::Value::String(s) => serde_json::from_str::<Groth16ProofJson>(s).is_ok(),
        _ => false,
    }
}

/// Structural validation of a candidate wire proof: presence and primitive
/// type of every field. Never panics, never throws.
#[must_use]
pub fn validate(value: &serde_json::Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    let proof_ok = object.get("proof").is_some_and(is_proof_value);

    let signals_ok = object.get("publicSignals").and_then(|v| v.as_array()).is_some_and(|signals| {
        !signals.is_empty() && signals.iter().all(|s| s.is_string())
    });

    let metadata_ok = object
        .get("metadata")
        .and_then(|m| m.as_object())
        .is_some_and(|metadata| {
            metadata.get("proofId").is_some_and(is_uuid_value)
                && metadata.get("credentialSetId").is_some_and(is_uuid_value)
                && metadata.get("merkleRoot").is_some_and(is_hex64_value)
                && metadata.get("timestamp").is_some_and(is_timestamp_value)
                && metadata.get("expiresAt").is_some_and(is_timestamp_value)
                && metadata.get("version").is_some_and(|v| v.is_string())
                && metadata.get("circuitId").is_some_and(|v| v.is_string())
        });

    proof_ok && signals_ok && metadata_ok
}

// ---------------------------------------------------------------------------
// HTTP payloads. The transport itself lives outside the core; these shapes
// are part of the wire contract.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSetRequest {
    pub name: String,
    pub credentials: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub set_type: Option<CredentialSetType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSetResponse {
    pub id: Uuid,
    pub name: String,
    pub credential_count: usize,
    pub merkle_root: String,
    #[serde(with = "ts_millis")]
    pub created_at: DateTime<Utc>,
    pub version: String,
}

impl From<&CredentialSet> for CreateSetResponse {
    fn from(set: &CredentialSet) -> Self {
        CreateSetResponse {
            id: set.id,
            name: set.name.clone(),
            credential_count: set.credentials.len(),
            merkle_root: set.merkle_root.clone(),
            created_at: set.created_at,
            version: set.version.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProofRequest {
    pub credential_set_id: Uuid,
    pub credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProofResponse {
    pub proof_id: Uuid,
    pub proof: Groth16ProofJson,
    pub public_signals: Vec<String>,
    pub metadata: ProofMetadataJson,
}

impl From<&MembershipProof> for GenerateProofResponse {
    fn from(proof: &MembershipProof) -> Self {
        let envelope = ProofEnvelope::from(proof);
        GenerateProofResponse {
            proof_id: proof.metadata.proof_id,
            proof: envelope.proof,
            public_signals: envelope.public_signals,
            metadata: envelope.metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyProofResponse {
    pub valid: bool,
    #[serde(with = "ts_millis")]
    pub verified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_set_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorCode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<WarningCode>,
}

impl From<&VerificationReport> for VerifyProofResponse {
    fn from(report: &VerificationReport) -> Self {
        VerifyProofResponse {
            valid: report.valid,
            verified_at: report.verified_at,
            credential_set_id: report.credential_set_id,
            errors: report.errors.clone(),
            warnings: report.warnings.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRootRequest {
    pub credential_set_id: Uuid,
    pub merkle_root: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn sample_metadata() -> ProofMetadataJson {
        ProofMetadataJson {
            proof_id: Uuid::new_v4(),
            credential_set_id: Uuid::new_v4(),
            merkle_root: "ab".repeat(32),
            timestamp: now_millis(),
            expires_at: now_millis() + chrono::Duration::hours(24),
            version: "1.0.0".to_string(),
            circuit_id: "credential_membership".to_string(),
        }
    }

    fn sample_proof_json() -> Groth16ProofJson {
        // Generator points of BN254: structurally valid curve points.
        Groth16ProofJson {
            pi_a: ["1".to_string(), "2".to_string(), "1".to_string()],
            pi_b: [
                [
                    "10857046999023057135944570762232829481370756359578518086990519993285655852781"
                        .to_string(),
                    "11559732032986387107991004021392285783925812861821192530917403151452391805634"
                        .to_string(),
                ],
                [
                    "8495653923123431417604973247489272438418190587263600148770280649306958101930"
                        .to_string(),
                    "4082367875863433681332203403145435568316851327593401208105741076214120093531"
                        .to_string(),
                ],
                ["1".to_string(), "0".to_string()],
            ],
            pi_c: ["1".to_string(), "2".to_string(), "1".to_string()],
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
        }
    }

    fn sample_envelope() -> ProofEnvelope {
        ProofEnvelope {
            proof: sample_proof_json(),
            public_signals: vec!["42".to_string()],
            metadata: sample_metadata(),
        }
    }

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = sample_envelope();
        let json = serde_json::to_string(&envelope).unwrap();
        let back: ProofEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_decode_rejects_wrong_protocol() {
        let mut envelope = sample_envelope();
        envelope.proof.protocol = "plonk".to_string();
        let err = decode(&envelope).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidProofStructure);
    }

    #[test]
    fn test_decode_rejects_off_curve_point() {
        let mut envelope = sample_envelope();
        envelope.proof.pi_a = ["1".to_string(), "3".to_string(), "1".to_string()];
        let err = decode(&envelope).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidProofStructure);
    }

    #[test]
    fn test_decode_rejects_projective_z() {
        let mut envelope = sample_envelope();
        envelope.proof.pi_a[2] = "2".to_string();
        assert!(decode(&envelope).is_err());
    }

    #[test]
    fn test_decode_rejects_empty_signals() {
        let mut envelope = sample_envelope();
        envelope.public_signals.clear();
        assert!(decode(&envelope).is_err());
    }

    #[test]
    fn test_decode_roundtrips_points() {
        let envelope = sample_envelope();
        let proof = decode(&envelope).unwrap();
        let back = ProofEnvelope::from(&proof);
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_proof_accepted_as_json_string() {
        let envelope = sample_envelope();
        let mut value = serde_json::to_value(&envelope).unwrap();
        let proof_string = serde_json::to_string(&envelope.proof).unwrap();
        value["proof"] = serde_json::Value::String(proof_string);

        let back: ProofEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(back.proof, envelope.proof);
    }

    #[test]
    fn test_timestamps_keep_millisecond_precision() {
        let metadata = sample_metadata();
        let json = serde_json::to_string(&metadata).unwrap();
        let back: ProofMetadataJson = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestamp, metadata.timestamp);
        assert_eq!(back.expires_at, metadata.expires_at);
    }

    #[test]
    fn test_timestamp_parse_is_strict() {
        let mut value = serde_json::to_value(sample_metadata()).unwrap();
        value["timestamp"] = serde_json::Value::String("2026-08-02 09:30:00".to_string());
        assert!(serde_json::from_value::<ProofMetadataJson>(value).is_err());
    }

    #[test]
    fn test_validate_accepts_canonical_form() {
        let value = serde_json::to_value(sample_envelope()).unwrap();
        assert!(validate(&value));
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut value = serde_json::to_value(sample_envelope()).unwrap();
        value.as_object_mut().unwrap().remove("metadata");
        assert!(!validate(&value));

        let mut value = serde_json::to_value(sample_envelope()).unwrap();
        value["metadata"]
            .as_object_mut()
            .unwrap()
            .remove("merkleRoot");
        assert!(!validate(&value));
    }

    #[test]
    fn test_validate_rejects_bad_types() {
        let mut value = serde_json::to_value(sample_envelope()).unwrap();
        value["publicSignals"] = serde_json::json!([1, 2]);
        assert!(!validate(&value));

        let mut value = serde_json::to_value(sample_envelope()).unwrap();
        value["metadata"]["merkleRoot"] = serde_json::json!("not-hex");
        assert!(!validate(&value));

        assert!(!validate(&serde_json::json!("just a string")));
    }

    #[test]
    fn test_deserialize_reports_structure_error() {
        let err = deserialize("{not json").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidProofStructure);
    }
}
