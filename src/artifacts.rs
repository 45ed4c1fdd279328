//! Circuit artifact lifecycle: the proving key and the verification key.
//!
//! Artifacts are produced once by the `setup` binary (a circuit-specific
//! trusted setup), loaded here at startup, held for the process lifetime and
//! released by [`CircuitArtifacts::shutdown`]. Lazy implicit loading is
//! deliberately not offered.
//!
//! On disk a circuit is a directory `<circuits_path>/<name>/` holding
//! `proving_key.bin` (canonical compressed form) and `verification_key.json`
//! (the snarkjs layout, so the key stays preservable for on-chain use).

use ark_bn254::Bn254;
use ark_groth16::{prepare_verifying_key, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use zeroize::Zeroizing;

use crate::codec::{g1_from_json, g1_to_json, g2_from_json, g2_to_json, CURVE, PROTOCOL};
use crate::config::Config;
use crate::error::{MembershipError, Result};
use crate::field;

pub const PROVING_KEY_FILE: &str = "proving_key.bin";
pub const VERIFICATION_KEY_FILE: &str = "verification_key.json";

/// Number of public inputs the membership circuit exposes (the root).
pub const N_PUBLIC: usize = 1;

/// Groth16 verification key in the snarkjs JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKeyJson {
    pub protocol: String,
    pub curve: String,
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    pub vk_alpha_1: [String; 3],
    pub vk_beta_2: [[String; 2]; 3],
    pub vk_gamma_2: [[String; 2]; 3],
    pub vk_delta_2: [[String; 2]; 3],
    #[serde(rename = "IC")]
    pub ic: Vec<[String; 3]>,
}

impl VerificationKeyJson {
    #[must_use]
    pub fn from_ark(vk: &VerifyingKey<Bn254>) -> Self {
        VerificationKeyJson {
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
            n_public: vk.gamma_abc_g1.len() - 1,
            vk_alpha_1: g1_to_json(&vk.alpha_g1),
            vk_beta_2: g2_to_json(&vk.beta_g2),
            vk_gamma_2: g2_to_json(&vk.gamma_g2),
            vk_delta_2: g2_to_json(&vk.delta_g2),
            ic: vk.gamma_abc_g1.iter().map(g1_to_json).collect(),
        }
    }

    /// Reconstruct the arkworks key, validating the protocol tags and every
    /// curve point.
    ///
    /// # Errors
    ///
    /// `CIRCUIT_INITIALIZATION_FAILED` on any mismatch or malformed point.
    pub fn to_ark(&self) -> Result<VerifyingKey<Bn254>> {
        let fail = |detail: String| MembershipError::CircuitInitializationFailed {
            details: vec![detail],
        };

        if self.protocol != PROTOCOL {
            return Err(fail(format!("unsupported protocol {:?}", self.protocol)));
        }
        if self.curve != CURVE {
            return Err(fail(format!("unsupported curve {:?}", self.curve)));
        }
        if self.n_public != N_PUBLIC {
            return Err(fail(format!(
                "expected nPublic = {N_PUBLIC}, got {}",
                self.n_public
            )));
        }
        if self.ic.len() != self.n_public + 1 {
            return Err(fail(format!(
                "IC must hold nPublic + 1 = {} points, got {}",
                self.n_public + 1,
                self.ic.len()
            )));
        }

        let map_point = |e: MembershipError| fail(e.details().join("; "));

        Ok(VerifyingKey {
            alpha_g1: g1_from_json(&self.vk_alpha_1, "vk_alpha_1").map_err(map_point)?,
            beta_g2: g2_from_json(&self.vk_beta_2, "vk_beta_2").map_err(map_point)?,
            gamma_g2: g2_from_json(&self.vk_gamma_2, "vk_gamma_2").map_err(map_point)?,
            delta_g2: g2_from_json(&self.vk_delta_2, "vk_delta_2").map_err(map_point)?,
            gamma_abc_g1: self
                .ic
                .iter()
                .enumerate()
                .map(|(i, p)| g1_from_json(p, &format!("IC[{i}]")).map_err(map_point))
                .collect::<Result<_>>()?,
        })
    }
}

/// Loaded circuit artifacts, shared read-only across prover and verifier.
#[derive(Debug)]
pub struct CircuitArtifacts {
    circuit_id: String,
    proving_key: ProvingKey<Bn254>,
    verifying_key: VerifyingKey<Bn254>,
    prepared_vk: PreparedVerifyingKey<Bn254>,
}

impl CircuitArtifacts {
    /// Load the artifacts named by the configuration.
    ///
    /// # Errors
    ///
    /// - `CIRCUIT_NOT_FOUND` when the circuit directory does not exist.
    /// - `VERIFICATION_KEY_NOT_FOUND` when the verification key file is
    ///   missing.
    /// - `CIRCUIT_INITIALIZATION_FAILED` for any missing or malformed
    ///   artifact, or a verification key that does not belong to the proving
    ///   key.
    pub fn init(config: &Config) -> Result<Self> {
        field::init()?;

        let dir = config.circuit.circuits_path.join(&config.circuit.name);
        if !dir.is_dir() {
            return Err(MembershipError::CircuitNotFound(config.circuit.name.clone()));
        }

        let pk_path = dir.join(PROVING_KEY_FILE);
        let pk_bytes = Zeroizing::new(fs::read(&pk_path).map_err(|e| {
            MembershipError::CircuitInitializationFailed {
                details: vec![format!("cannot read {}: {e}", pk_path.display())],
            }
        })?);
        let proving_key =
            ProvingKey::<Bn254>::deserialize_compressed(&pk_bytes[..]).map_err(|e| {
                MembershipError::CircuitInitializationFailed {
                    details: vec![format!("malformed proving key: {e}")],
                }
            })?;

        let vk_path = dir.join(VERIFICATION_KEY_FILE);
        if !vk_path.is_file() {
            return Err(MembershipError::VerificationKeyNotFound);
        }
        let vk_text = fs::read_to_string(&vk_path).map_err(|e| {
            MembershipError::CircuitInitializationFailed {
                details: vec![format!("cannot read {}: {e}", vk_path.display())],
            }
        })?;
        let vk_json: VerificationKeyJson = serde_json::from_str(&vk_text).map_err(|e| {
            MembershipError::CircuitInitializationFailed {
                details: vec![format!("malformed verification key: {e}")],
            }
        })?;
        let verifying_key = vk_json.to_ark()?;

        // The loaded key must be the one embedded in the proving key, or the
        // verifier would accept proofs from a different setup.
        if VerificationKeyJson::from_ark(&proving_key.vk) != vk_json {
            return Err(MembershipError::CircuitInitializationFailed {
                details: vec!["verification key does not match the proving key".to_string()],
            });
        }

        let prepared_vk = prepare_verifying_key(&verifying_key);
        log::info!(
            "loaded circuit '{}' from {}",
            config.circuit.name,
            dir.display()
        );

        Ok(CircuitArtifacts {
            circuit_id: config.circuit.name.clone(),
            proving_key,
            verifying_key,
            prepared_vk,
        })
    }

    /// Wrap freshly generated parameters without touching the filesystem.
    /// Used by the setup path and by embedders that run their own setup.
    #[must_use]
    pub fn from_parts(circuit_id: &str, proving_key: ProvingKey<Bn254>) -> Self {
        let verifying_key = proving_key.vk.clone();
        let prepared_vk = prepare_verifying_key(&verifying_key);
        CircuitArtifacts {
            circuit_id: circuit_id.to_string(),
            proving_key,
            verifying_key,
            prepared_vk,
        }
    }

    /// Write this circuit's artifacts into `dir`.
    ///
    /// # Errors
    ///
    /// Filesystem and serialization failures map to
    /// `CIRCUIT_INITIALIZATION_FAILED`.
    pub fn write_artifacts(&self, dir: &Path) -> Result<()> {
        let fail = |detail: String| MembershipError::CircuitInitializationFailed {
            details: vec![detail],
        };

        fs::create_dir_all(dir).map_err(|e| fail(format!("cannot create {}: {e}", dir.display())))?;

        let mut pk_bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut pk_bytes)
            .map_err(|e| fail(format!("cannot serialize proving key: {e}")))?;
        let pk_bytes = Zeroizing::new(pk_bytes);
        fs::write(dir.join(PROVING_KEY_FILE), &pk_bytes[..])
            .map_err(|e| fail(format!("cannot write proving key: {e}")))?;

        let vk_json = VerificationKeyJson::from_ark(&self.verifying_key);
        let vk_text = serde_json::to_string_pretty(&vk_json)
            .map_err(|e| fail(format!("cannot serialize verification key: {e}")))?;
        fs::write(dir.join(VERIFICATION_KEY_FILE), vk_text)
            .map_err(|e| fail(format!("cannot write verification key: {e}")))?;

        Ok(())
    }

    #[must_use]
    pub fn circuit_id(&self) -> &str {
        &self.circuit_id
    }

    #[must_use]
    pub fn proving_key(&self) -> &ProvingKey<Bn254> {
        &self.proving_key
    }

    #[must_use]
    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.verifying_key
    }

    #[must_use]
    pub fn prepared_vk(&self) -> &PreparedVerifyingKey<Bn254> {
        &self.prepared_vk
    }

    /// Release the loaded key material. Dropping the keys frees the curve
    /// points; the transient on-disk buffers were zeroized during load.
    pub fn shutdown(self) {
        log::info!("circuit '{}' shut down", self.circuit_id);
        drop(self);
    }
}
