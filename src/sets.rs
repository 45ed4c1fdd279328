//! Credential set management: named, immutable collections of credential
//! strings with a derived Merkle commitment.
//!
//! The catalogue sits behind a reader/writer lock; creation and deletion
//! exclude readers, witness generation and lookups proceed in parallel.

use ark_bn254::Fr;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{MembershipError, Result};
use crate::field::{ct_field_eq, field_to_hex, str_to_field};
use crate::merkle::{MerkleTree, MerkleWitness};
use crate::{MAX_CREDENTIAL_BYTES, SET_VERSION};

/// Kind tag for a credential set. Data, not behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSetType {
    Universities,
    Companies,
    Certifications,
    #[default]
    Custom,
}

/// Public metadata of a credential set. Immutable once created.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub set_type: CredentialSetType,
    pub credentials: Arc<[String]>,
    pub merkle_root: String,
    pub created_at: DateTime<Utc>,
    pub version: String,
}

struct SetRecord {
    info: CredentialSet,
    tree: MerkleTree,
    index: HashMap<String, usize>,
}

/// Owns every named credential set in the process.
pub struct SetManager {
    max_credentials: usize,
    sets: RwLock<HashMap<Uuid, SetRecord>>,
}

fn validate_credentials(credentials: &[String], max: usize) -> Result<()> {
    if credentials.is_empty() {
        return Err(MembershipError::Validation {
            details: vec!["a credential set needs at least one credential".to_string()],
        });
    }
    if credentials.len() > max {
        return Err(MembershipError::CredentialLimitExceeded { max });
    }

    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(credentials.len());
    for (i, credential) in credentials.iter().enumerate() {
        if credential.trim().is_empty() {
            return Err(MembershipError::InvalidCredential {
                details: vec![format!("credential at index {i} is empty")],
            });
        }
        if credential.len() > MAX_CREDENTIAL_BYTES {
            return Err(MembershipError::InvalidCredential {
                details: vec![format!(
                    "credential at index {i} exceeds {MAX_CREDENTIAL_BYTES} bytes"
                )],
            });
        }
        if let Some(first) = seen.insert(credential.as_str(), i) {
            return Err(MembershipError::DuplicateCredential {
                details: vec![format!("indices {first} and {i} hold the same credential")],
            });
        }
    }

    Ok(())
}

impl SetManager {
    #[must_use]
    pub fn new(max_credentials: usize) -> Self {
        SetManager {
            max_credentials,
            sets: RwLock::new(HashMap::new()),
        }
    }

    /// Create a set, build its tree and return the stored metadata.
    ///
    /// # Errors
    ///
    /// Rejects empty names, empty/oversized/duplicate credentials and
    /// oversized sets.
    pub fn create(
        &self,
        name: &str,
        credentials: Vec<String>,
        description: Option<String>,
        set_type: Option<CredentialSetType>,
    ) -> Result<CredentialSet> {
        if name.trim().is_empty() {
            return Err(MembershipError::Validation {
                details: vec!["set name must not be empty".to_string()],
            });
        }
        validate_credentials(&credentials, self.max_credentials)?;

        let leaves: Vec<Fr> = credentials.iter().map(|c| str_to_field(c)).collect();
        let tree = MerkleTree::new(leaves)?;

        let index: HashMap<String, usize> = credentials
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        let info = CredentialSet {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            description,
            set_type: set_type.unwrap_or_default(),
            credentials: credentials.into(),
            merkle_root: field_to_hex(&tree.root()),
            created_at: Utc::now(),
            version: SET_VERSION.to_string(),
        };

        log::info!(
            "created credential set {} ({} credentials, root {})",
            info.id,
            info.credentials.len(),
            info.merkle_root
        );

        let result = info.clone();
        self.sets.write().insert(
            info.id,
            SetRecord {
                info,
                tree,
                index,
            },
        );

        Ok(result)
    }

    /// Produce an inclusion witness for `credential` within the named set.
    ///
    /// # Errors
    ///
    /// An unknown set is `CREDENTIAL_SET_NOT_FOUND`; a credential absent from
    /// a known set is the generic `CREDENTIAL_NOT_FOUND` that does not reveal
    /// anything about the set's contents.
    pub fn generate_witness(&self, set_id: Uuid, credential: &str) -> Result<MerkleWitness> {
        let sets = self.sets.read();
        let record = sets
            .get(&set_id)
            .ok_or(MembershipError::CredentialSetNotFound)?;

        let leaf_index = *record
            .index
            .get(credential)
            .ok_or(MembershipError::CredentialNotFound)?;

        record.tree.witness(leaf_index)
    }

    /// Verify a witness against the stored root of the named set, then run
    /// the static Merkle check.
    ///
    /// # Errors
    ///
    /// Unknown set ids are `CREDENTIAL_SET_NOT_FOUND`.
    pub fn verify_witness(&self, set_id: Uuid, witness: &MerkleWitness) -> Result<bool> {
        let sets = self.sets.read();
        let record = sets
            .get(&set_id)
            .ok_or(MembershipError::CredentialSetNotFound)?;

        let roots_match = ct_field_eq(&witness.root, &record.tree.root());
        Ok(roots_match && MerkleTree::verify_witness(witness))
    }

    /// Root of the named set as a field element.
    pub fn root_of(&self, set_id: Uuid) -> Result<Fr> {
        let sets = self.sets.read();
        sets.get(&set_id)
            .map(|record| record.tree.root())
            .ok_or(MembershipError::CredentialSetNotFound)
    }

    #[must_use]
    pub fn get(&self, set_id: Uuid) -> Option<CredentialSet> {
        self.sets.read().get(&set_id).map(|r| r.info.clone())
    }

    #[must_use]
    pub fn list(&self) -> Vec<CredentialSet> {
        self.sets.read().values().map(|r| r.info.clone()).collect()
    }

    /// Remove a set entirely. Returns `true` if it existed.
    pub fn delete(&self, set_id: Uuid) -> bool {
        let removed = self.sets.write().remove(&set_id).is_some();
        if removed {
            log::info!("deleted credential set {set_id}");
        }
        removed
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.sets.read().len()
    }
}
