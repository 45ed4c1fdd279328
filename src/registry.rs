//! In-memory registry of trusted Merkle roots.
//!
//! A root is trusted for a specific credential set; identity is the
//! `(credential_set_id, root)` pair. Entries may carry a wall-clock expiry.
//! Updates are linearisable behind a writer lock; the expected workload is
//! overwhelmingly reads.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{MembershipError, Result};
use crate::field::is_canonical_hex64;

/// A pinned `(credential set, root)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedRootEntry {
    pub credential_set_id: Uuid,
    pub root: String,
    pub added_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

impl TrustedRootEntry {
    /// Entry with no expiry and no metadata.
    #[must_use]
    pub fn new(credential_set_id: Uuid, root: &str) -> Self {
        TrustedRootEntry {
            credential_set_id,
            root: root.to_string(),
            added_at: Utc::now(),
            expires_at: None,
            metadata: None,
        }
    }

    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Registry of roots the verifier will accept.
#[derive(Default)]
pub struct TrustedRootRegistry {
    entries: RwLock<HashMap<Uuid, Vec<TrustedRootEntry>>>,
}

/// Constant-time equality of two canonical hex64 strings. Both inputs are
/// fixed-width, so the scan length leaks nothing.
fn ct_hex_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

impl TrustedRootRegistry {
    #[must_use]
    pub fn new() -> Self {
        TrustedRootRegistry::default()
    }

    /// Pin a root. Returns `false` when the pair was already present (a
    /// duplicate add is a no-op).
    ///
    /// # Errors
    ///
    /// `INVALID_ROOT_FORMAT` unless the root is 64 lowercase hex characters.
    pub fn add(&self, entry: TrustedRootEntry) -> Result<bool> {
        if !is_canonical_hex64(&entry.root) {
            return Err(MembershipError::InvalidRootFormat);
        }

        let mut entries = self.entries.write();
        let roots = entries.entry(entry.credential_set_id).or_default();
        if roots.iter().any(|e| ct_hex_eq(&e.root, &entry.root)) {
            return Ok(false);
        }

        log::info!(
            "trusting root {} for set {}",
            entry.root,
            entry.credential_set_id
        );
        roots.push(entry);
        Ok(true)
    }

    /// `true` iff the pair is registered and not expired.
    #[must_use]
    pub fn is_trusted(&self, credential_set_id: Uuid, root: &str) -> bool {
        let now = Utc::now();
        let entries = self.entries.read();
        let Some(roots) = entries.get(&credential_set_id) else {
            return false;
        };

        // Scan every entry so timing does not depend on where a match sits.
        let mut trusted = false;
        for entry in roots {
            trusted |= ct_hex_eq(&entry.root, root) && !entry.expired_at(now);
        }
        trusted
    }

    /// Remove a pinned root. Returns `true` if it was present.
    pub fn revoke(&self, credential_set_id: Uuid, root: &str) -> bool {
        let mut entries = self.entries.write();
        let Some(roots) = entries.get_mut(&credential_set_id) else {
            return false;
        };

        let before = roots.len();
        roots.retain(|e| !ct_hex_eq(&e.root, root));
        let removed = roots.len() != before;
        if removed {
            log::info!("revoked root {root} for set {credential_set_id}");
        }
        if roots.is_empty() {
            entries.remove(&credential_set_id);
        }
        removed
    }

    /// Total number of pinned roots across all sets.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }

    /// All entries pinned for a set.
    #[must_use]
    pub fn list(&self, credential_set_id: Uuid) -> Vec<TrustedRootEntry> {
        self.entries
            .read()
            .get(&credential_set_id)
            .cloned()
            .unwrap_or_default()
    }
}
