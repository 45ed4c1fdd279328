//! Merkle tree over credential field elements using sorted-pair Poseidon
//! hashing.
//!
//! The in-memory tree is compact: internal layers are built until a single
//! root remains and an odd last node is promoted to the next layer unchanged.
//! Witnesses are nevertheless always emitted with the circuit's fixed depth
//! of [`TREE_DEPTH`] levels: a promoted layer and a padding layer are both
//! encoded as a zero-valued sibling, and both the off-chain fold and the
//! circuit skip such levels. Every genuine sibling is a Poseidon or SHA-256
//! image, so the zero sentinel never collides with real data.

use ark_bn254::Fr;
use ark_ff::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MembershipError, Result};
use crate::field::{ct_field_eq, field_to_hex, hash_sorted_pair};
use crate::TREE_DEPTH;

const MAX_LEAVES: usize = 1 << TREE_DEPTH;

/// Which side of the running hash a sibling sits on.
///
/// With sorted-pair hashing the fold ignores this; it exists for the circuit,
/// which consumes one direction bit per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingPosition {
    Left,
    Right,
}

/// One level of a Merkle inclusion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessNode {
    pub hash: Fr,
    pub position: SiblingPosition,
}

/// A Merkle inclusion witness with exactly [`TREE_DEPTH`] levels.
///
/// `path_indices[i]` is 1 when the sibling at level `i` sits on the left and
/// 0 otherwise; the bits mirror `siblings[i].position` and are what the
/// circuit consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleWitness {
    pub leaf: Fr,
    pub leaf_index: usize,
    pub root: Fr,
    pub siblings: Vec<WitnessNode>,
    pub path_indices: Vec<u8>,
}

impl fmt::Display for MerkleWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MerkleWitness:\n  Leaf: {}\n  Root: {}\n  Index: {}\n  Levels: {}",
            field_to_hex(&self.leaf),
            field_to_hex(&self.root),
            self.leaf_index,
            self.siblings.len()
        )
    }
}

/// Compact sorted-pair Poseidon Merkle tree.
///
/// All layers are retained so witness extraction is O(log n) hashing instead
/// of an O(n) rebuild per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Fr>>,
}

fn compute_next_level(level: &[Fr]) -> Vec<Fr> {
    let mut result = Vec::with_capacity(level.len() / 2 + level.len() % 2);
    for chunk in level.chunks_exact(2) {
        result.push(hash_sorted_pair(chunk[0], chunk[1]));
    }
    if let Some(promoted) = level.chunks_exact(2).remainder().first() {
        result.push(*promoted);
    }
    result
}

impl MerkleTree {
    /// Build a tree from pre-encoded leaves.
    ///
    /// # Errors
    ///
    /// Rejects an empty leaf list and more than `2^TREE_DEPTH` leaves.
    pub fn new(leaves: Vec<Fr>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(MembershipError::Validation {
                details: vec!["cannot build a Merkle tree with no leaves".to_string()],
            });
        }
        if leaves.len() > MAX_LEAVES {
            return Err(MembershipError::Validation {
                details: vec![format!(
                    "{} leaves exceed the circuit capacity of {} (2^{})",
                    leaves.len(),
                    MAX_LEAVES,
                    TREE_DEPTH
                )],
            });
        }

        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let next = compute_next_level(&levels[levels.len() - 1]);
            levels.push(next);
        }

        Ok(MerkleTree { levels })
    }

    #[must_use]
    pub fn root(&self) -> Fr {
        self.levels[self.levels.len() - 1][0]
    }

    #[must_use]
    pub fn leaves(&self) -> &[Fr] {
        &self.levels[0]
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Depth of the compact tree (0 for a single leaf).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Extract an inclusion witness for the leaf at `leaf_index`, padded to
    /// [`TREE_DEPTH`] levels with zero sentinels.
    ///
    /// Positions and path indices are derived from value order (sibling on
    /// the left iff it is the smaller element), which is the order the
    /// sorted-pair circuit reproduces.
    ///
    /// # Errors
    ///
    /// Rejects an out-of-range leaf index.
    pub fn witness(&self, leaf_index: usize) -> Result<MerkleWitness> {
        if leaf_index >= self.leaf_count() {
            return Err(MembershipError::Validation {
                details: vec![format!(
                    "leaf index {} out of range for {} leaves",
                    leaf_index,
                    self.leaf_count()
                )],
            });
        }

        let mut siblings = Vec::with_capacity(TREE_DEPTH);
        let mut path_indices = Vec::with_capacity(TREE_DEPTH);
        let mut index = leaf_index;

        for level in &self.levels[..self.levels.len() - 1] {
            let current = level[index];
            let sibling_index = index ^ 1;

            if sibling_index < level.len() {
                let sibling = level[sibling_index];
                let position = if sibling <= current {
                    SiblingPosition::Left
                } else {
                    SiblingPosition::Right
                };
                path_indices.push(u8::from(position == SiblingPosition::Left));
                siblings.push(WitnessNode {
                    hash: sibling,
                    position,
                });
            } else {
                // Last node of an odd layer: promoted, no sibling.
                siblings.push(WitnessNode {
                    hash: Fr::zero(),
                    position: SiblingPosition::Right,
                });
                path_indices.push(0);
            }

            index /= 2;
        }

        while siblings.len() < TREE_DEPTH {
            siblings.push(WitnessNode {
                hash: Fr::zero(),
                position: SiblingPosition::Right,
            });
            path_indices.push(0);
        }

        Ok(MerkleWitness {
            leaf: self.levels[0][leaf_index],
            leaf_index,
            root: self.root(),
            siblings,
            path_indices,
        })
    }

    /// Fold a sibling path from a leaf, skipping zero sentinels.
    #[must_use]
    pub fn fold_path(leaf: Fr, siblings: &[WitnessNode]) -> Fr {
        let mut current = leaf;
        for node in siblings {
            if node.hash.is_zero() {
                continue;
            }
            current = hash_sorted_pair(current, node.hash);
        }
        current
    }

    /// Statically verify a witness against the root it carries.
    ///
    /// The full fold is always computed and the final comparison is
    /// constant-time, so timing reveals nothing about where a bad witness
    /// diverges.
    #[must_use]
    pub fn verify_witness(witness: &MerkleWitness) -> bool {
        if witness.path_indices.len() != witness.siblings.len() {
            return false;
        }
        let computed = Self::fold_path(witness.leaf, &witness.siblings);
        ct_field_eq(&computed, &witness.root)
    }
}
