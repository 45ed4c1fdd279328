//! R1CS membership circuit for Groth16 over BN254.
//!
//! The statement: the prover knows a credential field element and a sibling
//! path of [`TREE_DEPTH`] levels that fold to the public Merkle root. Each
//! level carries a direction bit choosing which side the sibling hashes on;
//! the set manager emits those bits from value order so honest witnesses
//! reproduce the sorted-pair tree. A zero-valued sibling marks a promoted or
//! padding level and leaves the running hash unchanged, mirroring the
//! off-chain fold.
//!
//! The root is the circuit's only public input, so `publicSignals[0]` of a
//! generated proof is exactly the off-chain root the trust registry stores.

use ark_bn254::{Bn254, Fr};
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_ff::Zero;
use ark_groth16::{Groth16, ProvingKey};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use ark_std::rand::RngCore;

use crate::field::{poseidon_config, str_to_field};
use crate::merkle::{MerkleWitness, SiblingPosition};
use crate::TREE_DEPTH;

// Absorbs element-wise to stay bit-for-bit compatible with the native
// hasher in `field::hash_n`.
fn poseidon_hash_var(
    cs: ConstraintSystemRef<Fr>,
    params: &PoseidonConfig<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::<Fr>::new(cs, params);
    for input in inputs {
        sponge.absorb(input)?;
    }
    let mut output = sponge.squeeze_field_elements(1)?;
    Ok(output.remove(0))
}

/// Set-membership circuit with a fixed path depth of [`TREE_DEPTH`].
///
/// `path[i]` is `(sibling, sibling_on_left)`; both are private witnesses.
#[derive(Clone, Debug)]
pub struct MembershipCircuit {
    pub root: Option<Fr>,
    pub credential: Option<Fr>,
    pub path: Vec<(Option<Fr>, Option<bool>)>,
    pub poseidon: PoseidonConfig<Fr>,
}

impl MembershipCircuit {
    /// Circuit instance for a real witness, ready for proving. Witnesses
    /// shorter than [`TREE_DEPTH`] are padded with zero-sentinel levels.
    #[must_use]
    pub fn from_witness(credential: &str, witness: &MerkleWitness) -> Self {
        let mut path: Vec<(Option<Fr>, Option<bool>)> = witness
            .siblings
            .iter()
            .map(|node| {
                (
                    Some(node.hash),
                    Some(node.position == SiblingPosition::Left),
                )
            })
            .collect();
        path.resize(TREE_DEPTH, (Some(Fr::zero()), Some(false)));

        MembershipCircuit {
            root: Some(witness.root),
            credential: Some(str_to_field(credential)),
            path,
            poseidon: poseidon_config().clone(),
        }
    }

    /// All-zero instance used for parameter generation. A zero sibling is the
    /// padding sentinel, so the blank path folds the credential straight to
    /// the root and the constraint system is satisfiable.
    #[must_use]
    pub fn blank() -> Self {
        let zero = Fr::zero();
        MembershipCircuit {
            root: Some(zero),
            credential: Some(zero),
            path: vec![(Some(zero), Some(false)); TREE_DEPTH],
            poseidon: poseidon_config().clone(),
        }
    }
}

impl ConstraintSynthesizer<Fr> for MembershipCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        if self.path.len() != TREE_DEPTH {
            return Err(SynthesisError::Unsatisfiable);
        }

        let root = FpVar::new_input(cs.clone(), || {
            self.root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let credential = FpVar::new_witness(cs.clone(), || {
            self.credential.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let zero = FpVar::<Fr>::zero();
        let mut current = credential;

        for (sibling_value, on_left_value) in self.path {
            let sibling = FpVar::new_witness(cs.clone(), || {
                sibling_value.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let sibling_on_left = Boolean::new_witness(cs.clone(), || {
                on_left_value.ok_or(SynthesisError::AssignmentMissing)
            })?;

            let left = sibling_on_left.select(&sibling, &current)?;
            let right = sibling_on_left.select(&current, &sibling)?;
            let parent = poseidon_hash_var(cs.clone(), &self.poseidon, &[left, right])?;

            let is_padding = sibling.is_eq(&zero)?;
            current = is_padding.select(&current, &parent)?;
        }

        current.enforce_equal(&root)?;
        Ok(())
    }
}

/// One-time circuit-specific Groth16 parameter generation.
///
/// # Errors
///
/// Propagates constraint-synthesis failures from the underlying setup.
pub fn generate_parameters<R: RngCore>(rng: &mut R) -> Result<ProvingKey<Bn254>, SynthesisError> {
    Groth16::<Bn254>::generate_random_parameters_with_reduction(MembershipCircuit::blank(), rng)
}
