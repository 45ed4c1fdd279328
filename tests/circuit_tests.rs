//! Constraint-level checks of the membership circuit. These exercise the
//! R1CS directly and stay fast; the Groth16 end-to-end path lives in
//! `integration_test.rs`.

use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use zkp_credential_membership::circuit::MembershipCircuit;
use zkp_credential_membership::field::str_to_field;
use zkp_credential_membership::merkle::MerkleTree;
use zkp_credential_membership::TREE_DEPTH;

fn tree_for(credentials: &[&str]) -> MerkleTree {
    let leaves: Vec<Fr> = credentials.iter().map(|c| str_to_field(c)).collect();
    MerkleTree::new(leaves).unwrap()
}

fn satisfied(circuit: MembershipCircuit) -> bool {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit.generate_constraints(cs.clone()).unwrap();
    cs.is_satisfied().unwrap()
}

#[test]
fn test_valid_witness_satisfies_circuit() {
    let tree = tree_for(&["MIT", "Stanford", "Harvard", "Berkeley"]);
    let witness = tree.witness(2).unwrap();
    let circuit = MembershipCircuit::from_witness("Harvard", &witness);
    assert!(satisfied(circuit));
}

#[test]
fn test_every_index_satisfies_circuit() {
    let credentials = ["a", "b", "c", "d", "e", "f"];
    let tree = tree_for(&credentials);
    for (i, credential) in credentials.iter().enumerate() {
        let witness = tree.witness(i).unwrap();
        let circuit = MembershipCircuit::from_witness(credential, &witness);
        assert!(satisfied(circuit), "index {i}");
    }
}

#[test]
fn test_single_leaf_all_padding_satisfies() {
    let tree = tree_for(&["only"]);
    let witness = tree.witness(0).unwrap();
    let circuit = MembershipCircuit::from_witness("only", &witness);
    assert!(satisfied(circuit));
}

#[test]
fn test_promoted_leaf_satisfies() {
    // Three leaves: index 2 is promoted through the first layer.
    let tree = tree_for(&["x", "y", "z"]);
    let witness = tree.witness(2).unwrap();
    let circuit = MembershipCircuit::from_witness("z", &witness);
    assert!(satisfied(circuit));
}

#[test]
fn test_wrong_root_unsatisfied() {
    let tree = tree_for(&["MIT", "Stanford", "Harvard", "Berkeley"]);
    let witness = tree.witness(0).unwrap();

    let mut circuit = MembershipCircuit::from_witness("MIT", &witness);
    circuit.root = Some(witness.root + Fr::from(1u64));
    assert!(!satisfied(circuit));
}

#[test]
fn test_wrong_credential_unsatisfied() {
    let tree = tree_for(&["MIT", "Stanford", "Harvard", "Berkeley"]);
    let witness = tree.witness(0).unwrap();

    let circuit = MembershipCircuit::from_witness("Oxford", &witness);
    assert!(!satisfied(circuit));
}

#[test]
fn test_tampered_sibling_unsatisfied() {
    let tree = tree_for(&["MIT", "Stanford", "Harvard", "Berkeley"]);
    let witness = tree.witness(0).unwrap();

    let mut circuit = MembershipCircuit::from_witness("MIT", &witness);
    let (sibling, _) = circuit.path[0];
    circuit.path[0].0 = Some(sibling.unwrap() + Fr::from(1u64));
    assert!(!satisfied(circuit));
}

#[test]
fn test_flipped_direction_bit_unsatisfied() {
    let tree = tree_for(&["MIT", "Stanford", "Harvard", "Berkeley"]);
    let witness = tree.witness(0).unwrap();

    let mut circuit = MembershipCircuit::from_witness("MIT", &witness);
    let (_, on_left) = circuit.path[0];
    circuit.path[0].1 = Some(!on_left.unwrap());
    assert!(!satisfied(circuit));
}

#[test]
fn test_fake_padding_unsatisfied() {
    // Swapping a real sibling for the zero sentinel skips a required level.
    let tree = tree_for(&["MIT", "Stanford", "Harvard", "Berkeley"]);
    let witness = tree.witness(0).unwrap();

    let mut circuit = MembershipCircuit::from_witness("MIT", &witness);
    circuit.path[0].0 = Some(Fr::from(0u64));
    assert!(!satisfied(circuit));
}

#[test]
fn test_wrong_path_length_rejected() {
    let tree = tree_for(&["MIT", "Stanford"]);
    let witness = tree.witness(0).unwrap();

    let mut circuit = MembershipCircuit::from_witness("MIT", &witness);
    circuit.path.truncate(TREE_DEPTH - 1);

    let cs = ConstraintSystem::<Fr>::new_ref();
    assert!(circuit.generate_constraints(cs).is_err());
}

#[test]
fn test_blank_circuit_is_satisfiable() {
    // Parameter generation synthesizes the blank instance; it must satisfy
    // its own constraints.
    assert!(satisfied(MembershipCircuit::blank()));
}
