//! Field-level hashing primitives: Poseidon over the BN254 scalar field and
//! the domain-separated string-to-field encoding.
//!
//! The Poseidon parameter table is derived deterministically with
//! [`find_poseidon_ark_and_mds`], so the native hasher and the R1CS gadget
//! always agree. [`init`] forces the derivation once at startup and checks the
//! structural parameters the circuit was compiled against; any mismatch is a
//! hard initialization failure.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::{BigInteger, PrimeField};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{MembershipError, Result};

/// Sponge rate. Two-child Merkle hashing absorbs both inputs in one
/// permutation at this rate.
const POSEIDON_RATE: usize = 3;
const POSEIDON_FULL_ROUNDS: u64 = 8;
const POSEIDON_PARTIAL_ROUNDS: u64 = 56;
const POSEIDON_ALPHA: u64 = 5;

/// Byte width of a serialized field element (and of a hex64 root).
pub const FIELD_BYTES: usize = 32;

static POSEIDON_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

fn derive_config() -> PoseidonConfig<Fr> {
    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        Fr::MODULUS_BIT_SIZE as u64,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        0,
    );

    PoseidonConfig::new(
        POSEIDON_FULL_ROUNDS as usize,
        POSEIDON_PARTIAL_ROUNDS as usize,
        POSEIDON_ALPHA,
        mds,
        ark,
        POSEIDON_RATE,
        1,
    )
}

/// The process-wide Poseidon parameter table.
///
/// Prefer [`init`] at startup; this accessor derives the table on first use so
/// the hash functions themselves stay infallible.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    POSEIDON_CONFIG.get_or_init(derive_config)
}

/// Explicitly initialise the Poseidon parameter table and verify it matches
/// the parameters the circuit was compiled with.
///
/// # Errors
///
/// Returns `CIRCUIT_INITIALIZATION_FAILED` if the derived table does not have
/// the expected round structure.
pub fn init() -> Result<()> {
    let config = poseidon_config();
    if config.full_rounds != POSEIDON_FULL_ROUNDS as usize
        || config.partial_rounds != POSEIDON_PARTIAL_ROUNDS as usize
        || config.alpha != POSEIDON_ALPHA
        || config.rate != POSEIDON_RATE
        || config.capacity != 1
    {
        return Err(MembershipError::CircuitInitializationFailed {
            details: vec!["Poseidon parameters do not match the circuit".to_string()],
        });
    }
    Ok(())
}

/// Poseidon hash of an arbitrary number of field elements.
///
/// Elements are absorbed one at a time; the in-circuit gadget does the same,
/// so both sides compute identical digests.
#[must_use]
pub fn hash_n(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::<Fr>::new(poseidon_config());
    for input in inputs {
        sponge.absorb(input);
    }
    sponge.squeeze_native_field_elements(1)[0]
}

/// Order-sensitive two-to-one Poseidon hash.
#[inline]
#[must_use]
pub fn hash_pair(left: Fr, right: Fr) -> Fr {
    hash_n(&[left, right])
}

/// Order-canonicalised two-to-one Poseidon hash: the smaller element always
/// hashes on the left. Merkle paths built this way need no left/right
/// indicator to verify.
#[inline]
#[must_use]
pub fn hash_sorted_pair(a: Fr, b: Fr) -> Fr {
    if a <= b {
        hash_pair(a, b)
    } else {
        hash_pair(b, a)
    }
}

/// Encode a credential string as a field element: SHA-256 over the UTF-8
/// bytes, interpreted big-endian and reduced modulo the field prime.
#[must_use]
pub fn str_to_field(s: &str) -> Fr {
    let digest = Sha256::digest(s.as_bytes());
    Fr::from_be_bytes_mod_order(&digest)
}

/// Big-endian, zero-padded 32-byte representation of a field element.
#[must_use]
pub fn field_to_bytes(value: &Fr) -> [u8; FIELD_BYTES] {
    let repr = value.into_bigint().to_bytes_be();
    let mut bytes = [0u8; FIELD_BYTES];
    bytes[FIELD_BYTES - repr.len()..].copy_from_slice(&repr);
    bytes
}

/// Fixed-width wire form: 64 lowercase hex nibbles, big-endian, zero-padded.
#[must_use]
pub fn field_to_hex(value: &Fr) -> String {
    hex::encode(field_to_bytes(value))
}

/// `true` iff `s` is exactly 64 lowercase hex nibbles.
#[must_use]
pub fn is_canonical_hex64(s: &str) -> bool {
    s.len() == 64
        && s.chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Parse the canonical hex64 wire form back into a field element.
///
/// # Errors
///
/// Returns `INVALID_ROOT_FORMAT` for wrong length, non-lowercase-hex input,
/// or a value outside the field.
pub fn field_from_hex(s: &str) -> Result<Fr> {
    if !is_canonical_hex64(s) {
        return Err(MembershipError::InvalidRootFormat);
    }
    let bytes = hex::decode(s).map_err(|_| MembershipError::InvalidRootFormat)?;
    let value = Fr::from_be_bytes_mod_order(&bytes);
    // A value >= p silently wraps in from_be_bytes_mod_order; round-tripping
    // detects that without reaching into bigint internals.
    if field_to_hex(&value) != s {
        return Err(MembershipError::InvalidRootFormat);
    }
    Ok(value)
}

/// Decimal-string form used for circuit public signals.
#[must_use]
pub fn field_to_decimal(value: &Fr) -> String {
    value.to_string()
}

/// Parse a decimal-string field element.
///
/// # Errors
///
/// Returns `INVALID_PROOF_STRUCTURE` if the string is not a decimal integer.
pub fn field_from_decimal(s: &str) -> Result<Fr> {
    Fr::from_str(s).map_err(|_| MembershipError::InvalidProofStructure {
        details: vec![format!("not a decimal field element: {s:?}")],
    })
}

/// Constant-time comparison of two 32-byte arrays.
///
/// The comparison always visits every byte regardless of where the arrays
/// differ, so timing reveals nothing about hash values.
#[inline]
#[must_use]
pub fn constant_time_eq(a: &[u8; FIELD_BYTES], b: &[u8; FIELD_BYTES]) -> bool {
    let mut result = 0u8;
    for i in 0..FIELD_BYTES {
        result |= a[i] ^ b[i];
    }
    result == 0
}

/// Constant-time equality of two field elements via their canonical bytes.
#[inline]
#[must_use]
pub fn ct_field_eq(a: &Fr, b: &Fr) -> bool {
    constant_time_eq(&field_to_bytes(a), &field_to_bytes(b))
}
