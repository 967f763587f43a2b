use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

pub const DEFAULT_BLOCK_BITS: usize = 2048;

const HASH_BITS: usize = 256;

/// Reproduces the padded hash a provider signs over to produce a valid
/// consent response.
///
/// The block is `padding || sha256(message || inner_salt)` where the padding
/// is a chain of counter-indexed digests of the initial salt, and the whole
/// block is reduced modulo the provider's RSA modulus so that raw
/// exponentiation over it is well defined. Output width is always exactly
/// `block_bits / 8` bytes, left-zero-padded, regardless of modulus bit-length.
pub fn build_padded_hash(
    message: &str,
    initial_salt: &str,
    request_id: &str,
    modulus: &BigUint,
    block_bits: usize,
) -> Result<Vec<u8>> {
    if block_bits % 8 != 0 || block_bits <= HASH_BITS {
        return Err(Error::InvalidBlockBits(block_bits));
    }
    if modulus.bits() == 0 {
        return Err(Error::InvalidModulus);
    }

    let inner_salt = Sha256::digest([request_id.as_bytes(), initial_salt.as_bytes()].concat());
    let msg_hash = Sha256::digest([message.as_bytes(), inner_salt.as_slice()].concat());

    let pad_len = (block_bits - HASH_BITS) / 8;
    let mut padding = Vec::with_capacity(pad_len + 31);
    let mut counter = 1u32;
    while padding.len() < pad_len {
        let chunk = Sha256::digest([initial_salt.as_bytes(), counter.to_string().as_bytes()].concat());
        padding.extend_from_slice(&chunk);
        counter += 1;
    }
    padding.truncate(pad_len);

    let mut block = padding;
    block.extend_from_slice(&msg_hash);
    let reduced = BigUint::from_bytes_be(&block) % modulus;
    Ok(to_fixed_width_be(&reduced, block_bits / 8))
}

/// Same as [`build_padded_hash`], base64-encoded the way the envelope
/// carries it.
pub fn build_padded_hash_b64(
    message: &str,
    initial_salt: &str,
    request_id: &str,
    modulus: &BigUint,
    block_bits: usize,
) -> Result<String> {
    Ok(BASE64.encode(build_padded_hash(message, initial_salt, request_id, modulus, block_bits)?))
}

/// Raw RSA "public decrypt": plain modular exponentiation of the signature
/// with no additional padding scheme, re-encoded at the width of `out_len`
/// bytes.
pub fn public_decrypt(signature: &[u8], exponent: &BigUint, modulus: &BigUint, out_len: usize) -> Result<Vec<u8>> {
    if modulus.bits() == 0 {
        return Err(Error::InvalidModulus);
    }
    let recovered = BigUint::from_bytes_be(signature).modpow(exponent, modulus);
    Ok(to_fixed_width_be(&recovered, out_len))
}

/// Checks a provider consent signature against an independently recomputed
/// padded hash.
pub fn verify_consent_signature(
    signature: &[u8],
    exponent: &BigUint,
    modulus: &BigUint,
    expected_padded_hash: &[u8],
) -> Result<bool> {
    let recovered = public_decrypt(signature, exponent, modulus, expected_padded_hash.len())?;
    Ok(recovered == expected_padded_hash)
}

fn to_fixed_width_be(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.len() >= width {
        return bytes[bytes.len() - width..].to_vec();
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(&bytes);
    out
}
