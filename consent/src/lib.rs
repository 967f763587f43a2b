//! Deterministic salt derivation and the custom RSA-modulus padding binding
//! a signed consent message to a provider's accessor key.

mod error;
mod padding;

pub use error::{Error, Result};
pub use padding::{DEFAULT_BLOCK_BITS, build_padded_hash, build_padded_hash_b64, public_decrypt, verify_consent_signature};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// Derives the base64 salt bound to an ordered list of parts, used both for
/// request-parameter salts (`request_id, service_id, initial_salt`) and
/// message salts (`namespace, identifier, initial_salt`).
pub fn derive_salt(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    BASE64.encode(hasher.finalize())
}

/// Parses an RSA public-key modulus out of its big-endian hex encoding.
pub fn modulus_from_hex(s: &str) -> Result<BigUint> {
    let bytes = hex::decode(s)?;
    let modulus = BigUint::from_bytes_be(&bytes);
    if modulus.bits() == 0 {
        return Err(Error::InvalidModulus);
    }
    Ok(modulus)
}

/// The conventional RSA public exponent.
pub fn default_exponent() -> BigUint {
    BigUint::from(65537u32)
}
