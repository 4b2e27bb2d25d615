//! Root-key derivation: PBKDF2-HMAC-SHA256.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::aead::{KEY_LEN, SALT_LEN};

/// Derive the 32-byte root key from a master password.
///
/// Deterministic given (password, salt, iterations). The password is used
/// as its UTF-8 bytes. Iteration-count policy is enforced by the caller,
/// not here.
pub fn derive_root_key(password: &str, salt: &[u8; SALT_LEN], iterations: u32) -> [u8; KEY_LEN] {
    let mut out = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}
