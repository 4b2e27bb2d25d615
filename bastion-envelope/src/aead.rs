//! AEAD: AES-256-GCM with fresh random nonces and empty associated data.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use getrandom::getrandom;

use crate::error::{AuthFailure, SealFailure};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// PBKDF2 salt length in bytes.
pub const SALT_LEN: usize = 16;
/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Generate a random 16-byte KDF salt.
pub fn random_salt() -> Result<[u8; SALT_LEN], SealFailure> {
    let mut s = [0u8; SALT_LEN];
    getrandom(&mut s).map_err(|_| SealFailure)?;
    Ok(s)
}

/// Generate a random 32-byte data encryption key.
pub fn random_dek() -> Result<[u8; KEY_LEN], SealFailure> {
    let mut k = [0u8; KEY_LEN];
    getrandom(&mut k).map_err(|_| SealFailure)?;
    Ok(k)
}

/// Generate a random 12-byte nonce. Used during encryption only.
pub fn random_nonce() -> Result<[u8; NONCE_LEN], SealFailure> {
    let mut n = [0u8; NONCE_LEN];
    getrandom(&mut n).map_err(|_| SealFailure)?;
    Ok(n)
}

/// Encrypt under AES-256-GCM with a fresh nonce and empty associated data.
///
/// The returned ciphertext carries the 16-byte authentication tag as its
/// tail. The nonce is generated here and must be stored next to the
/// ciphertext; it is never reused under the same key.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<([u8; NONCE_LEN], Vec<u8>), SealFailure> {
    let nonce = random_nonce()?;
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| SealFailure)?;
    let n = Nonce::from_slice(&nonce);
    let ciphertext = cipher.encrypt(n, plaintext).map_err(|_| SealFailure)?;
    Ok((nonce, ciphertext))
}

/// Decrypt and verify. Returns [`AuthFailure`] when the tag check fails.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, AuthFailure> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| AuthFailure)?;
    let n = Nonce::from_slice(nonce);
    cipher.decrypt(n, ciphertext).map_err(|_| AuthFailure)
}
