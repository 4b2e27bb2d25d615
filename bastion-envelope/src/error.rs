//! Unified error types for the envelope primitives.

use core::fmt;

/// Authenticated decryption failed: wrong key, wrong nonce, or tampered data.
///
/// Deliberately carries no cause. Callers decide what a failed tag check
/// means at their site (bad password, corrupt store, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFailure;

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authentication failed")
    }
}

impl std::error::Error for AuthFailure {}

/// The encrypt path failed: the OS random source was unavailable or the
/// cipher rejected its inputs. Not recoverable at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealFailure;

impl fmt::Display for SealFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encryption failed")
    }
}

impl std::error::Error for SealFailure {}
