//! Error types for the vault.

use std::fmt;

use crate::types::Capability;

/// Every failure the engine can surface. One classification per condition;
/// errors propagate without being reclassified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// `init` on a path where a store already exists.
    VaultExists,
    /// `unseal` with no store artifact.
    VaultMissing,
    /// A secret or policy operation while no root key is available.
    VaultSealed,
    /// `seal` with no active session.
    VaultAlreadySealed,
    /// The verification token did not open under the derived key.
    BadPassword,
    InvalidPath(String),
    EmptyValue,
    /// Identity missing or longer than 255 characters.
    InvalidIdentity,
    AccessDenied {
        identity: String,
        path: String,
        capability: Capability,
    },
    SecretNotFound(String),
    VersionNotFound(String, u32),
    InvalidCapability(String),
    EmptyCapabilities,
    PolicyNotFound(String, String),
    /// Unparseable store, missing field, or undecodable binary field.
    StoreCorrupt(String),
    /// Audit log absent on replay.
    LogMissing,
    /// Seal-path crypto failure (random source unavailable). Unreachable in
    /// normal operation.
    Crypto(String),
    StorageError(String),
    AuditError(String),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VaultExists => write!(f, "vault already exists"),
            Self::VaultMissing => write!(f, "vault not found"),
            Self::VaultSealed => write!(f, "vault is sealed"),
            Self::VaultAlreadySealed => write!(f, "vault is already sealed"),
            Self::BadPassword => write!(f, "incorrect master password"),
            Self::InvalidPath(p) => write!(f, "invalid secret path: '{}'", p),
            Self::EmptyValue => write!(f, "value must not be empty"),
            Self::InvalidIdentity => {
                write!(f, "identity must be non-empty and at most 255 characters")
            }
            Self::AccessDenied { identity, path, capability } => {
                write!(f, "access denied: '{}' lacks {} on '{}'", identity, capability, path)
            }
            Self::SecretNotFound(p) => write!(f, "no secret at '{}'", p),
            Self::VersionNotFound(p, v) => write!(f, "no version {} of '{}'", v, p),
            Self::InvalidCapability(name) => write!(f, "unknown capability: '{}'", name),
            Self::EmptyCapabilities => write!(f, "at least one capability is required"),
            Self::PolicyNotFound(identity, pattern) => {
                write!(f, "no policy for '{}' matching '{}'", identity, pattern)
            }
            Self::StoreCorrupt(detail) => write!(f, "vault store is corrupt: {}", detail),
            Self::LogMissing => write!(f, "audit log not found"),
            Self::Crypto(detail) => write!(f, "cryptographic failure: {}", detail),
            Self::StorageError(detail) => write!(f, "storage error: {}", detail),
            Self::AuditError(detail) => write!(f, "audit log write failed: {}", detail),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<bastion_envelope::SealFailure> for VaultError {
    fn from(e: bastion_envelope::SealFailure) -> Self {
        Self::Crypto(e.to_string())
    }
}
