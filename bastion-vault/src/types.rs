//! Core types: VaultRecord, SecretRecord, VersionRecord, PolicyRule, Capability.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bastion_envelope::{NONCE_LEN, SALT_LEN};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// The closed set of grantable rights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    List,
    Delete,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::List => "list",
            Capability::Delete => "delete",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Capability {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Capability::Read),
            "write" => Ok(Capability::Write),
            "list" => Ok(Capability::List),
            "delete" => Ok(Capability::Delete),
            other => Err(VaultError::InvalidCapability(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Hex transcoding for the closed set of binary fields
// ---------------------------------------------------------------------------

pub(crate) mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(d: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(d)?;
        let raw = hex::decode(&text).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("binary field has wrong length"))
    }
}

pub(crate) mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(d)?;
        hex::decode(&text).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Version records
// ---------------------------------------------------------------------------

/// One encrypted value under one single-use DEK.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Version number (1, 2, 3, ...), contiguous within a secret.
    pub version_number: u32,
    /// The 32-byte DEK, sealed under the root key.
    #[serde(with = "hex_vec")]
    pub encrypted_dek: Vec<u8>,
    #[serde(with = "hex_array")]
    pub dek_nonce: [u8; NONCE_LEN],
    /// The UTF-8 secret value, sealed under the DEK.
    #[serde(with = "hex_vec")]
    pub encrypted_value: Vec<u8>,
    #[serde(with = "hex_array")]
    pub value_nonce: [u8; NONCE_LEN],
    /// When this version was created.
    pub created_at: DateTime<Utc>,
}

/// All versions stored at one path, ascending by version number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub path: String,
    pub versions: Vec<VersionRecord>,
}

impl SecretRecord {
    /// The highest-numbered version.
    pub fn latest(&self) -> Option<&VersionRecord> {
        self.versions.last()
    }

    pub fn find_version(&self, number: u32) -> Option<&VersionRecord> {
        self.versions.iter().find(|v| v.version_number == number)
    }

    pub fn next_version_number(&self) -> u32 {
        self.latest().map(|v| v.version_number + 1).unwrap_or(1)
    }
}

// ---------------------------------------------------------------------------
// Policy rules
// ---------------------------------------------------------------------------

/// Grants an identity a set of capabilities over a path pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub identity: String,
    pub path_pattern: String,
    pub capabilities: Vec<Capability>,
}

// ---------------------------------------------------------------------------
// The persistent vault record
// ---------------------------------------------------------------------------

/// The persistent top-level artifact.
///
/// `secrets` is a BTreeMap so serialization is canonical: saving a loaded
/// record reproduces the original bytes exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// KDF salt, fixed at initialization.
    #[serde(with = "hex_array")]
    pub salt: [u8; SALT_LEN],
    /// PBKDF2 iteration count, fixed at initialization.
    pub iterations: u32,
    #[serde(with = "hex_array")]
    pub verification_nonce: [u8; NONCE_LEN],
    /// The fixed verification plaintext, sealed under the root key. Opening
    /// it is the sole correctness oracle for a candidate key.
    #[serde(with = "hex_vec")]
    pub verification_token: Vec<u8>,
    pub secrets: BTreeMap<String, SecretRecord>,
    /// Order preserved across load/save so removals are deterministic;
    /// evaluation itself is existential and order-blind.
    pub policies: Vec<PolicyRule>,
}

impl VaultRecord {
    pub fn new(
        salt: [u8; SALT_LEN],
        iterations: u32,
        verification_nonce: [u8; NONCE_LEN],
        verification_token: Vec<u8>,
    ) -> Self {
        Self {
            salt,
            iterations,
            verification_nonce,
            verification_token,
            secrets: BTreeMap::new(),
            policies: Vec::new(),
        }
    }
}
