//! The vault engine: lifecycle state, key custody, envelope construct/open,
//! policy gate, audit emission, versioning.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use zeroize::Zeroizing;

use bastion_envelope::{derive_root_key, open, random_dek, random_salt, seal, KEY_LEN};

use crate::audit::{AuditOp, AuditSink, FileAuditSink, Outcome};
use crate::error::VaultError;
use crate::policy;
use crate::session::{FileSession, SessionCarrier};
use crate::store;
use crate::types::{Capability, PolicyRule, SecretRecord, VaultRecord, VersionRecord};

/// PBKDF2 iteration count fixed at initialization. The floor is a hard
/// requirement; nothing may lower it.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// The fixed plaintext whose successful opening certifies a candidate root
/// key.
const VERIFICATION_TOKEN: &[u8] = b"vault-verification-token";

/// Identity recorded for lifecycle operations.
const SYSTEM_IDENTITY: &str = "system";

const MAX_IDENTITY_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Answer to `status()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VaultStatus {
    /// The store artifact exists.
    pub exists: bool,
    /// A session token is present.
    pub unsealed: bool,
}

/// A decrypted secret as handed back by `get`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievedSecret {
    pub path: String,
    pub version: u32,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The orchestrator. Holds no key material between operations: the root key
/// is fetched from the session carrier per call and dies with the call's
/// stack frame.
pub struct Vault {
    store_path: PathBuf,
    session: Arc<dyn SessionCarrier>,
    audit: Arc<dyn AuditSink>,
}

impl Vault {
    pub fn new(
        store_path: impl Into<PathBuf>,
        session: Arc<dyn SessionCarrier>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store_path: store_path.into(),
            session,
            audit,
        }
    }

    /// The conventional file-backed assembly: session token beside the
    /// store, audit entries appended to `audit_path`.
    pub fn with_files(store_path: impl Into<PathBuf>, audit_path: impl Into<PathBuf>) -> Self {
        let store_path = store_path.into();
        let session = Arc::new(FileSession::beside_store(&store_path));
        let audit = Arc::new(FileAuditSink::new(audit_path));
        Self::new(store_path, session, audit)
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create the store artifact. The vault is left sealed; `unseal` is a
    /// separate step.
    pub fn init(&self, password: &str) -> Result<(), VaultError> {
        if password.is_empty() {
            return Err(VaultError::EmptyValue);
        }
        if store::exists(&self.store_path) {
            return Err(VaultError::VaultExists);
        }

        let salt = random_salt()?;
        let key = Zeroizing::new(derive_root_key(password, &salt, PBKDF2_ITERATIONS));
        let (verification_nonce, verification_token) = seal(&key, VERIFICATION_TOKEN)?;

        let record = VaultRecord::new(salt, PBKDF2_ITERATIONS, verification_nonce, verification_token);
        store::save(&self.store_path, &record)?;

        debug!(store = %self.store_path.display(), "vault initialized");
        self.audit_entry(SYSTEM_IDENTITY, AuditOp::Init, None, Outcome::Success, None)?;
        Ok(())
    }

    /// Re-derive the root key and prove it against the verification token.
    /// On success the key is published to the session carrier.
    pub fn unseal(&self, password: &str) -> Result<(), VaultError> {
        if !store::exists(&self.store_path) {
            return Err(VaultError::VaultMissing);
        }
        let record = store::load(&self.store_path)?;

        let key = Zeroizing::new(derive_root_key(password, &record.salt, record.iterations));
        if open(&key, &record.verification_nonce, &record.verification_token).is_err() {
            self.audit_entry(
                SYSTEM_IDENTITY,
                AuditOp::Unseal,
                None,
                Outcome::Error,
                Some("Incorrect master password"),
            )?;
            return Err(VaultError::BadPassword);
        }

        self.session.put(&key)?;
        self.audit_entry(SYSTEM_IDENTITY, AuditOp::Unseal, None, Outcome::Success, None)?;
        Ok(())
    }

    /// Drop the session token, scrubbing the key material.
    pub fn seal(&self) -> Result<(), VaultError> {
        if self.session.get()?.is_none() {
            return Err(VaultError::VaultAlreadySealed);
        }
        self.session.clear()?;
        self.audit_entry(SYSTEM_IDENTITY, AuditOp::Seal, None, Outcome::Success, None)?;
        Ok(())
    }

    /// (exists?, unsealed?). Not audited.
    pub fn status(&self) -> Result<VaultStatus, VaultError> {
        Ok(VaultStatus {
            exists: store::exists(&self.store_path),
            unsealed: self.session.get()?.is_some(),
        })
    }

    // -----------------------------------------------------------------------
    // Secret operations
    // -----------------------------------------------------------------------

    /// Store a new secret or a new version of an existing one. Returns the
    /// version number written.
    pub fn put(&self, path: &str, value: &str, identity: &str) -> Result<u32, VaultError> {
        if value.is_empty() {
            return Err(VaultError::EmptyValue);
        }
        if !policy::is_valid_path(path) {
            return Err(VaultError::InvalidPath(path.to_string()));
        }

        let root = self.require_root_key()?;
        let mut record = store::load(&self.store_path)?;

        let op = if record.secrets.contains_key(path) {
            AuditOp::Update
        } else {
            AuditOp::Store
        };
        self.gate(&record, identity, path, Capability::Write, op, Some(path))?;

        // Envelope construction: value under a fresh DEK, DEK under the
        // root key. Neither key nor nonce is ever reused.
        let dek = Zeroizing::new(random_dek()?);
        let (value_nonce, encrypted_value) = seal(&dek, value.as_bytes())?;
        let (dek_nonce, encrypted_dek) = seal(&root, dek.as_ref())?;

        let secret = record
            .secrets
            .entry(path.to_string())
            .or_insert_with(|| SecretRecord {
                path: path.to_string(),
                versions: Vec::new(),
            });
        let version_number = secret.next_version_number();
        secret.versions.push(VersionRecord {
            version_number,
            encrypted_dek,
            dek_nonce,
            encrypted_value,
            value_nonce,
            created_at: Utc::now(),
        });

        store::save(&self.store_path, &record)?;
        debug!(path, version_number, "secret version written");
        self.audit_entry(identity, op, Some(path), Outcome::Success, None)?;
        Ok(version_number)
    }

    /// Decrypt one version of a secret: the requested version, or the
    /// highest-numbered when unspecified.
    pub fn get(
        &self,
        path: &str,
        identity: &str,
        version: Option<u32>,
    ) -> Result<RetrievedSecret, VaultError> {
        let root = self.require_root_key()?;
        let record = store::load(&self.store_path)?;

        self.gate(&record, identity, path, Capability::Read, AuditOp::Retrieve, Some(path))?;

        let secret = match record.secrets.get(path) {
            Some(secret) => secret,
            None => {
                self.audit_entry(
                    identity,
                    AuditOp::Retrieve,
                    Some(path),
                    Outcome::Error,
                    Some("secret not found"),
                )?;
                return Err(VaultError::SecretNotFound(path.to_string()));
            }
        };

        let chosen = match version {
            Some(n) => match secret.find_version(n) {
                Some(v) => v,
                None => {
                    self.audit_entry(
                        identity,
                        AuditOp::Retrieve,
                        Some(path),
                        Outcome::Error,
                        Some("version not found"),
                    )?;
                    return Err(VaultError::VersionNotFound(path.to_string(), n));
                }
            },
            None => secret
                .latest()
                .ok_or_else(|| VaultError::StoreCorrupt(format!("secret '{}' has no versions", path)))?,
        };

        let value = self.open_version(identity, path, &root, chosen)?;
        self.audit_entry(identity, AuditOp::Retrieve, Some(path), Outcome::Success, None)?;
        Ok(RetrievedSecret {
            path: path.to_string(),
            version: chosen.version_number,
            value,
        })
    }

    /// Remove a secret and every one of its versions.
    pub fn delete(&self, path: &str, identity: &str) -> Result<(), VaultError> {
        self.require_root_key()?;
        let mut record = store::load(&self.store_path)?;

        self.gate(&record, identity, path, Capability::Delete, AuditOp::Delete, Some(path))?;

        if record.secrets.remove(path).is_none() {
            self.audit_entry(
                identity,
                AuditOp::Delete,
                Some(path),
                Outcome::Error,
                Some("secret not found"),
            )?;
            return Err(VaultError::SecretNotFound(path.to_string()));
        }

        store::save(&self.store_path, &record)?;
        self.audit_entry(identity, AuditOp::Delete, Some(path), Outcome::Success, None)?;
        Ok(())
    }

    /// Paths under a prefix, lexicographically sorted. The policy gate runs
    /// against the prefix itself; an empty prefix is matched only by a bare
    /// `**` rule.
    pub fn list(&self, identity: &str, prefix: Option<&str>) -> Result<Vec<String>, VaultError> {
        self.require_root_key()?;
        let record = store::load(&self.store_path)?;

        let prefix_str = prefix.unwrap_or("");
        let audit_path = if prefix_str.is_empty() { None } else { Some(prefix_str) };
        self.gate(&record, identity, prefix_str, Capability::List, AuditOp::List, audit_path)?;

        let paths: Vec<String> = record
            .secrets
            .keys()
            .filter(|p| p.starts_with(prefix_str))
            .cloned()
            .collect();

        self.audit_entry(identity, AuditOp::List, audit_path, Outcome::Success, None)?;
        Ok(paths)
    }

    // -----------------------------------------------------------------------
    // Policy management
    // -----------------------------------------------------------------------

    /// Grant `capabilities` over `pattern` to `identity`. The session is the
    /// authority here; no policy gate applies.
    pub fn add_policy(
        &self,
        identity: &str,
        pattern: &str,
        capabilities: &[Capability],
    ) -> Result<(), VaultError> {
        self.require_root_key()?;

        if identity.is_empty() || identity.len() > MAX_IDENTITY_LEN {
            return Err(VaultError::InvalidIdentity);
        }
        if pattern.is_empty() {
            return Err(VaultError::EmptyValue);
        }
        if capabilities.is_empty() {
            return Err(VaultError::EmptyCapabilities);
        }

        let mut record = store::load(&self.store_path)?;

        let mut caps: Vec<Capability> = Vec::with_capacity(capabilities.len());
        for cap in capabilities {
            if !caps.contains(cap) {
                caps.push(*cap);
            }
        }

        record.policies.push(PolicyRule {
            identity: identity.to_string(),
            path_pattern: pattern.to_string(),
            capabilities: caps,
        });
        store::save(&self.store_path, &record)?;
        self.audit_entry(identity, AuditOp::AddPolicy, None, Outcome::Success, None)?;
        Ok(())
    }

    /// Remove the first rule matching both identity and pattern exactly.
    pub fn remove_policy(&self, identity: &str, pattern: &str) -> Result<(), VaultError> {
        self.require_root_key()?;
        let mut record = store::load(&self.store_path)?;

        let position = record
            .policies
            .iter()
            .position(|rule| rule.identity == identity && rule.path_pattern == pattern)
            .ok_or_else(|| {
                VaultError::PolicyNotFound(identity.to_string(), pattern.to_string())
            })?;

        record.policies.remove(position);
        store::save(&self.store_path, &record)?;
        self.audit_entry(identity, AuditOp::RemovePolicy, None, Outcome::Success, None)?;
        Ok(())
    }

    /// The current rules, in stored order. Read-only; not audited.
    pub fn policies(&self) -> Result<Vec<PolicyRule>, VaultError> {
        self.require_root_key()?;
        Ok(store::load(&self.store_path)?.policies)
    }

    // -----------------------------------------------------------------------
    // Audit access
    // -----------------------------------------------------------------------

    /// Raw audit entries, oldest first; trailing N with `last_n`.
    pub fn audit_log(&self, last_n: Option<usize>) -> Result<Vec<String>, VaultError> {
        self.audit.replay(last_n)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// The single authority check: a secret or policy operation may proceed
    /// only when the store exists and a session token is present. The
    /// rejection is not a security event, so it is not audited.
    fn require_root_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, VaultError> {
        if !store::exists(&self.store_path) {
            return Err(VaultError::VaultSealed);
        }
        self.session.get()?.ok_or(VaultError::VaultSealed)
    }

    /// Default-deny policy gate. A rejection writes the `denied` entry
    /// before surfacing.
    fn gate(
        &self,
        record: &VaultRecord,
        identity: &str,
        path: &str,
        capability: Capability,
        op: AuditOp,
        audit_path: Option<&str>,
    ) -> Result<(), VaultError> {
        if policy::check_access(&record.policies, identity, path, capability) {
            return Ok(());
        }
        self.audit_entry(identity, op, audit_path, Outcome::Denied, None)?;
        Err(VaultError::AccessDenied {
            identity: identity.to_string(),
            path: path.to_string(),
            capability,
        })
    }

    /// Open the envelope: DEK under the root key, value under the DEK. A
    /// failed tag check here means the store no longer matches the key that
    /// wrote it.
    fn open_version(
        &self,
        identity: &str,
        path: &str,
        root: &[u8; KEY_LEN],
        version: &VersionRecord,
    ) -> Result<String, VaultError> {
        let corrupt = |this: &Self| -> Result<(), VaultError> {
            this.audit_entry(
                identity,
                AuditOp::Retrieve,
                Some(path),
                Outcome::Error,
                Some("store corrupt"),
            )
        };

        let dek_bytes = match open(root, &version.dek_nonce, &version.encrypted_dek) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(_) => {
                corrupt(self)?;
                return Err(VaultError::StoreCorrupt(format!(
                    "data key for '{}' v{} failed authentication",
                    path, version.version_number
                )));
            }
        };
        let dek: Zeroizing<[u8; KEY_LEN]> = match <[u8; KEY_LEN]>::try_from(dek_bytes.as_slice()) {
            Ok(key) => Zeroizing::new(key),
            Err(_) => {
                corrupt(self)?;
                return Err(VaultError::StoreCorrupt(format!(
                    "data key for '{}' v{} has wrong length",
                    path, version.version_number
                )));
            }
        };

        let value_bytes = match open(&dek, &version.value_nonce, &version.encrypted_value) {
            Ok(bytes) => bytes,
            Err(_) => {
                corrupt(self)?;
                return Err(VaultError::StoreCorrupt(format!(
                    "value for '{}' v{} failed authentication",
                    path, version.version_number
                )));
            }
        };

        match String::from_utf8(value_bytes) {
            Ok(value) => Ok(value),
            Err(_) => {
                corrupt(self)?;
                Err(VaultError::StoreCorrupt(format!(
                    "value for '{}' v{} is not UTF-8",
                    path, version.version_number
                )))
            }
        }
    }

    fn audit_entry(
        &self,
        identity: &str,
        op: AuditOp,
        path: Option<&str>,
        outcome: Outcome,
        detail: Option<&str>,
    ) -> Result<(), VaultError> {
        self.audit.append(identity, op, path, outcome, detail)
    }
}
