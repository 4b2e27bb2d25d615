//! # Bastion Vault
//!
//! A local, single-user secret store. Values are protected at rest by a
//! two-layer envelope: each secret version is encrypted under its own
//! single-use data encryption key, and each DEK is encrypted under a root
//! key derived from the master password. Every access runs through
//! path-based policies with default deny, and every attempt lands in an
//! append-only audit log.
//!
//! Built on `bastion-envelope` for PBKDF2 derivation and AES-256-GCM.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bastion_vault::{Capability, MemoryAuditSink, MemorySession, Vault};
//! use std::sync::Arc;
//!
//! let vault = Vault::new(
//!     "vault.json",
//!     Arc::new(MemorySession::new()),
//!     Arc::new(MemoryAuditSink::new()),
//! );
//!
//! vault.init("MyMasterPass123").unwrap();
//! vault.unseal("MyMasterPass123").unwrap();
//! vault.add_policy("admin", "**", &[Capability::Read, Capability::Write]).unwrap();
//!
//! vault.put("production/db/password", "s3cretValue!", "admin").unwrap();
//! let secret = vault.get("production/db/password", "admin", None).unwrap();
//! assert_eq!(secret.value, "s3cretValue!");
//! ```

#![deny(unsafe_code)]

pub mod audit;
pub mod error;
pub mod policy;
pub mod session;
pub mod store;
pub mod types;
pub mod vault;

// Re-export main types for convenience
pub use audit::{AuditOp, AuditSink, FileAuditSink, MemoryAuditSink, Outcome};
pub use error::VaultError;
pub use policy::{check_access, is_valid_path, matches_pattern};
pub use session::{FileSession, MemorySession, SessionCarrier};
pub use types::{Capability, PolicyRule, SecretRecord, VaultRecord, VersionRecord};
pub use vault::{RetrievedSecret, Vault, VaultStatus, PBKDF2_ITERATIONS};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
