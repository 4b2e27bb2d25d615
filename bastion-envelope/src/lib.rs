//! # Bastion Envelope
//!
//! Crypto primitives for the bastion secret store: PBKDF2-HMAC-SHA256
//! root-key derivation and AES-256-GCM seal/open with per-encryption
//! random nonces.
//!
//! ## Quick Start
//!
//! ```rust
//! use bastion_envelope::{derive_root_key, random_salt, seal, open};
//!
//! let salt = random_salt().unwrap();
//! let key = derive_root_key("master password", &salt, 600_000);
//!
//! let (nonce, ciphertext) = seal(&key, b"secret").unwrap();
//! let plaintext = open(&key, &nonce, &ciphertext).unwrap();
//!
//! assert_eq!(plaintext, b"secret");
//! ```
//!
//! ## Security Properties
//!
//! - **Authenticated encryption**: a passing tag check certifies both the
//!   key and the ciphertext bytes
//! - **Uniform decrypt errors**: every open failure is the same
//!   [`AuthFailure`], with no oracle about the cause
//! - **Fresh nonces**: seal never reuses a nonce under a key
//!
//! ## What's NOT Provided
//!
//! - Key management and storage
//! - Streaming encryption
//! - Constant-time guarantees beyond what the underlying crates give

#![deny(unsafe_code)]

mod aead;
mod error;
mod kdf;

pub use aead::{open, random_dek, random_nonce, random_salt, seal, KEY_LEN, NONCE_LEN, SALT_LEN, TAG_LEN};
pub use error::{AuthFailure, SealFailure};
pub use kdf::derive_root_key;
