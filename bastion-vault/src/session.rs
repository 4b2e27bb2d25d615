//! Session carrier: the root key between invocations, present or absent.
//!
//! The token's presence is the only authority that an operation may touch
//! plaintext. It is never committed to the store.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bastion_envelope::KEY_LEN;
use zeroize::{Zeroize, Zeroizing};

use crate::error::VaultError;

/// Out-of-process handoff of the 32-byte root key.
///
/// Exactly three verbs. `get` hands back a zeroizing copy; `clear` must
/// scrub the material to the extent the platform permits.
pub trait SessionCarrier: Send + Sync {
    fn put(&self, key: &[u8; KEY_LEN]) -> Result<(), VaultError>;
    fn get(&self) -> Result<Option<Zeroizing<[u8; KEY_LEN]>>, VaultError>;
    fn clear(&self) -> Result<(), VaultError>;
}

// ---------------------------------------------------------------------------
// File carrier
// ---------------------------------------------------------------------------

/// A sibling file beside the store holding the root key as hex text.
/// Exists exactly while the vault is unsealed.
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional location: `<store>.session`.
    pub fn beside_store(store_path: &Path) -> Self {
        let mut name = store_path.as_os_str().to_os_string();
        name.push(".session");
        Self::new(PathBuf::from(name))
    }
}

impl SessionCarrier for FileSession {
    fn put(&self, key: &[u8; KEY_LEN]) -> Result<(), VaultError> {
        std::fs::write(&self.path, hex::encode(key))
            .map_err(|e| VaultError::StorageError(format!("write session: {}", e)))?;

        // The session file is key material: owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)
                .map_err(|e| VaultError::StorageError(format!("session metadata: {}", e)))?
                .permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| VaultError::StorageError(format!("session permissions: {}", e)))?;
        }
        Ok(())
    }

    fn get(&self) -> Result<Option<Zeroizing<[u8; KEY_LEN]>>, VaultError> {
        let mut text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(VaultError::StorageError(format!("read session: {}", e))),
        };

        let decoded = hex::decode(text.trim());
        text.zeroize();

        // A malformed token carries no authority; treat it as absent.
        match decoded {
            Ok(raw) if raw.len() == KEY_LEN => {
                let mut key = Zeroizing::new([0u8; KEY_LEN]);
                key.copy_from_slice(&raw);
                let mut raw = raw;
                raw.zeroize();
                Ok(Some(key))
            }
            _ => {
                tracing::warn!(path = %self.path.display(), "ignoring malformed session file");
                Ok(None)
            }
        }
    }

    fn clear(&self) -> Result<(), VaultError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => {
                // Overwrite the key bytes before unlinking.
                let zeros = vec![0u8; meta.len() as usize];
                std::fs::write(&self.path, zeros)
                    .map_err(|e| VaultError::StorageError(format!("scrub session: {}", e)))?;
                std::fs::remove_file(&self.path)
                    .map_err(|e| VaultError::StorageError(format!("remove session: {}", e)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::StorageError(format!("session metadata: {}", e))),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory carrier
// ---------------------------------------------------------------------------

/// Process-scoped carrier for tests and long-lived embedding.
pub struct MemorySession {
    key: Mutex<Option<[u8; KEY_LEN]>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self {
            key: Mutex::new(None),
        }
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCarrier for MemorySession {
    fn put(&self, key: &[u8; KEY_LEN]) -> Result<(), VaultError> {
        *self.key.lock().unwrap() = Some(*key);
        Ok(())
    }

    fn get(&self) -> Result<Option<Zeroizing<[u8; KEY_LEN]>>, VaultError> {
        Ok(self.key.lock().unwrap().map(Zeroizing::new))
    }

    fn clear(&self) -> Result<(), VaultError> {
        if let Some(mut key) = self.key.lock().unwrap().take() {
            key.zeroize();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_session_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let session = FileSession::new(dir.path().join("vault.json.session"));

        assert!(session.get().unwrap().is_none());

        let key = [0xAB; KEY_LEN];
        session.put(&key).unwrap();
        assert_eq!(*session.get().unwrap().unwrap(), key);

        session.clear().unwrap();
        assert!(session.get().unwrap().is_none());
    }

    #[test]
    fn file_session_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let session = FileSession::new(dir.path().join("s"));
        session.clear().unwrap();
        session.clear().unwrap();
    }

    #[test]
    fn malformed_session_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s");
        std::fs::write(&path, "not hex at all").unwrap();
        let session = FileSession::new(&path);
        assert!(session.get().unwrap().is_none());
    }

    #[test]
    fn beside_store_appends_suffix() {
        let session = FileSession::beside_store(Path::new("/tmp/vault.json"));
        assert_eq!(session.path, Path::new("/tmp/vault.json.session"));
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s");
        let session = FileSession::new(&path);
        session.put(&[1u8; KEY_LEN]).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_session_roundtrip() {
        let session = MemorySession::new();
        assert!(session.get().unwrap().is_none());
        session.put(&[7u8; KEY_LEN]).unwrap();
        assert_eq!(**session.get().unwrap().as_ref().unwrap(), [7u8; KEY_LEN]);
        session.clear().unwrap();
        assert!(session.get().unwrap().is_none());
    }
}
