//! Store codec: the vault record on disk, replaced atomically.

use std::io::Write;
use std::path::Path;

use crate::error::VaultError;
use crate::types::VaultRecord;

/// Whether the store artifact is present.
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Load and decode the store.
///
/// Anything wrong with the document itself — unparseable JSON, a missing
/// field, an undecodable hex field — is `StoreCorrupt`. Cryptographic
/// integrity of individual records is not checked here; it surfaces when
/// the engine opens them.
pub fn load(path: &Path) -> Result<VaultRecord, VaultError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VaultError::VaultMissing)
        }
        Err(e) => return Err(VaultError::StorageError(format!("read store: {}", e))),
    };
    serde_json::from_str(&text).map_err(|e| VaultError::StoreCorrupt(e.to_string()))
}

/// Encode and persist the store atomically: write a sibling temp file,
/// flush it, then rename over the target. Readers see the old bytes or the
/// new bytes, never a torn file.
pub fn save(path: &Path, record: &VaultRecord) -> Result<(), VaultError> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| VaultError::StorageError(format!("serialize store: {}", e)))?;

    let tmp = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp)
            .map_err(|e| VaultError::StorageError(format!("create temp store: {}", e)))?;
        file.write_all(json.as_bytes())
            .map_err(|e| VaultError::StorageError(format!("write store: {}", e)))?;
        file.sync_all()
            .map_err(|e| VaultError::StorageError(format!("flush store: {}", e)))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&tmp)
            .map_err(|e| VaultError::StorageError(format!("store metadata: {}", e)))?
            .permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(&tmp, perms)
            .map_err(|e| VaultError::StorageError(format!("store permissions: {}", e)))?;
    }

    std::fs::rename(&tmp, path)
        .map_err(|e| VaultError::StorageError(format!("replace store: {}", e)))
}
