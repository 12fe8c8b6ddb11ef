use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{AcmeError, AcmeResult};

const KEY_FILE_MODE: u32 = 0o600;
const SECRETS_DIR_MODE: u32 = 0o700;

/// The key+chain material the store binds to a path. `key_pem` is
/// `None` mid-install after `load_pem_chain` clears it (spec §4.4
/// step 3) and before the driver restores the stashed new key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreEntry {
    pub key_pem: Option<String>,
    pub chain_pem: String,
}

/// A live consumer bound to a store entry (e.g. a TLS listener holding
/// a parsed certificate). Rebuilding one against new entry data is
/// spec §4.4 step 4, "splice it in".
pub trait LiveInstance: Send + Sync + std::fmt::Debug {
    fn rebuild(&self, new_entry: &StoreEntry) -> AcmeResult<Arc<dyn LiveInstance>>;
}

/// Certificate store contract consumed by the core's install step
/// (spec §4.2/§4.4): lookup-by-path, duplicate, load-PEM-into-store,
/// per-instance rebuild, atomic replace, and one global advisory lock.
#[async_trait]
pub trait CertStore: Send + Sync {
    /// Non-blocking try-lock; contention is a transient install error.
    fn try_lock(&self) -> AcmeResult<()>;
    fn unlock(&self);

    async fn lookup(&self, path: &str) -> AcmeResult<StoreEntry>;

    #[must_use]
    fn duplicate(&self, entry: &StoreEntry) -> StoreEntry {
        entry.clone()
    }

    /// Parses a PEM certificate chain into `entry`, clearing its key
    /// field as a side effect — callers must stash/restore the new key
    /// around this call (spec §4.4 step 3).
    fn load_pem_chain(&self, entry: &mut StoreEntry, chain_pem: &str) -> AcmeResult<()>;

    fn bound_instances(&self, path: &str) -> Vec<Arc<dyn LiveInstance>>;

    async fn replace(
        &self,
        path: &str,
        entry: StoreEntry,
        instances: Vec<Arc<dyn LiveInstance>>,
    ) -> AcmeResult<()>;
}

/// Filesystem-backed default `CertStore`: cert+key live as sibling PEM
/// files at the configured path, written via temp-file-then-rename so
/// a crash mid-write never leaves a half-written key file live. Bound
/// instances are tracked only in memory — there is no real listener in
/// this crate, so a host embedding this engine supplies its own
/// `LiveInstance` implementation.
pub struct FileCertStore {
    locked: AtomicBool,
    entries: AsyncMutex<HashMap<String, StoreEntry>>,
    instances: AsyncMutex<HashMap<String, Vec<Arc<dyn LiveInstance>>>>,
}

impl Default for FileCertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileCertStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            entries: AsyncMutex::new(HashMap::new()),
            instances: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Seeds an entry and its bound instances as if loaded from disk
    /// at startup. Used by hosts and by tests to set up pre-run state.
    pub async fn seed(&self, path: &str, entry: StoreEntry, instances: Vec<Arc<dyn LiveInstance>>) {
        self.entries.lock().await.insert(path.to_string(), entry);
        self.instances.lock().await.insert(path.to_string(), instances);
    }

    async fn write_pem_atomically(path: &Path, contents: &str, mode: u32) -> AcmeResult<()> {
        let dir = path
            .parent()
            .ok_or_else(|| AcmeError::InstallTerminal(format!("{} has no parent dir", path.display())))?;
        fs::create_dir_all(dir)
            .await
            .map_err(|e| AcmeError::InstallTerminal(format!("create dir {}: {e}", dir.display())))?;
        fs::set_permissions(dir, std::fs::Permissions::from_mode(SECRETS_DIR_MODE))
            .await
            .map_err(|e| AcmeError::InstallTerminal(format!("set dir permissions: {e}")))?;

        let tmp_path = path.with_extension("tmp-new");
        fs::write(&tmp_path, contents)
            .await
            .map_err(|e| AcmeError::InstallTerminal(format!("write {}: {e}", tmp_path.display())))?;
        fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| AcmeError::InstallTerminal(format!("set permissions: {e}")))?;
        fs::rename(&tmp_path, path)
            .await
            .map_err(|e| AcmeError::InstallTerminal(format!("rename into place: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl CertStore for FileCertStore {
    fn try_lock(&self) -> AcmeResult<()> {
        if self.locked.swap(true, Ordering::AcqRel) {
            Err(AcmeError::InstallTransient("store lock held by another renewal".to_string()))
        } else {
            Ok(())
        }
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    async fn lookup(&self, path: &str) -> AcmeResult<StoreEntry> {
        self.entries
            .lock()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| AcmeError::InstallTerminal(format!("no store entry bound to {path}")))
    }

    fn load_pem_chain(&self, entry: &mut StoreEntry, chain_pem: &str) -> AcmeResult<()> {
        for result in x509_parser::pem::Pem::iter_from_buffer(chain_pem.as_bytes()) {
            let pem = result.map_err(|e| AcmeError::InstallTerminal(format!("malformed PEM chain: {e}")))?;
            pem.parse_x509()
                .map_err(|e| AcmeError::InstallTerminal(format!("malformed certificate: {e}")))?;
        }
        entry.chain_pem = chain_pem.to_string();
        entry.key_pem = None;
        Ok(())
    }

    fn bound_instances(&self, path: &str) -> Vec<Arc<dyn LiveInstance>> {
        self.instances
            .try_lock()
            .map(|guard| guard.get(path).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    async fn replace(
        &self,
        path: &str,
        entry: StoreEntry,
        instances: Vec<Arc<dyn LiveInstance>>,
    ) -> AcmeResult<()> {
        let key_pem = entry
            .key_pem
            .as_deref()
            .ok_or_else(|| AcmeError::InstallTerminal("install entry missing restored key".to_string()))?;

        Self::write_pem_atomically(Path::new(path), &entry.chain_pem, 0o644).await?;
        let key_path = Path::new(path).with_extension("key.pem");
        Self::write_pem_atomically(&key_path, key_pem, KEY_FILE_MODE).await?;

        self.entries.lock().await.insert(path.to_string(), entry);
        self.instances.lock().await.insert(path.to_string(), instances);
        Ok(())
    }
}
