//! Certificate hand-off (spec §4.4): acquire the store lock, stash the
//! new key around the PEM-chain load, rebuild every live instance
//! bound to the path, then atomically replace the old entry. Any
//! failure releases the lock and leaves the old certificate live.

use std::sync::Arc;

use tracing::{info, warn};

use crate::collaborators::store::{CertStore, LiveInstance, StoreEntry};
use crate::error::{AcmeError, AcmeResult};

pub async fn install_certificate(
    store: &dyn CertStore,
    path: &str,
    new_key_pem: &str,
    chain_pem: &str,
) -> AcmeResult<()> {
    store.try_lock()?;
    let result = install_locked(store, path, new_key_pem, chain_pem).await;
    store.unlock();

    match &result {
        Ok(()) => info!(path, "certificate installed"),
        Err(err) => warn!(path, error = %err, "install aborted, old certificate unchanged"),
    }
    result
}

async fn install_locked(
    store: &dyn CertStore,
    path: &str,
    new_key_pem: &str,
    chain_pem: &str,
) -> AcmeResult<()> {
    let existing = store.lookup(path).await?;
    let mut entry: StoreEntry = store.duplicate(&existing);

    store.load_pem_chain(&mut entry, chain_pem)?;
    entry.key_pem = Some(new_key_pem.to_string());

    let instances: Vec<Arc<dyn LiveInstance>> = store
        .bound_instances(path)
        .iter()
        .map(|instance| instance.rebuild(&entry))
        .collect::<AcmeResult<Vec<_>>>()?;

    store.replace(path, entry, instances).await
}
