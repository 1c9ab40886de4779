//! The persisted correspondence between local tasks and remote tasks.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::ids::{ProviderId, RemoteId, TaskIdentifier};

/// Tuple `(localTaskId, providerId, remoteId, updatedFlag)`.
///
/// `updated` is the single canonical owner of the per-task "dirty since last
/// sync" bit. See DESIGN.md for why this resolves the distilled spec's
/// apparent duplication between the mapping table's `updatedFlag` column and
/// the local store's `clearUpdatedTaskList` contract.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncMapping {
    pub local_task_id: TaskIdentifier,
    pub provider_id: ProviderId,
    pub remote_id: RemoteId,
    pub updated: bool,
}

impl SyncMapping {
    pub fn new(local_task_id: TaskIdentifier, provider_id: ProviderId, remote_id: RemoteId) -> Self {
        Self {
            local_task_id,
            provider_id,
            remote_id,
            updated: true,
        }
    }
}

#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn get_sync_mapping(&self, provider: ProviderId) -> Result<HashSet<SyncMapping>, StoreError>;
    async fn save_sync_mapping(&self, mapping: SyncMapping) -> Result<(), StoreError>;
    async fn delete_sync_mapping(&self, mapping: &SyncMapping) -> Result<(), StoreError>;
}

/// Reference in-memory mapping store, with an optional JSON round-trip
/// (`save_to_file`/`from_file`) mirroring `Cache::save_to_folder`/`from_folder`.
#[derive(Default, Debug)]
pub struct InMemoryMappingStore {
    inner: Mutex<HashMap<ProviderId, HashMap<TaskIdentifier, SyncMapping>>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let file = std::fs::File::open(path)
            .map_err(|err| StoreError::other(format!("unable to open {:?}: {}", path, err)))?;
        let flat: Vec<SyncMapping> = serde_json::from_reader(file)
            .map_err(|err| StoreError::other(format!("unable to parse {:?}: {}", path, err)))?;

        let mut inner: HashMap<ProviderId, HashMap<TaskIdentifier, SyncMapping>> = HashMap::new();
        for mapping in flat {
            inner
                .entry(mapping.provider_id)
                .or_default()
                .insert(mapping.local_task_id, mapping);
        }
        Ok(Self { inner: Mutex::new(inner) })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let guard = self.inner.lock().unwrap();
        let flat: Vec<&SyncMapping> = guard.values().flat_map(|m| m.values()).collect();
        let file = std::fs::File::create(path)
            .map_err(|err| StoreError::other(format!("unable to create {:?}: {}", path, err)))?;
        serde_json::to_writer(file, &flat)
            .map_err(|err| StoreError::other(format!("unable to write {:?}: {}", path, err)))
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn get_sync_mapping(&self, provider: ProviderId) -> Result<HashSet<SyncMapping>, StoreError> {
        let guard = self.inner.lock().unwrap();
        Ok(guard
            .get(&provider)
            .map(|byid| byid.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_sync_mapping(&self, mapping: SyncMapping) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let for_provider = guard.entry(mapping.provider_id).or_default();

        if let Some(existing) = for_provider.values().find(|m| {
            m.remote_id == mapping.remote_id && m.local_task_id != mapping.local_task_id
        }) {
            return Err(StoreError::UniqueViolation(format!(
                "remote id {} is already mapped to local task {}",
                mapping.remote_id, existing.local_task_id
            )));
        }

        for_provider.insert(mapping.local_task_id, mapping);
        Ok(())
    }

    async fn delete_sync_mapping(&self, mapping: &SyncMapping) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        if let Some(for_provider) = guard.get_mut(&mapping.provider_id) {
            for_provider.remove(&mapping.local_task_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_duplicate_remote_id() {
        let store = InMemoryMappingStore::new();
        let provider = ProviderId(1);
        let remote = RemoteId::from("R1");

        let m1 = SyncMapping::new(TaskIdentifier::new(), provider, remote.clone());
        store.save_sync_mapping(m1).await.unwrap();

        let m2 = SyncMapping::new(TaskIdentifier::new(), provider, remote);
        let err = store.save_sync_mapping(m2).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");

        let store = InMemoryMappingStore::new();
        let provider = ProviderId(7);
        let mapping = SyncMapping::new(TaskIdentifier::new(), provider, RemoteId::from("R9"));
        store.save_sync_mapping(mapping.clone()).await.unwrap();
        store.save_to_file(&path).unwrap();

        let reloaded = InMemoryMappingStore::from_file(&path).unwrap();
        let mappings = reloaded.get_sync_mapping(provider).await.unwrap();
        assert!(mappings.contains(&mapping));
    }
}
