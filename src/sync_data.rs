//! Builds the run-scoped snapshot the reconciler walks: indices over the
//! mapping store joined against the local store, plus the work sets for the
//! four phases.

use std::collections::{HashMap, HashSet};

use crate::error::SyncResult;
use crate::ids::{ProviderId, RemoteId, TagIdentifier, TaskIdentifier};
use crate::mapping::{MappingStore, SyncMapping};
use crate::proxy::TaskProxy;
use crate::store::{LocalStore, TagStore};
use crate::tag::Tag;

#[derive(Debug)]
pub struct SyncData {
    pub mappings: HashSet<SyncMapping>,
    pub active_tasks: HashSet<TaskIdentifier>,
    pub all_tasks: HashSet<TaskIdentifier>,
    pub remote_id_to_mapping: HashMap<RemoteId, SyncMapping>,
    pub local_id_to_mapping: HashMap<TaskIdentifier, SyncMapping>,
    pub local_changes: HashSet<SyncMapping>,
    pub mapped_tasks: HashSet<TaskIdentifier>,
    pub remote_change_map: HashMap<TaskIdentifier, TaskProxy>,
    pub new_remote_tasks: HashMap<String, TaskProxy>,
    pub tags: HashMap<TagIdentifier, Tag>,
    pub tags_by_lowercase_name: HashMap<String, TagIdentifier>,
    pub newly_created_tasks: HashSet<TaskIdentifier>,
    pub deleted_tasks: HashSet<TaskIdentifier>,
}

impl SyncData {
    /// Builds the snapshot. Construction order is fixed: `mappings` ->
    /// indices -> `remote_change_map`/`new_remote_tasks` -> work sets.
    pub async fn build<S>(
        provider: ProviderId,
        remote_tasks: &[TaskProxy],
        store: &S,
        mapping_store: &dyn MappingStore,
    ) -> SyncResult<Self>
    where
        S: LocalStore + TagStore + ?Sized,
    {
        let mappings = mapping_store.get_sync_mapping(provider).await?;

        let mut remote_id_to_mapping = HashMap::new();
        let mut local_id_to_mapping = HashMap::new();
        for mapping in &mappings {
            remote_id_to_mapping.insert(mapping.remote_id.clone(), mapping.clone());
            local_id_to_mapping.insert(mapping.local_task_id, mapping.clone());
        }

        let mut remote_change_map = HashMap::new();
        let mut new_remote_tasks = HashMap::new();
        for proxy in remote_tasks {
            match remote_id_to_mapping.get(&proxy.remote_id) {
                Some(mapping) => {
                    remote_change_map.insert(mapping.local_task_id, proxy.clone());
                }
                None => {
                    new_remote_tasks.insert(proxy.name.clone(), proxy.clone());
                }
            }
        }

        let local_changes: HashSet<SyncMapping> =
            mappings.iter().filter(|m| m.updated).cloned().collect();
        let mapped_tasks: HashSet<TaskIdentifier> =
            mappings.iter().map(|m| m.local_task_id).collect();

        let active_tasks = store.get_active_task_identifiers().await?;
        let all_tasks = store.get_all_task_identifiers().await?;

        let tags = store.get_all_tags_as_map().await?;
        let tags_by_lowercase_name = tags.values().map(|t| (t.normalized(), t.id())).collect();

        let newly_created_tasks: HashSet<TaskIdentifier> =
            active_tasks.difference(&mapped_tasks).cloned().collect();
        let deleted_tasks: HashSet<TaskIdentifier> =
            mapped_tasks.difference(&all_tasks).cloned().collect();

        Ok(Self {
            mappings,
            active_tasks,
            all_tasks,
            remote_id_to_mapping,
            local_id_to_mapping,
            local_changes,
            mapped_tasks,
            remote_change_map,
            new_remote_tasks,
            tags,
            tags_by_lowercase_name,
            newly_created_tasks,
            deleted_tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProviderId;
    use crate::mapping::InMemoryMappingStore;
    use crate::store::InMemoryLocalStore;
    use crate::task::Task;

    #[tokio::test]
    async fn newly_created_and_deleted_sets_are_derived_correctly() {
        let store = InMemoryLocalStore::new();
        let mappings = InMemoryMappingStore::new();
        let provider = ProviderId(1);

        let unmapped = store.insert_task(Task::new("Fresh local"));
        let mapped_and_gone = TaskIdentifier::new();

        let mapping = SyncMapping::new(mapped_and_gone, provider, RemoteId::from("R1"));
        mappings.save_sync_mapping(mapping).await.unwrap();

        let data = SyncData::build(provider, &[], &store, &mappings).await.unwrap();

        assert!(data.newly_created_tasks.contains(&unmapped));
        assert!(data.deleted_tasks.contains(&mapped_and_gone));
    }
}
