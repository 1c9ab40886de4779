//! The local store façade: task and tag persistence, as consumed by the
//! reconciler. Mirrors the split between `kitchen-fridge`'s `CompleteCalendar`
//! (full local CRUD) and `BaseCalendar` (shared item/property surface).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::ids::{ProviderId, TagIdentifier, TaskIdentifier};
use crate::tag::Tag;
use crate::task::Task;

#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn fetch_task_for_sync(&self, id: TaskIdentifier) -> Result<Option<Task>, StoreError>;

    /// Name-based fallback lookup, used by the rescue heuristic.
    async fn search_for_task_for_sync(&self, name: &str) -> Result<Option<Task>, StoreError>;

    async fn save_task(&self, task: Task) -> Result<(), StoreError>;

    async fn delete_task(&self, id: TaskIdentifier) -> Result<(), StoreError>;

    /// Tasks that have not been locally (soft-)deleted.
    async fn get_active_task_identifiers(&self) -> Result<HashSet<TaskIdentifier>, StoreError>;

    /// All tasks, including ones locally (soft-)deleted but not yet purged.
    async fn get_all_task_identifiers(&self) -> Result<HashSet<TaskIdentifier>, StoreError>;

    /// Clears whatever store-side bookkeeping mirrors the mapping store's
    /// per-task "updated" bit for this provider (e.g. a UI-facing dirty view).
    async fn clear_updated_task_list(&self, provider: ProviderId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn get_all_tags_as_map(&self) -> Result<HashMap<TagIdentifier, Tag>, StoreError>;
    async fn get_task_tags(&self, id: TaskIdentifier) -> Result<HashSet<TagIdentifier>, StoreError>;
    async fn create_tag(&self, name: String) -> Result<TagIdentifier, StoreError>;
    async fn add_tag(&self, task: TaskIdentifier, tag: TagIdentifier) -> Result<(), StoreError>;
    async fn remove_tag(&self, task: TaskIdentifier, tag: TagIdentifier) -> Result<(), StoreError>;
}

/// Reference in-memory implementation of both [`LocalStore`] and [`TagStore`],
/// used by tests and by hosts that don't need real durability -- the
/// in-process analogue of `kitchen-fridge::cache::Cache`.
#[derive(Default)]
pub struct InMemoryLocalStore {
    tasks: Mutex<HashMap<TaskIdentifier, Task>>,
    soft_deleted: Mutex<HashSet<TaskIdentifier>>,
    tags: Mutex<HashMap<TagIdentifier, Tag>>,
    task_tags: Mutex<HashMap<TaskIdentifier, HashSet<TagIdentifier>>>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/host convenience: insert a task directly, bypassing `save_task`.
    pub fn insert_task(&self, task: Task) -> TaskIdentifier {
        let id = task.id();
        self.tasks.lock().unwrap().insert(id, task);
        id
    }

    /// Test/host convenience: mark a task as locally (soft-)deleted, removing
    /// it from `getActiveTaskIdentifiers` while it remains in `getAll...`.
    pub fn mark_deleted(&self, id: TaskIdentifier) {
        self.soft_deleted.lock().unwrap().insert(id);
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn fetch_task_for_sync(&self, id: TaskIdentifier) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }

    async fn search_for_task_for_sync(&self, name: &str) -> Result<Option<Task>, StoreError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .find(|t| t.name() == name)
            .cloned())
    }

    async fn save_task(&self, task: Task) -> Result<(), StoreError> {
        self.tasks.lock().unwrap().insert(task.id(), task);
        Ok(())
    }

    async fn delete_task(&self, id: TaskIdentifier) -> Result<(), StoreError> {
        self.tasks.lock().unwrap().remove(&id);
        self.soft_deleted.lock().unwrap().remove(&id);
        self.task_tags.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn get_active_task_identifiers(&self) -> Result<HashSet<TaskIdentifier>, StoreError> {
        let tasks = self.tasks.lock().unwrap();
        let deleted = self.soft_deleted.lock().unwrap();
        Ok(tasks.keys().filter(|id| !deleted.contains(id)).cloned().collect())
    }

    async fn get_all_task_identifiers(&self) -> Result<HashSet<TaskIdentifier>, StoreError> {
        Ok(self.tasks.lock().unwrap().keys().cloned().collect())
    }

    async fn clear_updated_task_list(&self, _provider: ProviderId) -> Result<(), StoreError> {
        // The reference store keeps no provider-scoped dirty mirror of its own;
        // the mapping store is the sole owner of the updated bit (see mapping.rs).
        Ok(())
    }
}

#[async_trait]
impl TagStore for InMemoryLocalStore {
    async fn get_all_tags_as_map(&self) -> Result<HashMap<TagIdentifier, Tag>, StoreError> {
        Ok(self.tags.lock().unwrap().clone())
    }

    async fn get_task_tags(&self, id: TaskIdentifier) -> Result<HashSet<TagIdentifier>, StoreError> {
        Ok(self.task_tags.lock().unwrap().get(&id).cloned().unwrap_or_default())
    }

    async fn create_tag(&self, name: String) -> Result<TagIdentifier, StoreError> {
        let id = TagIdentifier::new();
        self.tags.lock().unwrap().insert(id, Tag::new(id, name));
        Ok(id)
    }

    async fn add_tag(&self, task: TaskIdentifier, tag: TagIdentifier) -> Result<(), StoreError> {
        self.task_tags.lock().unwrap().entry(task).or_default().insert(tag);
        Ok(())
    }

    async fn remove_tag(&self, task: TaskIdentifier, tag: TagIdentifier) -> Result<(), StoreError> {
        if let Some(set) = self.task_tags.lock().unwrap().get_mut(&task) {
            set.remove(&tag);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn soft_deleted_task_is_in_all_but_not_active() {
        let store = InMemoryLocalStore::new();
        let id = store.insert_task(Task::new("Gym"));
        store.mark_deleted(id);

        assert!(store.get_all_task_identifiers().await.unwrap().contains(&id));
        assert!(!store.get_active_task_identifiers().await.unwrap().contains(&id));
    }

    #[tokio::test]
    async fn search_for_task_for_sync_matches_by_name() {
        let store = InMemoryLocalStore::new();
        store.insert_task(Task::new("Write report"));

        let found = store.search_for_task_for_sync("Write report").await.unwrap();
        assert!(found.is_some());
        assert!(store.search_for_task_for_sync("nope").await.unwrap().is_none());
    }
}
