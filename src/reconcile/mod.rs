//! The reconciler: the four-phase algorithm (CREATE, DELETE, UPDATE,
//! REMOTE-APPLY), grounded on `kitchen-fridge::provider::Provider`'s
//! `calculate_item_changes`/`commit_item_changes` split, generalized from
//! CalDAV items to tasks and a single pluggable remote adapter.

pub mod progress;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapter::RemoteAdapter;
use crate::defaults::{self, ProviderPreferences};
use crate::error::StoreError;
use crate::ids::{ProviderId, RemoteId, TaskIdentifier};
use crate::mapping::{MappingStore, SyncMapping};
use crate::merge;
use crate::proxy::TaskProxy;
use crate::reminders::ReminderScheduler;
use crate::store::{LocalStore, TagStore};
use crate::sync_data::SyncData;
use crate::task::Task;

use self::progress::{LogSection, RunStats, SyncProgress};

/// Checked between tasks (never mid-task); a cancelled run leaves the
/// mapping store in a consistent, resumable state.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Reconciler<'a, A, S, M>
where
    A: RemoteAdapter,
    S: LocalStore + TagStore,
    M: MappingStore,
{
    provider: ProviderId,
    adapter: &'a A,
    local: &'a S,
    mappings: &'a M,
    preferences: &'a ProviderPreferences,
    reminders: &'a dyn ReminderScheduler,
}

impl<'a, A, S, M> Reconciler<'a, A, S, M>
where
    A: RemoteAdapter,
    S: LocalStore + TagStore,
    M: MappingStore,
{
    pub fn new(
        provider: ProviderId,
        adapter: &'a A,
        local: &'a S,
        mappings: &'a M,
        preferences: &'a ProviderPreferences,
        reminders: &'a dyn ReminderScheduler,
    ) -> Self {
        Self {
            provider,
            adapter,
            local,
            mappings,
            preferences,
            reminders,
        }
    }

    async fn task_tag_names(&self, task_id: TaskIdentifier, data: &SyncData) -> Vec<String> {
        match self.local.get_task_tags(task_id).await {
            Ok(ids) => ids
                .into_iter()
                .filter_map(|id| data.tags.get(&id))
                .map(|t| t.name().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Phase 1: local-only active tasks are pushed to the remote, unless a
    /// same-named unmapped remote task rescues them from a duplicate create.
    pub async fn phase1_create(
        &self,
        data: &mut SyncData,
        reporter: &mut SyncProgress,
        stats: &mut RunStats,
        cancel: &CancellationToken,
    ) {
        let candidates: Vec<TaskIdentifier> = data.newly_created_tasks.iter().cloned().collect();

        for local_id in candidates {
            if cancel.is_cancelled() {
                break;
            }

            let task = match self.local.fetch_task_for_sync(local_id).await {
                Ok(Some(t)) => t,
                Ok(None) => {
                    reporter.warn(&format!("create: task {} vanished locally, skipping", local_id));
                    continue;
                }
                Err(err) => {
                    reporter.warn(&format!("create: failed to load task {}: {}", local_id, err));
                    continue;
                }
            };

            if let Some(remote_match) = data.new_remote_tasks.get(&task.name()).cloned() {
                let mapping = SyncMapping::new(local_id, self.provider, remote_match.remote_id.clone());
                if let Err(err) = self.mappings.save_sync_mapping(mapping.clone()).await {
                    reporter.warn(&format!(
                        "create: rescue mapping save failed for '{}': {}",
                        task.name(),
                        err
                    ));
                    continue;
                }
                data.local_id_to_mapping.insert(local_id, mapping.clone());
                data.remote_id_to_mapping.insert(mapping.remote_id.clone(), mapping.clone());
                data.mapped_tasks.insert(local_id);
                data.local_changes.insert(mapping);
                data.remote_change_map.insert(local_id, remote_match.clone());
                data.new_remote_tasks.remove(task.name());
                reporter.label(
                    format!("matched '{}' to an existing remote task", task.name()),
                    LogSection::Remote,
                );
                continue;
            }

            let tag_names = self.task_tag_names(local_id, data).await;

            match self.adapter.create_task(self.provider, &task).await {
                Err(err) => {
                    reporter.label(format!("error creating '{}': {}", task.name(), err), LogSection::Remote);
                    continue;
                }
                Ok(remote_id) => {
                    let mapping = SyncMapping::new(local_id, self.provider, remote_id.clone());
                    if let Err(err) = self.mappings.save_sync_mapping(mapping.clone()).await {
                        reporter.warn(&format!(
                            "create: mapping save failed for '{}': {}",
                            task.name(),
                            err
                        ));
                        continue;
                    }
                    data.local_id_to_mapping.insert(local_id, mapping.clone());
                    data.remote_id_to_mapping.insert(remote_id.clone(), mapping.clone());
                    data.mapped_tasks.insert(local_id);

                    let proxy = TaskProxy::from_task(&task, self.provider, remote_id, tag_names);
                    if let Err(err) = self.adapter.push_task(&proxy, None, &mapping).await {
                        reporter.label(format!("error sending '{}': {}", task.name(), err), LogSection::Remote);
                        continue;
                    }
                }
            }

            stats.remote_created_tasks += 1;
            reporter.label(format!("added '{}'", task.name()), LogSection::Remote);
        }
    }

    /// Phase 2: mapped tasks that are now locally (soft-)deleted are removed
    /// remotely, then their mapping is dropped.
    pub async fn phase2_delete(
        &self,
        data: &mut SyncData,
        reporter: &mut SyncProgress,
        stats: &mut RunStats,
        cancel: &CancellationToken,
    ) {
        let candidates: Vec<TaskIdentifier> = data.deleted_tasks.iter().cloned().collect();

        for local_id in candidates {
            if cancel.is_cancelled() {
                break;
            }

            let mapping = match data.local_id_to_mapping.get(&local_id).cloned() {
                Some(m) => m,
                None => {
                    reporter.warn(&format!("delete: no mapping for task {}", local_id));
                    continue;
                }
            };

            if let Err(err) = self.adapter.delete_task(&mapping).await {
                reporter.label(format!("error deleting id #{}: {}", local_id, err), LogSection::Remote);
                continue;
            }

            let _ = self.mappings.delete_sync_mapping(&mapping).await;
            data.local_changes.remove(&mapping);
            data.local_id_to_mapping.remove(&local_id);
            data.remote_id_to_mapping.remove(&mapping.remote_id);
            data.remote_change_map.remove(&local_id);

            stats.remote_deleted_tasks += 1;
            reporter.label(format!("deleted id #{}", local_id), LogSection::Remote);
        }
    }

    /// Phase 3: dirty mapped tasks are pushed, merging against a conflicting
    /// remote change first. Conflicting pushes are refetched so phase 4
    /// observes the reconciled remote state rather than the stale snapshot.
    pub async fn phase3_update(
        &self,
        data: &mut SyncData,
        remote_tasks: &mut HashMap<RemoteId, TaskProxy>,
        reporter: &mut SyncProgress,
        stats: &mut RunStats,
        cancel: &CancellationToken,
    ) {
        let candidates: Vec<SyncMapping> = data.local_changes.iter().cloned().collect();

        for mapping in candidates {
            if cancel.is_cancelled() {
                break;
            }

            let task = match self.local.fetch_task_for_sync(mapping.local_task_id).await {
                Ok(Some(t)) => t,
                Ok(None) => {
                    reporter.warn(&format!("update: task {} vanished locally", mapping.local_task_id));
                    continue;
                }
                Err(err) => {
                    reporter.warn(&format!(
                        "update: failed to load task {}: {}",
                        mapping.local_task_id, err
                    ));
                    continue;
                }
            };

            let tag_names = self.task_tag_names(mapping.local_task_id, data).await;
            let mut local_proxy = TaskProxy::from_task(&task, self.provider, mapping.remote_id.clone(), tag_names);

            let conflict = data.remote_change_map.get(&mapping.local_task_id).cloned();
            if let Some(remote_proxy) = &conflict {
                merge::merge(&mut local_proxy, remote_proxy);
                stats.merged_tasks += 1;
            }

            if let Err(err) = self.adapter.push_task(&local_proxy, conflict.as_ref(), &mapping).await {
                reporter.label(format!("error sending '{}': {}", task.name(), err), LogSection::Remote);
                continue;
            }

            match conflict {
                Some(_) => match self.adapter.refetch_task(&local_proxy).await {
                    Ok(reconciled) => {
                        remote_tasks.insert(mapping.remote_id.clone(), reconciled);
                    }
                    Err(err) => {
                        reporter.warn(&format!("update: refetch of '{}' failed: {}", task.name(), err));
                    }
                },
                None => {
                    stats.remote_updated_tasks += 1;
                }
            }
        }
    }

    /// Phase 4: every remaining remote task (including phase-3 rewrites) is
    /// applied locally.
    pub async fn phase4_apply(
        &self,
        data: &mut SyncData,
        remote_tasks: HashMap<RemoteId, TaskProxy>,
        reporter: &mut SyncProgress,
        stats: &mut RunStats,
        cancel: &CancellationToken,
    ) {
        for (remote_id, remote_task) in remote_tasks {
            if cancel.is_cancelled() {
                break;
            }

            let existing_mapping = data.remote_id_to_mapping.get(&remote_id).cloned();
            let was_already_synced = existing_mapping.is_some();

            let local_id = match existing_mapping {
                None => {
                    if remote_task.is_deleted {
                        continue;
                    }
                    match self.materialize_unmapped(&remote_task, reporter).await {
                        Some(id) => id,
                        None => continue,
                    }
                }
                Some(mapping) => {
                    if remote_task.is_deleted {
                        if let Err(err) = self.local.delete_task(mapping.local_task_id).await {
                            reporter.warn(&format!(
                                "apply: failed to delete local task {}: {}",
                                mapping.local_task_id, err
                            ));
                            continue;
                        }
                        let _ = self.mappings.delete_sync_mapping(&mapping).await;
                        data.local_id_to_mapping.remove(&mapping.local_task_id);
                        data.remote_id_to_mapping.remove(&remote_id);
                        stats.local_deleted_tasks += 1;
                        reporter.label(format!("deleted '{}'", remote_task.name), LogSection::Local);
                        continue;
                    }
                    mapping.local_task_id
                }
            };

            let mut task = match self.local.fetch_task_for_sync(local_id).await {
                Ok(Some(t)) => t,
                Ok(None) => {
                    reporter.warn(&format!("apply: task {} vanished locally", local_id));
                    continue;
                }
                Err(err) => {
                    reporter.warn(&format!("apply: failed to load task {}: {}", local_id, err));
                    continue;
                }
            };

            // Already-synced tasks whose remote side hasn't moved since the
            // last apply carry no new information; skip re-applying them so
            // an unchanged remote produces zero counters (idempotence law).
            if was_already_synced && remote_task.last_modified <= task.last_modified() {
                continue;
            }

            task.apply_remote(&remote_task);

            if let Err(err) = self.local.save_task(task.clone()).await {
                reporter.warn(&format!("apply: failed to save task {}: {}", local_id, err));
                continue;
            }

            self.reconcile_tags(data, local_id, &remote_task.tags, reporter).await;

            let had_mapping = data.local_id_to_mapping.contains_key(&local_id);
            if !had_mapping {
                let new_mapping = SyncMapping {
                    updated: false,
                    ..SyncMapping::new(local_id, self.provider, remote_id.clone())
                };
                match self.mappings.save_sync_mapping(new_mapping.clone()).await {
                    Ok(()) => {
                        data.local_id_to_mapping.insert(local_id, new_mapping.clone());
                        data.remote_id_to_mapping.insert(remote_id.clone(), new_mapping);
                        stats.local_created_tasks += 1;
                    }
                    Err(StoreError::UniqueViolation(detail)) => {
                        reporter.label(
                            format!("mapping for '{}' deferred to next sync: {}", remote_task.name, detail),
                            LogSection::Local,
                        );
                    }
                    Err(err) => {
                        reporter.warn(&format!(
                            "apply: failed to persist mapping for '{}': {}",
                            remote_task.name, err
                        ));
                    }
                }
            }

            self.reminders.rearm(&task).await;

            stats.local_updated_tasks += 1;
            reporter.label(format!("updated '{}'", remote_task.name), LogSection::Local);
        }

        stats.local_updated_tasks = stats.local_updated_tasks.saturating_sub(stats.local_created_tasks);
    }

    async fn materialize_unmapped(&self, remote_task: &TaskProxy, reporter: &mut SyncProgress) -> Option<TaskIdentifier> {
        match self.local.search_for_task_for_sync(&remote_task.name).await {
            Ok(Some(found)) => Some(found.id()),
            Ok(None) => {
                let id = TaskIdentifier::new();
                let mut fresh = Task::new_from_proxy(id, remote_task);
                defaults::apply_defaults(self.preferences, &mut fresh);
                if let Err(err) = self.local.save_task(fresh).await {
                    reporter.warn(&format!(
                        "apply: failed to create local task for '{}': {}",
                        remote_task.name, err
                    ));
                    return None;
                }
                Some(id)
            }
            Err(err) => {
                reporter.warn(&format!("apply: search failed for '{}': {}", remote_task.name, err));
                None
            }
        }
    }

    async fn reconcile_tags(
        &self,
        data: &mut SyncData,
        local_id: TaskIdentifier,
        remote_tag_names: &[String],
        reporter: &mut SyncProgress,
    ) {
        let mut remote_ids = std::collections::HashSet::new();

        for raw_name in remote_tag_names {
            let normalized = raw_name.to_lowercase();
            let tag_id = match data.tags_by_lowercase_name.get(&normalized) {
                Some(id) => *id,
                None => match self.local.create_tag(raw_name.clone()).await {
                    Ok(id) => {
                        data.tags.insert(id, crate::tag::Tag::new(id, raw_name.clone()));
                        data.tags_by_lowercase_name.insert(normalized, id);
                        id
                    }
                    Err(err) => {
                        reporter.warn(&format!("apply: failed to create tag '{}': {}", raw_name, err));
                        continue;
                    }
                },
            };
            remote_ids.insert(tag_id);
        }

        let local_tags = match self.local.get_task_tags(local_id).await {
            Ok(t) => t,
            Err(err) => {
                reporter.warn(&format!("apply: failed to read tags for task {}: {}", local_id, err));
                return;
            }
        };

        let to_remove: Vec<_> = local_tags.difference(&remote_ids).cloned().collect();
        let to_add: Vec<_> = remote_ids.difference(&local_tags).cloned().collect();

        for tag_id in to_remove {
            if let Err(err) = self.local.remove_tag(local_id, tag_id).await {
                reporter.warn(&format!("apply: failed to remove a tag from task {}: {}", local_id, err));
            }
        }
        for tag_id in to_add {
            if let Err(err) = self.local.add_tag(local_id, tag_id).await {
                reporter.warn(&format!("apply: failed to add a tag to task {}: {}", local_id, err));
            }
        }
    }
}
