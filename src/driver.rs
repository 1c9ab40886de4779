//! The run driver: the single public entry point that coordinates one sync
//! run end to end, grounded on `kitchen-fridge::provider::Provider::sync`/
//! `run_sync`/`run_sync_inner`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::adapter::RemoteAdapter;
use crate::defaults::ProviderPreferences;
use crate::error::{StoreError, SyncError};
use crate::ids::{ProviderId, RemoteId};
use crate::mapping::MappingStore;
use crate::reconcile::progress::{RunStats, SyncProgress};
use crate::reconcile::{CancellationToken, Reconciler};
use crate::reminders::ReminderScheduler;
use crate::store::{LocalStore, TagStore};
use crate::sync_data::SyncData;

/// Guarantees at most one in-flight run per provider (§5 of SPEC_FULL.md).
#[derive(Clone, Default)]
pub struct RunRegistry(Arc<Mutex<HashSet<ProviderId>>>);

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&self, provider: ProviderId) -> Result<RunGuard, SyncError> {
        let mut set = self.0.lock().unwrap();
        if !set.insert(provider) {
            return Err(SyncError::AlreadyRunning(provider));
        }
        Ok(RunGuard {
            registry: self.0.clone(),
            provider,
        })
    }

    /// Test-only hook: holds the registry's slot for `provider` until the
    /// returned guard is dropped, so callers can exercise the rejection path
    /// without a real concurrent run.
    #[doc(hidden)]
    pub fn begin_for_test(&self, provider: ProviderId) -> impl Drop {
        self.begin(provider).expect("provider already running")
    }
}

struct RunGuard {
    registry: Arc<Mutex<HashSet<ProviderId>>>,
    provider: ProviderId,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.lock().unwrap().remove(&self.provider);
    }
}

#[derive(Clone, Debug)]
pub struct RunContext {
    pub provider: ProviderId,
    pub provider_display_name: String,
    pub preferences: ProviderPreferences,
    pub cancellation: CancellationToken,
}

impl RunContext {
    pub fn new(provider: ProviderId, provider_display_name: impl Into<String>) -> Self {
        Self {
            provider,
            provider_display_name: provider_display_name.into(),
            preferences: ProviderPreferences::default(),
            cancellation: CancellationToken::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    Store,
    AlreadyRunning,
}

#[derive(Debug)]
pub enum RunOutcome {
    Success { stats: RunStats, log: Vec<String> },
    Failure { kind: FailureKind, detail: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }
}

/// Runs one sync for `context.provider` against `adapter`/`store`/`mappings`,
/// reporting through `reporter`.
pub async fn run<A, S, M>(
    context: &RunContext,
    registry: &RunRegistry,
    adapter: &A,
    store: &S,
    mappings: &M,
    reminders: &dyn ReminderScheduler,
    reporter: &mut SyncProgress,
) -> RunOutcome
where
    A: RemoteAdapter,
    S: LocalStore + TagStore,
    M: MappingStore,
{
    let _guard = match registry.begin(context.provider) {
        Ok(guard) => guard,
        Err(_) => {
            return RunOutcome::Failure {
                kind: FailureKind::AlreadyRunning,
                detail: format!("a sync for provider {} is already running", context.provider),
            }
        }
    };

    reporter.started();

    let remote_tasks = match adapter.fetch_remote_tasks(context.provider).await {
        Ok(tasks) => tasks,
        Err(SyncError::Auth { detail, .. }) => {
            reporter.finished(false);
            return RunOutcome::Failure { kind: FailureKind::Auth, detail };
        }
        Err(err) => {
            reporter.finished(false);
            return RunOutcome::Failure { kind: FailureKind::Store, detail: err.to_string() };
        }
    };

    let mut data = match SyncData::build(context.provider, &remote_tasks, store, mappings).await {
        Ok(data) => data,
        Err(err) => {
            reporter.finished(false);
            return RunOutcome::Failure { kind: FailureKind::Store, detail: err.to_string() };
        }
    };

    let mut remote_map: HashMap<RemoteId, _> = remote_tasks
        .into_iter()
        .map(|proxy| (proxy.remote_id.clone(), proxy))
        .collect();

    let reconciler = Reconciler::new(
        context.provider,
        adapter,
        store,
        mappings,
        &context.preferences,
        reminders,
    );

    let mut stats = RunStats::default();

    reconciler
        .phase1_create(&mut data, reporter, &mut stats, &context.cancellation)
        .await;
    reconciler
        .phase2_delete(&mut data, reporter, &mut stats, &context.cancellation)
        .await;
    reconciler
        .phase3_update(&mut data, &mut remote_map, reporter, &mut stats, &context.cancellation)
        .await;
    reconciler
        .phase4_apply(&mut data, remote_map, reporter, &mut stats, &context.cancellation)
        .await;

    if let Err(err) = finalize(context.provider, store, mappings).await {
        reporter.finished(false);
        return RunOutcome::Failure { kind: FailureKind::Store, detail: err.to_string() };
    }

    let log = reporter
        .remote_log()
        .iter()
        .chain(reporter.local_log())
        .cloned()
        .collect();

    if let Some(text) = reporter.summary(
        &context.provider_display_name,
        &stats,
        context.preferences.suppress_summary_dialog,
    ) {
        log::info!("{}", text);
    }
    reporter.finished(true);

    RunOutcome::Success { stats, log }
}

/// Clears the per-provider "updated" marker: the mapping store is the
/// canonical owner of the bit (see mapping.rs); `clear_updated_task_list` is
/// still called so any store-side mirror of it is cleared too.
async fn finalize<S: LocalStore, M: MappingStore>(
    provider: ProviderId,
    store: &S,
    mappings: &M,
) -> Result<(), StoreError> {
    let current = mappings.get_sync_mapping(provider).await?;
    for mut mapping in current {
        if mapping.updated {
            mapping.updated = false;
            mappings.save_sync_mapping(mapping).await?;
        }
    }
    store.clear_updated_task_list(provider).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_rejects_concurrent_runs_for_the_same_provider() {
        let registry = RunRegistry::new();
        let provider = ProviderId(1);
        let guard = registry.begin(provider).unwrap();
        assert!(registry.begin(provider).is_err());
        drop(guard);
        assert!(registry.begin(provider).is_ok());
    }
}
