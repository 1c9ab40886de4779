//! End-to-end reconciliation scenarios, run against the scripted-failure mock
//! remote. Mirrors `kitchen-fridge`'s `tests/sync.rs`: the real scenarios
//! live behind the `mock-remote` feature; without it, each scenario function
//! is a stub that tells the caller how to enable it.

#[cfg(feature = "mock-remote")]
mod enabled {
    use tasksync::adapter::mock::{MockAdapter, MockBehaviour};
    use tasksync::reminders::NullReminderScheduler;
    use tasksync::{
        run, InMemoryLocalStore, InMemoryMappingStore, LocalStore, MappingStore, ProviderId,
        ProviderPreferences, RemoteId, RunContext, RunRegistry, SyncMapping, SyncProgress, Task,
        TagStore, TaskProxy,
    };

    fn init_log() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn remote_proxy(provider: ProviderId, remote_id: &str, name: &str) -> TaskProxy {
        let mut proxy = TaskProxy::placeholder(provider);
        proxy.remote_id = RemoteId::from(remote_id);
        proxy.name = name.to_string();
        proxy
    }

    /// Scenario 1: fresh local, empty remote.
    #[tokio::test]
    async fn fresh_local_creates_remotely() {
        init_log();
        let provider = ProviderId(1);
        let local = InMemoryLocalStore::new();
        local.insert_task(Task::new("Buy milk"));
        let mappings = InMemoryMappingStore::new();
        let adapter = MockAdapter::new();

        let context = RunContext::new(provider, "Test Provider");
        let registry = RunRegistry::new();
        let mut reporter = SyncProgress::new();

        let outcome = run(
            &context,
            &registry,
            &adapter,
            &local,
            &mappings,
            &NullReminderScheduler,
            &mut reporter,
        )
        .await;

        match outcome {
            tasksync::RunOutcome::Success { stats, .. } => {
                assert_eq!(stats.remote_created_tasks, 1);
                assert_eq!(stats.remote_updated_tasks, 0);
            }
            other => panic!("expected success, got {:?}", other),
        }

        let persisted = mappings.get_sync_mapping(provider).await.unwrap();
        assert_eq!(persisted.len(), 1);
    }

    /// Scenario 2: name-based rescue avoids a duplicate remote create.
    #[tokio::test]
    async fn name_based_rescue_avoids_duplicate_create() {
        init_log();
        let provider = ProviderId(1);
        let local = InMemoryLocalStore::new();
        local.insert_task(Task::new("Write report"));

        let mappings = InMemoryMappingStore::new();
        let adapter = MockAdapter::new();
        adapter.seed(remote_proxy(provider, "R9", "Write report"));

        let context = RunContext::new(provider, "Test Provider");
        let registry = RunRegistry::new();
        let mut reporter = SyncProgress::new();

        let outcome = run(
            &context,
            &registry,
            &adapter,
            &local,
            &mappings,
            &NullReminderScheduler,
            &mut reporter,
        )
        .await;

        match outcome {
            tasksync::RunOutcome::Success { stats, .. } => {
                assert_eq!(stats.remote_created_tasks, 0, "no duplicate create expected");
                assert_eq!(stats.merged_tasks, 1);
            }
            other => panic!("expected success, got {:?}", other),
        }

        let persisted = mappings.get_sync_mapping(provider).await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted.iter().next().unwrap().remote_id, RemoteId::from("R9"));
    }

    /// Scenario 3: a remote deletion propagates to the local store.
    #[tokio::test]
    async fn remote_deletion_propagates_locally() {
        init_log();
        let provider = ProviderId(1);
        let local = InMemoryLocalStore::new();
        let local_id = local.insert_task(Task::new("Gym"));

        let mappings = InMemoryMappingStore::new();
        let mapping = SyncMapping {
            updated: false,
            ..SyncMapping::new(local_id, provider, RemoteId::from("R2"))
        };
        mappings.save_sync_mapping(mapping).await.unwrap();

        let adapter = MockAdapter::new();
        let mut deleted = remote_proxy(provider, "R2", "Gym");
        deleted.is_deleted = true;
        adapter.seed(deleted);

        let context = RunContext::new(provider, "Test Provider");
        let registry = RunRegistry::new();
        let mut reporter = SyncProgress::new();

        let outcome = run(
            &context,
            &registry,
            &adapter,
            &local,
            &mappings,
            &NullReminderScheduler,
            &mut reporter,
        )
        .await;

        match outcome {
            tasksync::RunOutcome::Success { stats, .. } => {
                assert_eq!(stats.local_deleted_tasks, 1);
            }
            other => panic!("expected success, got {:?}", other),
        }

        assert!(local.fetch_task_for_sync(local_id).await.unwrap().is_none());
        assert!(mappings.get_sync_mapping(provider).await.unwrap().is_empty());
    }

    /// Scenario 4: a local-remote conflict merges, preferring the longer notes.
    #[tokio::test]
    async fn local_remote_conflict_merges_notes() {
        init_log();
        let provider = ProviderId(1);
        let local = InMemoryLocalStore::new();
        let mut task = Task::new("Taxes");
        task.set_notes("filed");
        let local_id = local.insert_task(task);

        let mappings = InMemoryMappingStore::new();
        let mapping = SyncMapping::new(local_id, provider, RemoteId::from("R3"));
        mappings.save_sync_mapping(mapping).await.unwrap();

        let adapter = MockAdapter::new();
        let mut remote = remote_proxy(provider, "R3", "Taxes");
        remote.notes = "filed 2024".to_string();
        adapter.seed(remote);

        let context = RunContext::new(provider, "Test Provider");
        let registry = RunRegistry::new();
        let mut reporter = SyncProgress::new();

        let outcome = run(
            &context,
            &registry,
            &adapter,
            &local,
            &mappings,
            &NullReminderScheduler,
            &mut reporter,
        )
        .await;

        match outcome {
            tasksync::RunOutcome::Success { stats, .. } => {
                assert_eq!(stats.merged_tasks, 1);
            }
            other => panic!("expected success, got {:?}", other),
        }

        let merged = local.fetch_task_for_sync(local_id).await.unwrap().unwrap();
        assert_eq!(merged.notes(), "filed 2024");
    }

    /// Scenario 5: tag case-insensitive dedup.
    #[tokio::test]
    async fn tag_reconciliation_is_case_insensitive() {
        init_log();
        let provider = ProviderId(1);
        let local = InMemoryLocalStore::new();
        let local_id = local.insert_task(Task::new("Errands task"));
        let home_tag = local.create_tag("Home".to_string()).await.unwrap();
        local.add_tag(local_id, home_tag).await.unwrap();

        let mappings = InMemoryMappingStore::new();
        let mapping = SyncMapping::new(local_id, provider, RemoteId::from("R4"));
        mappings.save_sync_mapping(mapping).await.unwrap();

        let adapter = MockAdapter::new();
        let mut remote = remote_proxy(provider, "R4", "Errands task");
        remote.tags = vec!["home".to_string(), "Errands".to_string()];
        adapter.seed(remote);

        let context = RunContext::new(provider, "Test Provider");
        let registry = RunRegistry::new();
        let mut reporter = SyncProgress::new();

        run(
            &context,
            &registry,
            &adapter,
            &local,
            &mappings,
            &NullReminderScheduler,
            &mut reporter,
        )
        .await;

        let tags = local.get_task_tags(local_id).await.unwrap();
        assert_eq!(tags.len(), 2, "expected no duplicate 'home' tag");
    }

    /// Scenario 6: a transient push failure on one task does not abort the run.
    #[tokio::test]
    async fn transient_push_failure_is_per_task() {
        init_log();
        let provider = ProviderId(1);
        let local = InMemoryLocalStore::new();
        local.insert_task(Task::new("First"));
        local.insert_task(Task::new("Second"));

        let mappings = InMemoryMappingStore::new();
        let adapter = MockAdapter::with_behaviour(MockBehaviour {
            create_task: (1, 1),
            ..MockBehaviour::default()
        });

        let context = RunContext::new(provider, "Test Provider");
        let registry = RunRegistry::new();
        let mut reporter = SyncProgress::new();

        let outcome = run(
            &context,
            &registry,
            &adapter,
            &local,
            &mappings,
            &NullReminderScheduler,
            &mut reporter,
        )
        .await;

        match outcome {
            tasksync::RunOutcome::Success { stats, .. } => {
                assert_eq!(stats.remote_created_tasks, 1, "one of the two should succeed");
            }
            other => panic!("per-task failures must not abort the run, got {:?}", other),
        }

        let persisted = mappings.get_sync_mapping(provider).await.unwrap();
        assert_eq!(persisted.len(), 1);
    }

    /// Idempotence law: a second run against unchanged state touches nothing.
    #[tokio::test]
    async fn second_run_is_a_no_op() {
        init_log();
        let provider = ProviderId(1);
        let local = InMemoryLocalStore::new();
        local.insert_task(Task::new("Buy milk"));
        let mappings = InMemoryMappingStore::new();
        let adapter = MockAdapter::new();

        let context = RunContext::new(provider, "Test Provider");
        let registry = RunRegistry::new();

        let mut reporter = SyncProgress::new();
        run(&context, &registry, &adapter, &local, &mappings, &NullReminderScheduler, &mut reporter).await;

        let mut reporter2 = SyncProgress::new();
        let outcome = run(&context, &registry, &adapter, &local, &mappings, &NullReminderScheduler, &mut reporter2).await;

        match outcome {
            tasksync::RunOutcome::Success { stats, .. } => {
                assert!(stats.is_all_zero(), "second run should be a no-op: {:?}", stats);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    /// §5: at most one in-flight run per provider.
    #[tokio::test]
    async fn concurrent_runs_for_the_same_provider_are_rejected() {
        init_log();
        let provider = ProviderId(42);
        let registry = RunRegistry::new();
        let _guard = registry.begin_for_test(provider);

        let local = InMemoryLocalStore::new();
        let mappings = InMemoryMappingStore::new();
        let adapter = MockAdapter::new();
        let context = RunContext::new(provider, "Test Provider");
        let mut reporter = SyncProgress::new();

        let outcome = run(&context, &registry, &adapter, &local, &mappings, &NullReminderScheduler, &mut reporter).await;
        assert!(matches!(
            outcome,
            tasksync::RunOutcome::Failure { kind: tasksync::FailureKind::AlreadyRunning, .. }
        ));
    }

    #[allow(dead_code)]
    fn _unused_preferences() -> ProviderPreferences {
        ProviderPreferences::default()
    }
}

#[cfg(not(feature = "mock-remote"))]
mod disabled {
    #[test]
    fn enable_the_mock_remote_feature_to_run_these_scenarios() {
        eprintln!("run `cargo test --features mock-remote` to exercise the end-to-end scenarios");
    }
}
