//! The remote adapter capability set: the engine's sole coupling to any
//! specific provider's transport. Mirrors `kitchen-fridge::traits::DavCalendar`
//! in spirit (a narrow, transport-agnostic contract the reconciler drives).

use async_trait::async_trait;

use crate::error::{RemoteError, SyncError};
use crate::ids::{ProviderId, RemoteId};
use crate::mapping::SyncMapping;
use crate::proxy::TaskProxy;
use crate::task::Task;

#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    /// Fetches the full remote task list for a run. The only call allowed to
    /// raise [`SyncError::Auth`].
    async fn fetch_remote_tasks(&self, provider: ProviderId) -> Result<Vec<TaskProxy>, SyncError>;

    /// Creates a bare remote task from local state, returning its new id.
    async fn create_task(&self, provider: ProviderId, task: &Task) -> Result<RemoteId, RemoteError>;

    /// Writes full state to the remote. `merged_against` is `Some` iff
    /// `proxy` was produced by merging against that remote snapshot.
    async fn push_task(
        &self,
        proxy: &TaskProxy,
        merged_against: Option<&TaskProxy>,
        mapping: &SyncMapping,
    ) -> Result<(), RemoteError>;

    /// Re-reads the remote record after a merged push, to canonicalize what
    /// was actually stored.
    async fn refetch_task(&self, proxy: &TaskProxy) -> Result<TaskProxy, RemoteError>;

    /// Deletes remotely. Must be idempotent: deleting an unknown remote id
    /// succeeds.
    async fn delete_task(&self, mapping: &SyncMapping) -> Result<(), RemoteError>;
}

#[cfg(feature = "mock-remote")]
pub mod mock {
    //! A scripted-failure mock remote, directly modeled on
    //! `kitchen-fridge::mock_behaviour::MockBehaviour`'s `(successes, failures)`
    //! countdown tuple.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Per-call behaviour: `(m, n)` means "succeed m times, then fail n times,
    /// then succeed forever".
    #[derive(Default, Clone, Debug)]
    pub struct MockBehaviour {
        pub create_task: (u32, u32),
        pub push_task: (u32, u32),
        pub refetch_task: (u32, u32),
        pub delete_task: (u32, u32),
        pub fetch_remote_tasks: (u32, u32),
    }

    impl MockBehaviour {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every call fails immediately, `n_fails` times.
        pub fn fail_now(n_fails: u32) -> Self {
            Self {
                create_task: (0, n_fails),
                push_task: (0, n_fails),
                refetch_task: (0, n_fails),
                delete_task: (0, n_fails),
                fetch_remote_tasks: (0, n_fails),
            }
        }
    }

    /// Returns `Ok` for `(1+, _)` or `(_, 0)`, decrementing and erring
    /// otherwise.
    fn decrement(value: &mut (u32, u32), descr: &str) -> Result<(), RemoteError> {
        if value.0 > 0 {
            value.0 -= 1;
            log::debug!("mock adapter: allowing a {} ({:?})", descr, value);
            Ok(())
        } else if value.1 > 0 {
            value.1 -= 1;
            log::debug!("mock adapter: failing a {} ({:?})", descr, value);
            Err(RemoteError::new(format!("mocked failure on {}", descr)))
        } else {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockState {
        next_id: u64,
        remote: HashMap<RemoteId, TaskProxy>,
        behaviour: MockBehaviour,
    }

    /// An in-memory remote that the reconciler drives exactly like a real
    /// adapter, with injectable transient per-call failures.
    pub struct MockAdapter {
        state: Mutex<MockState>,
    }

    impl MockAdapter {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(MockState::default()),
            }
        }

        pub fn with_behaviour(behaviour: MockBehaviour) -> Self {
            Self {
                state: Mutex::new(MockState {
                    behaviour,
                    ..MockState::default()
                }),
            }
        }

        /// Seeds a remote task directly, bypassing `create_task`.
        pub fn seed(&self, proxy: TaskProxy) {
            self.state.lock().unwrap().remote.insert(proxy.remote_id.clone(), proxy);
        }

        pub fn set_behaviour(&self, behaviour: MockBehaviour) {
            self.state.lock().unwrap().behaviour = behaviour;
        }
    }

    impl Default for MockAdapter {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl RemoteAdapter for MockAdapter {
        async fn fetch_remote_tasks(&self, _provider: ProviderId) -> Result<Vec<TaskProxy>, SyncError> {
            let mut state = self.state.lock().unwrap();
            decrement(&mut state.behaviour.fetch_remote_tasks, "fetch_remote_tasks")?;
            Ok(state.remote.values().cloned().collect())
        }

        async fn create_task(&self, provider: ProviderId, task: &Task) -> Result<RemoteId, RemoteError> {
            let mut state = self.state.lock().unwrap();
            decrement(&mut state.behaviour.create_task, "create_task")?;
            state.next_id += 1;
            let remote_id = RemoteId(format!("mock-{}", state.next_id));
            let mut proxy = TaskProxy::placeholder(provider);
            proxy.remote_id = remote_id.clone();
            proxy.name = task.name().to_string();
            state.remote.insert(remote_id.clone(), proxy);
            Ok(remote_id)
        }

        async fn push_task(
            &self,
            proxy: &TaskProxy,
            _merged_against: Option<&TaskProxy>,
            _mapping: &SyncMapping,
        ) -> Result<(), RemoteError> {
            let mut state = self.state.lock().unwrap();
            decrement(&mut state.behaviour.push_task, "push_task")?;
            state.remote.insert(proxy.remote_id.clone(), proxy.clone());
            Ok(())
        }

        async fn refetch_task(&self, proxy: &TaskProxy) -> Result<TaskProxy, RemoteError> {
            let mut state = self.state.lock().unwrap();
            decrement(&mut state.behaviour.refetch_task, "refetch_task")?;
            Ok(state
                .remote
                .get(&proxy.remote_id)
                .cloned()
                .unwrap_or_else(|| proxy.clone()))
        }

        async fn delete_task(&self, mapping: &SyncMapping) -> Result<(), RemoteError> {
            let mut state = self.state.lock().unwrap();
            decrement(&mut state.behaviour.delete_task, "delete_task")?;
            state.remote.remove(&mapping.remote_id);
            Ok(())
        }
    }

}
