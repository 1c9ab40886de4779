//! A two-way task synchronization engine.
//!
//! Reconciles a local store of tasks against a pluggable remote task
//! provider: detects local and remote creates/updates/deletes, merges
//! conflicting edits, maintains a persisted local/remote correspondence
//! table, and reports a human-readable change log plus per-category
//! statistics.
//!
//! The reconciliation core lives in [`reconcile`]; [`driver::run`] is the
//! single public entry point that ties the core to a [`adapter::RemoteAdapter`],
//! a [`store::LocalStore`]/[`store::TagStore`] pair, and a
//! [`mapping::MappingStore`].

pub mod adapter;
pub mod defaults;
pub mod driver;
pub mod error;
pub mod ids;
pub mod mapping;
pub mod merge;
pub mod proxy;
pub mod reconcile;
pub mod reminders;
pub mod store;
pub mod sync_data;
pub mod tag;
pub mod task;

pub use adapter::RemoteAdapter;
pub use defaults::ProviderPreferences;
pub use driver::{run, FailureKind, RunContext, RunOutcome, RunRegistry};
pub use error::{RemoteError, StoreError, SyncError, SyncResult};
pub use ids::{ProviderId, RemoteId, TagIdentifier, TaskIdentifier};
pub use mapping::{InMemoryMappingStore, MappingStore, SyncMapping};
pub use proxy::TaskProxy;
pub use reconcile::progress::{LogSection, RunStats, SyncEvent, SyncProgress};
pub use reconcile::{CancellationToken, Reconciler};
pub use reminders::ReminderScheduler;
pub use store::{InMemoryLocalStore, LocalStore, TagStore};
pub use sync_data::SyncData;
pub use tag::Tag;
pub use task::{CompletionStatus, Priority, Task};
