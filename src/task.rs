//! The local task model.
//!
//! Mirrors the field layout and mutation discipline of
//! `kitchen-fridge::task::Task`: mutators update `last_modified` and the
//! task stays agnostic of its own sync bookkeeping (that now lives on
//! [`crate::mapping::SyncMapping`], see DESIGN.md).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::TaskIdentifier;
use crate::proxy::TaskProxy;

/// Priority on a 0 (none) .. 3 (urgent) scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(pub u8);

impl Default for Priority {
    fn default() -> Self {
        Priority(0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionStatus {
    Completed(Option<DateTime<Utc>>),
    Uncompleted,
}

impl CompletionStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionStatus::Completed(_))
    }
}

impl Default for CompletionStatus {
    fn default() -> Self {
        CompletionStatus::Uncompleted
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    id: TaskIdentifier,
    name: String,
    notes: String,
    due: Option<DateTime<Utc>>,
    priority: Priority,
    completion_status: CompletionStatus,
    reminder_seconds: Option<i64>,
    last_modified: DateTime<Utc>,
}

impl Task {
    /// Creates a new, locally-originated task.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TaskIdentifier::new(),
            name: name.into(),
            notes: String::new(),
            due: None,
            priority: Priority::default(),
            completion_status: CompletionStatus::default(),
            reminder_seconds: None,
            last_modified: Utc::now(),
        }
    }

    /// Full constructor, used when materializing a task from a remote
    /// [`TaskProxy`] (phase 4 of the reconciler).
    pub fn new_from_proxy(id: TaskIdentifier, proxy: &TaskProxy) -> Self {
        Self {
            id,
            name: proxy.name.clone(),
            notes: proxy.notes.clone(),
            due: proxy.due,
            priority: proxy.priority,
            completion_status: if proxy.completed {
                CompletionStatus::Completed(proxy.completion_date)
            } else {
                CompletionStatus::Uncompleted
            },
            reminder_seconds: proxy.reminder_seconds,
            last_modified: proxy.last_modified,
        }
    }

    pub fn id(&self) -> TaskIdentifier {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn due(&self) -> Option<DateTime<Utc>> {
        self.due
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn completion_status(&self) -> &CompletionStatus {
        &self.completion_status
    }

    pub fn reminder_seconds(&self) -> Option<i64> {
        self.reminder_seconds
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    fn update_last_modified(&mut self) {
        self.last_modified = Utc::now();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.update_last_modified();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        self.update_last_modified();
    }

    pub fn set_due(&mut self, due: Option<DateTime<Utc>>) {
        self.due = due;
        self.update_last_modified();
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
        self.update_last_modified();
    }

    pub fn set_completion_status(&mut self, status: CompletionStatus) {
        self.completion_status = status;
        self.update_last_modified();
    }

    pub fn set_reminder_seconds(&mut self, seconds: Option<i64>) {
        self.reminder_seconds = seconds;
        self.update_last_modified();
    }

    /// Writes remote state into this task (reconciler phase 4, step 3).
    /// Does not touch `last_modified`: the remote's own timestamp, carried
    /// on the proxy, becomes this task's `last_modified`.
    pub fn apply_remote(&mut self, proxy: &TaskProxy) {
        self.name = proxy.name.clone();
        self.notes = proxy.notes.clone();
        self.due = proxy.due;
        self.priority = proxy.priority;
        self.completion_status = if proxy.completed {
            CompletionStatus::Completed(proxy.completion_date)
        } else {
            CompletionStatus::Uncompleted
        };
        self.reminder_seconds = proxy.reminder_seconds;
        self.last_modified = proxy.last_modified;
    }

    /// Compares observable content only (used by tests), ignoring identifiers.
    #[cfg(any(test, feature = "mock-remote"))]
    pub fn has_same_observable_content_as(&self, other: &Task) -> bool {
        self.name == other.name
            && self.notes == other.notes
            && self.due == other.due
            && self.priority == other.priority
            && self.completion_status.is_completed() == other.completion_status.is_completed()
    }
}
