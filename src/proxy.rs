//! The wire-neutral representation of a task, exchanged with a
//! [`crate::adapter::RemoteAdapter`]. This is the only form in which remote
//! state is expressed to the reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ProviderId, RemoteId};
use crate::task::{CompletionStatus, Priority, Task};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskProxy {
    pub provider_id: ProviderId,
    pub remote_id: RemoteId,
    pub name: String,
    pub notes: String,
    pub due: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub completed: bool,
    pub completion_date: Option<DateTime<Utc>>,
    pub reminder_seconds: Option<i64>,
    pub tags: Vec<String>,
    pub is_deleted: bool,
    pub last_modified: DateTime<Utc>,
}

impl TaskProxy {
    /// Builds the proxy the reconciler pushes for a local task.
    pub fn from_task(
        task: &Task,
        provider_id: ProviderId,
        remote_id: RemoteId,
        tags: Vec<String>,
    ) -> Self {
        Self {
            provider_id,
            remote_id,
            name: task.name().to_string(),
            notes: task.notes().to_string(),
            due: task.due(),
            priority: task.priority(),
            completed: task.completion_status().is_completed(),
            completion_date: match task.completion_status() {
                CompletionStatus::Completed(date) => *date,
                CompletionStatus::Uncompleted => None,
            },
            reminder_seconds: task.reminder_seconds(),
            tags,
            is_deleted: false,
            last_modified: task.last_modified(),
        }
    }

    /// A blank proxy representing a brand-new remote task, before the
    /// adapter has handed back a real [`RemoteId`].
    pub fn placeholder(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            remote_id: RemoteId(String::new()),
            name: String::new(),
            notes: String::new(),
            due: None,
            priority: Priority::default(),
            completed: false,
            completion_date: None,
            reminder_seconds: None,
            tags: Vec::new(),
            is_deleted: false,
            last_modified: Utc::now(),
        }
    }
}
