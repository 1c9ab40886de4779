//! The engine's sole coupling to whatever the host platform uses to post
//! local notifications/alarms -- out of scope beyond this contract, the same
//! way the CalDAV/WebDAV transport is out of scope for `kitchen-fridge`'s
//! `traits::CalDavSource`.

use async_trait::async_trait;

use crate::task::Task;

#[async_trait]
pub trait ReminderScheduler: Send + Sync {
    /// Called once per task updated in reconciler phase 4.
    async fn rearm(&self, task: &Task);
}

/// Default for hosts and tests that don't care about reminders.
#[derive(Default)]
pub struct NullReminderScheduler;

#[async_trait]
impl ReminderScheduler for NullReminderScheduler {
    async fn rearm(&self, _task: &Task) {}
}
