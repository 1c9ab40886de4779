//! Opaque identifiers used across the engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque local primary key for a [`crate::task::Task`].
///
/// Unique and stable across the task's lifetime, the way `kitchen-fridge::task::Task`
/// mints its `uid` via `Uuid::new_v4()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TaskIdentifier(Uuid);

impl TaskIdentifier {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for a [`crate::tag::Tag`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TagIdentifier(Uuid);

impl TagIdentifier {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TagIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TagIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stable integer identifying a remote task provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ProviderId(pub i64);

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque remote identifier, as handed out by a provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RemoteId(pub String);

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
