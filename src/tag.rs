//! Tags attached to tasks. Tag name comparisons for sync purposes are
//! case-insensitive.

use serde::{Deserialize, Serialize};

use crate::ids::TagIdentifier;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: TagIdentifier,
    name: String,
}

impl Tag {
    pub fn new(id: TagIdentifier, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    pub fn id(&self) -> TagIdentifier {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The lowercased form used as the join key across local/remote tag sets.
    pub fn normalized(&self) -> String {
        self.name.to_lowercase()
    }
}
