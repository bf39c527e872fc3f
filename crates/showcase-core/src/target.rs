//! Target handles
//!
//! A [`TargetId`] names one UI element eligible for a showcase step. Handles
//! are cheap to clone and compare by pointer identity first, then by their
//! unique id, so a handle rebuilt from the same id after the widget was
//! recreated still matches the original.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use uuid::Uuid;

#[derive(Debug)]
struct TargetKey {
    id: Uuid,
    label: String,
}

/// Identity-comparable handle for a showcase target
#[derive(Clone)]
pub struct TargetId {
    key: Arc<TargetKey>,
}

impl TargetId {
    /// Mint a new, unique target handle
    pub fn new(label: impl Into<String>) -> Self {
        Self::from_parts(Uuid::new_v4(), label)
    }

    /// Rebuild a handle for an existing id
    pub fn from_parts(id: Uuid, label: impl Into<String>) -> Self {
        Self {
            key: Arc::new(TargetKey {
                id,
                label: label.into(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.key.id
    }

    pub fn label(&self) -> &str {
        &self.key.label
    }

    /// True when both handles share the same allocation
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.key, &other.key)
    }

    /// Identity match with value-equality fallback
    #[inline]
    pub fn same_target(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.key.id == other.key.id
    }
}

impl PartialEq for TargetId {
    fn eq(&self, other: &Self) -> bool {
        self.same_target(other)
    }
}

impl Eq for TargetId {}

impl Hash for TargetId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.id.hash(state);
    }
}

impl fmt::Debug for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetId({})", self.key.label)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key.label)
    }
}

/// Handle for one controller registered against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(Uuid);

impl ControllerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}
