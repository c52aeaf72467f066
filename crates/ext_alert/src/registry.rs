//! Singleton admission control.
//!
//! At most one live dialog per singleton key. The registry belongs to the
//! [`AlertRuntime`](crate::AlertRuntime) that created it; its entries live
//! exactly as long as the surface they guard.

use crate::host::{SurfaceHost, SurfaceId};
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Result of asking to open a keyed dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// No key; nothing to deduplicate
    Unkeyed,
    /// The key is now reserved for the caller, who must `bind` or `release` it
    Admitted(String),
    /// The key is taken; the existing surface was shown if still alive
    Showing,
}

#[derive(Debug, Default)]
pub struct SingletonRegistry {
    // `None` while the owning session is still creating its surface
    entries: RefCell<HashMap<String, Option<SurfaceId>>>,
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and reserve `key` in one step.
    pub fn admit(&self, key: Option<&str>, host: &dyn SurfaceHost) -> Admission {
        let Some(key) = key else {
            return Admission::Unkeyed;
        };

        let existing = {
            let mut entries = self.entries.borrow_mut();
            match entries.entry(key.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(None);
                    return Admission::Admitted(key.to_string());
                }
                Entry::Occupied(slot) => *slot.get(),
            }
        };

        tracing::debug!(singleton = %key, surface = ?existing, "singleton already showing");
        // a key outlives its surface until the close callbacks have run
        if let Some(surface) = existing.filter(|s| !host.is_destroyed(*s)) {
            host.show(surface);
        }
        Admission::Showing
    }

    /// Attach the created surface to a reserved key.
    pub fn bind(&self, key: &str, surface: SurfaceId) {
        if let Some(slot) = self.entries.borrow_mut().get_mut(key) {
            *slot = Some(surface);
        }
    }

    /// Remove `key`. Returns false if it was not present.
    pub fn release(&self, key: &str) -> bool {
        self.entries.borrow_mut().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn surface(&self, key: &str) -> Option<SurfaceId> {
        self.entries.borrow().get(key).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
