//! Resource Cache
//!
//! Name → list handle mapping kept for the lifetime of one operation.
//! Keys are exact, case-sensitive list titles.

use crate::client::{ListHandle, ObjectId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ResourceCache {
    lists: HashMap<String, ListHandle>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `handle` under `name`, replacing any previous entry.
    pub fn remember(&mut self, name: &str, handle: ListHandle) {
        self.lists.insert(name.to_string(), handle);
    }

    pub fn recall(&self, name: &str) -> Option<ListHandle> {
        self.lists.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    /// Drop every entry that points at the object `id`. Returns the evicted names.
    pub fn evict_object(&mut self, id: ObjectId) -> Vec<String> {
        let mut evicted: Vec<String> = self
            .lists
            .iter()
            .filter(|(_, handle)| handle.id == id)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &evicted {
            self.lists.remove(name);
        }
        evicted.sort();
        evicted
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}
