//! Deferred Action Queue
//!
//! Ordered record of pending remote work. Actions are appended by builder calls
//! and removed only by a successful drain.

use crate::client::{FieldValues, ListCreation, LoadSelection, ObjectRef};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Kind tag of a deferred action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionTag {
    Load,
    Delete,
    Update,
    Create,
}

/// What a created object is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Creation {
    List(ListCreation),
    Item(FieldValues),
}

/// Action kind together with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    Load(LoadSelection),
    Delete,
    Update(FieldValues),
    Create(Creation),
}

impl ActionKind {
    pub fn tag(&self) -> ActionTag {
        match self {
            ActionKind::Load(_) => ActionTag::Load,
            ActionKind::Delete => ActionTag::Delete,
            ActionKind::Update(_) => ActionTag::Update,
            ActionKind::Create(_) => ActionTag::Create,
        }
    }
}

/// A recorded intent against a remote object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredAction {
    pub target: ObjectRef,
    pub kind: ActionKind,
}

impl DeferredAction {
    pub fn new(target: impl Into<ObjectRef>, kind: ActionKind) -> Self {
        Self {
            target: target.into(),
            kind,
        }
    }

    pub fn load(target: impl Into<ObjectRef>) -> Self {
        Self::new(target, ActionKind::Load(LoadSelection::Full))
    }

    pub fn delete(target: impl Into<ObjectRef>) -> Self {
        Self::new(target, ActionKind::Delete)
    }

    pub fn tag(&self) -> ActionTag {
        self.kind.tag()
    }
}

/// FIFO of deferred actions.
#[derive(Debug, Clone, Default)]
pub struct DeferredActionQueue {
    actions: VecDeque<DeferredAction>,
}

impl DeferredActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: DeferredAction) {
        self.actions.push_back(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeferredAction> {
        self.actions.iter()
    }

    /// Pending actions in declaration order.
    pub fn as_batch(&mut self) -> &[DeferredAction] {
        self.actions.make_contiguous()
    }

    /// (target, tag) pairs in declaration order.
    pub fn summary(&self) -> Vec<(ObjectRef, ActionTag)> {
        self.actions.iter().map(|a| (a.target, a.tag())).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.actions.clear();
    }

    pub(crate) fn pop_back(&mut self) -> Option<DeferredAction> {
        self.actions.pop_back()
    }
}
