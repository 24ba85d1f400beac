//! Executor
//!
//! Drains the deferred action queue through one `execute_batch` round trip and
//! applies the reported outcomes to the tracked handles. The queue is cleared
//! only when the whole batch succeeds.

use crate::client::{ActionOutcome, ClientError, ObjectId, ObjectRef, RemoteClient, RemoteObject};
use crate::error::OperationError;
use crate::queue::{ActionKind, ActionTag, Creation, DeferredAction, DeferredActionQueue};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Observable state of a handle issued during an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleState {
    /// Resolved or queued, not yet populated by a drain.
    Pending,
    Loaded(RemoteObject),
    /// Deleted remotely; no longer usable.
    Deleted,
}

impl HandleState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, HandleState::Loaded(_))
    }

    pub fn loaded(&self) -> Option<&RemoteObject> {
        match self {
            HandleState::Loaded(object) => Some(object),
            _ => None,
        }
    }
}

/// Tracks the state of every handle the operation has queued work against.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    states: HashMap<ObjectId, HandleState>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `target` as pending unless it is already known.
    pub fn track(&mut self, target: ObjectRef) {
        self.states
            .entry(target.id())
            .or_insert(HandleState::Pending);
    }

    pub fn state(&self, id: ObjectId) -> Option<&HandleState> {
        self.states.get(&id)
    }

    pub fn is_deleted(&self, id: ObjectId) -> bool {
        matches!(self.states.get(&id), Some(HandleState::Deleted))
    }

    fn set(&mut self, id: ObjectId, state: HandleState) {
        self.states.insert(id, state);
    }
}

/// Summary of a successful drain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    pub applied: usize,
    /// Targets of Delete actions, in execution order.
    pub deleted: Vec<ObjectRef>,
}

pub struct Executor;

impl Executor {
    /// Send every queued action as one batch and apply the results.
    ///
    /// An empty queue performs no round trip. When the remote call fails the
    /// queue keeps the same entries in the same order, and no handle state
    /// changes. Once the remote call succeeds the queue is always cleared, even
    /// if the outcomes it returned cannot be applied.
    pub fn drain<C: RemoteClient + ?Sized>(
        client: &mut C,
        queue: &mut DeferredActionQueue,
        handles: &mut HandleRegistry,
    ) -> Result<DrainReport, OperationError> {
        if queue.is_empty() {
            debug!("Drain skipped: no pending actions");
            return Ok(DrainReport::default());
        }

        let pending = queue.len();
        debug!(pending, "Executing deferred action batch");

        let outcomes = client.execute_batch(queue.as_batch()).map_err(|source| {
            warn!(pending, error = %source, "Batch execution failed; queue retained");
            OperationError::BatchExecution { pending, source }
        })?;

        // The remote side has committed; resending would repeat creations and deletions.
        if let Err(source) = check_outcomes(queue, &outcomes) {
            queue.clear();
            warn!(pending, error = %source, "Batch outcomes unusable; queue cleared");
            return Err(OperationError::UnconfirmedBatch {
                sent: pending,
                source,
            });
        }

        let mut report = DrainReport::default();
        for (action, outcome) in queue.iter().zip(outcomes) {
            apply_outcome(handles, action, outcome, &mut report);
        }
        queue.clear();

        info!(
            applied = report.applied,
            deleted = report.deleted.len(),
            "Deferred action batch applied"
        );
        Ok(report)
    }
}

fn check_outcomes(
    queue: &DeferredActionQueue,
    outcomes: &[ActionOutcome],
) -> Result<(), ClientError> {
    if outcomes.len() != queue.len() {
        return Err(ClientError::Rejected(format!(
            "batch returned {} outcome(s) for {} action(s)",
            outcomes.len(),
            queue.len()
        )));
    }
    for (index, (action, outcome)) in queue.iter().zip(outcomes).enumerate() {
        let matches = matches!(
            (action.tag(), outcome),
            (ActionTag::Load, ActionOutcome::Loaded(_))
                | (ActionTag::Delete, ActionOutcome::Deleted)
                | (ActionTag::Update, ActionOutcome::Updated)
                | (ActionTag::Create, ActionOutcome::Created)
        );
        if !matches {
            return Err(ClientError::Rejected(format!(
                "outcome {} does not match {:?} action on {}",
                index,
                action.tag(),
                action.target.id()
            )));
        }
    }
    Ok(())
}

fn apply_outcome(
    handles: &mut HandleRegistry,
    action: &DeferredAction,
    outcome: ActionOutcome,
    report: &mut DrainReport,
) {
    let id = action.target.id();
    match (&action.kind, outcome) {
        (ActionKind::Load(_), ActionOutcome::Loaded(object)) => {
            handles.set(id, HandleState::Loaded(object));
        }
        (ActionKind::Delete, _) => {
            handles.set(id, HandleState::Deleted);
            report.deleted.push(action.target);
        }
        (ActionKind::Update(_), _) => {
            // Loaded data no longer reflects the remote object.
            if !handles.is_deleted(id) {
                handles.set(id, HandleState::Pending);
            }
        }
        (ActionKind::Create(Creation::List(_)), _) => handles.track(action.target),
        (ActionKind::Create(Creation::Item(_)), _) => {}
        (ActionKind::Load(_), _) => {}
    }
    report.applied += 1;
}
