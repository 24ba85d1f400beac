//! Integration tests for draining the deferred action queue.

use fluently::client::{ClientError, FieldType, FilterExpression, ObjectRef};
use fluently::queue::ActionTag;
use fluently::OperationError;
use serde_json::json;

use crate::integration::{operation_with, values};

#[test]
fn test_failed_drain_keeps_queue_and_retry_succeeds() {
    let mut op = operation_with(&["Tasks"]);
    op.client_mut()
        .seed_item("Tasks", values(&[("Title", json!("a"))]))
        .unwrap();
    op.load_list("Tasks").unwrap().delete_items().unwrap();
    let before = op.pending().summary();

    op.client_mut()
        .fail_next_batch(ClientError::Transport("timeout".to_string()));
    let err = op.execute().unwrap_err();
    assert!(matches!(
        err,
        OperationError::BatchExecution { pending: 2, .. }
    ));
    assert_eq!(op.pending().summary(), before);
    assert_eq!(op.client().items("Tasks").len(), 1);

    let report = op.execute().unwrap();
    assert_eq!(report.applied, 2);
    assert!(op.pending().is_empty());
    assert!(op.client().items("Tasks").is_empty());

    let batches = op.client().batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], batches[1]);
}

#[test]
fn test_remote_rejection_of_one_action_applies_nothing() {
    let mut op = operation_with(&["Tasks"]);
    op.client_mut()
        .seed_item("Tasks", values(&[("Title", json!("a"))]))
        .unwrap();
    op.load_list("Tasks")
        .unwrap()
        .delete_items()
        .unwrap()
        .add_item(values(&[("Title", json!("b"))]))
        .unwrap()
        .delete_list("Tasks")
        .unwrap()
        .load_list("Tasks")
        .unwrap();
    assert_eq!(op.pending().len(), 5);

    // The trailing Load targets a list deleted earlier in the same batch.
    let err = op.execute().unwrap_err();
    assert!(matches!(
        err,
        OperationError::BatchExecution {
            source: ClientError::NotFound(_),
            ..
        }
    ));
    assert_eq!(op.pending().len(), 5);
    assert!(op.client().list_exists("Tasks"));
    assert_eq!(op.client().items("Tasks").len(), 1);
    assert!(op.cache().contains("Tasks"));
}

#[test]
fn test_get_items_drains_previous_actions_first() {
    let mut op = operation_with(&["Tasks"]);
    for title in ["a", "b", "c"] {
        op.client_mut()
            .seed_item("Tasks", values(&[("Title", json!(title)), ("Done", json!(true))]))
            .unwrap();
    }
    op.client_mut()
        .seed_item("Tasks", values(&[("Title", json!("d")), ("Done", json!(false))]))
        .unwrap();

    op.load_list("Tasks")
        .unwrap()
        .delete_items_matching(FilterExpression::query("Done=true"))
        .unwrap();
    let items = op.get_items().unwrap();

    assert!(op.pending().is_empty());
    assert_eq!(items.len(), 1);
    assert_eq!(items.items[0].get("Title"), Some(&json!("d")));
    assert_eq!(op.client().batches().len(), 1);
}

#[test]
fn test_eager_column_call_precedes_queued_actions() {
    let mut op = operation_with(&["Tasks"]);
    op.load_list("Tasks")
        .unwrap()
        .add_column("Priority", FieldType::Number)
        .unwrap()
        .delete_items()
        .unwrap();

    // The column exists before anything was drained.
    assert!(op.client().field("Tasks", "Priority").is_some());
    assert!(op.client().batches().is_empty());

    op.execute().unwrap();
    let list = op.cache().recall("Tasks").unwrap();
    let loaded = op.state_of(list).unwrap().loaded().unwrap();
    assert_eq!(loaded.property("Fields"), Some(&json!(["Priority"])));
}

#[test]
fn test_delete_marks_handles_invalid() {
    let mut op = operation_with(&["Tasks"]);
    op.load_list("Tasks").unwrap().delete_items().unwrap();
    let items = op.cursor().items().unwrap();

    let report = op.execute().unwrap();
    assert_eq!(report.deleted, vec![ObjectRef::Items(items)]);
    assert!(matches!(
        op.state_of(items),
        Some(fluently::executor::HandleState::Deleted)
    ));
}

#[test]
fn test_execute_with_empty_queue_is_a_no_op() {
    let mut op = operation_with(&["Tasks"]);
    let report = op.execute().unwrap();
    assert_eq!(report.applied, 0);
    assert!(op.client().batches().is_empty());
}

#[test]
fn test_update_items_applies_after_earlier_creates() {
    let mut op = operation_with(&["Tasks"]);
    op.load_list("Tasks")
        .unwrap()
        .add_item(values(&[("Title", json!("x")), ("Status", json!("Open"))]))
        .unwrap()
        .update_items(
            FilterExpression::query("Status=Open"),
            values(&[("Status", json!("Closed"))]),
        )
        .unwrap();

    let tags: Vec<ActionTag> = op.pending().iter().map(|a| a.tag()).collect();
    assert_eq!(
        tags,
        vec![ActionTag::Load, ActionTag::Create, ActionTag::Update]
    );

    op.execute().unwrap();
    let items = op.client().items("Tasks");
    assert_eq!(items[0].get("Status"), Some(&json!("Closed")));
}

#[test]
fn test_failed_get_items_leaves_only_declared_actions() {
    let mut op = operation_with(&["Tasks"]);
    op.client_mut()
        .seed_item("Tasks", values(&[("Title", json!("a"))]))
        .unwrap();
    op.load_list("Tasks").unwrap().delete_items().unwrap();
    let before = op.pending().summary();
    let level = op.level();

    op.client_mut()
        .fail_next_batch(ClientError::Transport("timeout".to_string()));
    assert!(op.get_items().is_err());

    assert_eq!(op.pending().summary(), before);
    assert_eq!(op.level(), level);
    assert_eq!(op.client().items("Tasks").len(), 1);
}

#[test]
fn test_unconfirmed_batch_is_not_resent() {
    let mut op = operation_with(&["Tasks"]);
    op.load_list("Tasks")
        .unwrap()
        .add_item(values(&[("Title", json!("once"))]))
        .unwrap();

    op.client_mut().short_next_batch();
    let err = op.execute().unwrap_err();
    assert!(matches!(
        err,
        OperationError::UnconfirmedBatch {
            sent: 2,
            source: ClientError::Rejected(_)
        }
    ));
    assert!(op.pending().is_empty());

    op.execute().unwrap();
    assert_eq!(op.client().items("Tasks").len(), 1);
    assert_eq!(op.client().batches().len(), 1);
}
