//! Integration tests for scope validation.

use fluently::client::{FieldPatch, FieldType, FilterExpression};
use fluently::{OperationError, ScopeLevel};

use crate::integration::{operation_with, values};
use serde_json::json;

fn assert_precondition(err: OperationError, expected_current: ScopeLevel) {
    match err {
        OperationError::Precondition {
            required, current, ..
        } => {
            assert_eq!(required, ScopeLevel::List);
            assert_eq!(current, expected_current);
        }
        other => panic!("expected precondition error, got {other:?}"),
    }
}

#[test]
fn test_column_operations_at_web_level_fail_and_queue_nothing() {
    let mut op = operation_with(&["Tasks"]);
    op.select_web().unwrap();

    assert_precondition(
        op.add_column("Priority", FieldType::Number).unwrap_err(),
        ScopeLevel::Web,
    );
    assert_precondition(
        op.change_column(
            "Priority",
            FieldPatch {
                required: Some(true),
                ..Default::default()
            },
        )
        .unwrap_err(),
        ScopeLevel::Web,
    );
    assert_precondition(op.delete_column("Priority").unwrap_err(), ScopeLevel::Web);

    assert!(op.pending().is_empty());
    assert!(op.client().field("Tasks", "Priority").is_none());
}

#[test]
fn test_item_operations_at_site_level_fail() {
    let mut op = operation_with(&["Tasks"]);

    assert_precondition(op.get_items().unwrap_err(), ScopeLevel::Site);
    assert_precondition(op.delete_items().unwrap_err(), ScopeLevel::Site);
    assert_precondition(
        op.add_item(values(&[("Title", json!("x"))])).unwrap_err(),
        ScopeLevel::Site,
    );
    assert_precondition(
        op.update_items(FilterExpression::AllItems, values(&[]))
            .unwrap_err(),
        ScopeLevel::Site,
    );
    assert!(op.pending().is_empty());
    assert!(op.client().batches().is_empty());
}

#[test]
fn test_list_operations_remain_legal_at_item_level() {
    let mut op = operation_with(&["Tasks"]);
    op.load_list("Tasks").unwrap().delete_items().unwrap();
    assert_eq!(op.level(), ScopeLevel::Item);

    op.add_column("Priority", FieldType::Number).unwrap();
    assert!(op.client().field("Tasks", "Priority").is_some());
}

#[test]
fn test_select_web_returns_to_web_level() {
    let mut op = operation_with(&["Tasks"]);
    op.load_list("Tasks").unwrap();
    assert_eq!(op.level(), ScopeLevel::List);

    op.select_web().unwrap();
    assert_eq!(op.level(), ScopeLevel::Web);
    assert!(op.cursor().list().is_none());
    assert!(op.add_column("Priority", FieldType::Number).is_err());
}

#[test]
fn test_delete_list_requires_web() {
    let mut op = operation_with(&["Tasks"]);
    let err = op.delete_list("Tasks").unwrap_err();
    assert!(matches!(
        err,
        OperationError::Precondition {
            required: ScopeLevel::Web,
            ..
        }
    ));
}
