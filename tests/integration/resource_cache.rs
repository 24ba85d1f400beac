//! Integration tests for the load/select split of the resource cache.

use fluently::client::ClientCall;
use fluently::OperationError;

use crate::integration::operation_with;

#[test]
fn test_select_after_load_returns_cached_handle_without_resolution() {
    let mut op = operation_with(&["Tasks", "Issues"]);
    op.load_list("Tasks").unwrap();
    let loaded = op.cursor().list().unwrap();

    op.load_list("Issues").unwrap();
    let resolutions = op.client().resolution_count();

    op.select_list("Tasks").unwrap();
    assert_eq!(op.cursor().list(), Some(loaded));
    assert_eq!(op.client().resolution_count(), resolutions);
}

#[test]
fn test_select_unknown_list_is_not_found() {
    let mut op = operation_with(&["Tasks"]);
    let err = op.select_list("Tasks").unwrap_err();
    match err {
        OperationError::NotFound { name } => assert_eq!(name, "Tasks"),
        other => panic!("expected not found, got {other:?}"),
    }
    assert!(op.client().calls().is_empty());
}

#[test]
fn test_cache_keys_are_case_sensitive() {
    let mut op = operation_with(&["Tasks"]);
    op.load_list("Tasks").unwrap();
    assert!(matches!(
        op.select_list("tasks"),
        Err(OperationError::NotFound { .. })
    ));
}

#[test]
fn test_created_list_is_selectable_without_resolution() {
    let mut op = operation_with(&[]);
    op.select_web().unwrap().create_list("Backlog").unwrap();
    let created = op.cursor().list().unwrap();
    op.client_mut().clear_calls();

    op.select_web().unwrap().select_list("Backlog").unwrap();
    assert_eq!(op.cursor().list(), Some(created));
    assert!(!op
        .client()
        .calls()
        .iter()
        .any(|c| matches!(c, ClientCall::ListByTitle(_))));
}

#[test]
fn test_delete_list_does_not_consult_cache() {
    let mut op = operation_with(&["Tasks", "Archive"]);
    op.load_list("Tasks").unwrap().delete_list("Archive").unwrap();

    assert!(!op.cache().contains("Archive"));
    assert_eq!(op.pending().len(), 2);
    op.execute().unwrap();
    assert!(!op.client().list_exists("Archive"));
}

#[test]
fn test_deleted_list_is_evicted_after_drain_only() {
    let mut op = operation_with(&["Tasks"]);
    op.load_list("Tasks").unwrap().delete_list("Tasks").unwrap();

    // Still selectable while the delete is pending.
    op.select_list("Tasks").unwrap();

    op.execute().unwrap();
    assert!(!op.cache().contains("Tasks"));
    assert!(matches!(
        op.select_list("Tasks"),
        Err(OperationError::NotFound { .. })
    ));
}
