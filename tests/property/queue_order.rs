//! Property-based tests for deferred action ordering

use fluently::client::{ClientError, FilterExpression, InMemoryClient, ObjectRef};
use fluently::queue::ActionTag;
use fluently::Operation;
use proptest::prelude::*;
use serde_json::json;

const SITE: &str = "https://contoso.test";
const LISTS: [&str; 3] = ["Tasks", "Issues", "Archive"];

/// Apply one step of a generated chain.
fn apply_step(op: &mut Operation<InMemoryClient>, step: u8, n: usize) {
    let list = LISTS[n % LISTS.len()];
    match step % 5 {
        0 => {
            op.load_list(list).unwrap();
        }
        1 => {
            if op.select_list(list).is_err() {
                op.load_list(list).unwrap();
            }
            op.delete_items().unwrap();
        }
        2 => {
            op.load_list(list).unwrap();
            let values = [("Title".to_string(), json!(format!("item {n}")))]
                .into_iter()
                .collect();
            op.add_item(values).unwrap();
        }
        3 => {
            op.load_list(list).unwrap();
            let values = [("Seen".to_string(), json!(true))].into_iter().collect();
            op.update_items(FilterExpression::AllItems, values).unwrap();
        }
        _ => {
            op.select_web().unwrap();
        }
    }
}

fn operation() -> Operation<InMemoryClient> {
    let mut client = InMemoryClient::new(SITE);
    for list in LISTS {
        client.seed_list(list);
    }
    Operation::new(client, SITE)
}

/// The batch sent to the client matches declaration order exactly.
#[test]
fn test_batch_order_equals_declaration_order() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::vec((any::<u8>(), 0usize..10), 1..24),
            |steps| {
                let mut op = operation();
                for (step, n) in &steps {
                    apply_step(&mut op, *step, *n);
                }
                let declared: Vec<(ObjectRef, ActionTag)> = op.pending().summary();

                op.execute().unwrap();

                let batches = op.client().batches();
                if declared.is_empty() {
                    prop_assert!(batches.is_empty());
                } else {
                    prop_assert_eq!(batches.len(), 1);
                    prop_assert_eq!(&batches[0], &declared);
                }
                prop_assert!(op.pending().is_empty());
                Ok(())
            },
        )
        .unwrap();
}

/// A failed drain leaves the queue unchanged; the retry sends the same batch.
#[test]
fn test_failed_drain_is_retryable() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::vec((any::<u8>(), 0usize..10), 1..16),
            |steps| {
                let mut op = operation();
                for (step, n) in &steps {
                    apply_step(&mut op, *step, *n);
                }
                prop_assume!(!op.pending().is_empty());
                let declared = op.pending().summary();

                op.client_mut()
                    .fail_next_batch(ClientError::Transport("reset".to_string()));
                prop_assert!(op.execute().is_err());
                prop_assert_eq!(op.pending().summary(), declared.clone());

                op.execute().unwrap();
                let batches = op.client().batches();
                prop_assert_eq!(batches.len(), 2);
                prop_assert_eq!(&batches[0], &declared);
                prop_assert_eq!(&batches[1], &declared);
                prop_assert!(op.pending().is_empty());
                Ok(())
            },
        )
        .unwrap();
}
