//! Integration tests for the fluent operation builder

mod batch_execution;
mod config_integration;
mod resource_cache;
mod scope_rules;

pub use test_utils::{operation_with, values, with_config_home, SITE};
