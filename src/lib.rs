//! Fluently: batched operations over site/web/list/item resource trees
//!
//! A fluent builder that walks a hierarchically scoped remote resource tree,
//! records loads and mutations as deferred actions, and sends them together in
//! a single round trip.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod operation;
pub mod queue;
pub mod scope;

pub use client::{InMemoryClient, RemoteClient};
pub use error::{ClientError, OperationError};
pub use operation::Operation;
pub use scope::ScopeLevel;
