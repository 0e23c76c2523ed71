//! Append-only event store boundary.
//!
//! Defines the infrastructure-facing abstraction for storing and loading
//! aggregate streams and the global log, plus the in-memory implementation and
//! a line-delimited export format.

pub mod in_memory;
pub mod jsonl;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
