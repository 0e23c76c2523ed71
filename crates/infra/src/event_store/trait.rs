use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use bankledger_core::{AggregateId, EventId, ExpectedVersion};
use bankledger_events::{EventCodec, EventEnvelope};
use std::sync::Arc;

/// An event ready to be appended to a stream (not yet assigned a version or
/// global sequence).
///
/// ## Event Lifecycle
///
/// 1. **Domain event**: decided by the aggregate's `handle()`
/// 2. **UncommittedEvent**: encoded payload plus its kind tag and schema version
/// 3. **StoredEvent**: committed, with per-aggregate version and global sequence
///
/// Use `UncommittedEvent::from_typed()` to build one from a typed domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: EventId,
    pub aggregate_id: AggregateId,

    pub event_type: String,
    pub event_version: u32,

    pub payload: JsonValue,
}

impl UncommittedEvent {
    pub fn from_typed<E>(aggregate_id: AggregateId, event: &E) -> Result<Self, EventStoreError>
    where
        E: EventCodec,
    {
        Ok(Self {
            event_id: EventId::new(),
            aggregate_id,
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            payload: event.encode()?,
        })
    }
}

/// A committed event: the envelope with its payload still in storage form.
///
/// `version()` is the position in the aggregate's stream (1..N, gap-free);
/// `global_sequence()` is the position in the whole log.
pub type StoredEvent = EventEnvelope<JsonValue>;

/// Event store operation error.
///
/// These are **infrastructure errors** (concurrency, storage) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error(
        "optimistic concurrency check failed for '{aggregate_id}' (expected version: {expected}, actual: {actual})"
    )]
    Concurrency {
        aggregate_id: AggregateId,
        expected: u64,
        actual: u64,
    },

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl EventStoreError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, EventStoreError::Concurrency { .. })
    }
}

/// Append-only event store with a single global order.
///
/// ## Design Principles
///
/// - **No storage assumptions**: works with the in-memory implementation and any
///   durable backend that can honour the same contract
/// - **Optimistic locking**: via `ExpectedVersion`; stale writers are rejected
/// - **Append-only**: events are never modified or deleted
///
/// ## Atomicity
///
/// `append` commits the whole batch or nothing. Versions and global sequence
/// numbers are assigned inside the same per-aggregate critical section as the
/// version check, so readers never observe a partial batch.
pub trait EventStore: Send + Sync {
    /// Append a batch to `aggregate_id`'s stream if its current version equals
    /// `expected_version`. An empty batch is a no-op.
    fn append(
        &self,
        aggregate_id: &AggregateId,
        expected_version: ExpectedVersion,
        events: Vec<UncommittedEvent>,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// The aggregate's stream from version 1 upward (empty if never written).
    fn load(&self, aggregate_id: &AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Every event with global sequence greater than `after_global_sequence`,
    /// in global order.
    fn load_all_from(&self, after_global_sequence: u64) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Highest committed global sequence (0 when the log is empty).
    fn high_water_mark(&self) -> Result<u64, EventStoreError>;

    /// The whole log, in global order.
    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.load_all_from(0)
    }
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        aggregate_id: &AggregateId,
        expected_version: ExpectedVersion,
        events: Vec<UncommittedEvent>,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(aggregate_id, expected_version, events)
    }

    fn load(&self, aggregate_id: &AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load(aggregate_id)
    }

    fn load_all_from(&self, after_global_sequence: u64) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_all_from(after_global_sequence)
    }

    fn high_water_mark(&self) -> Result<u64, EventStoreError> {
        (**self).high_water_mark()
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_all()
    }
}
