//! Command execution pipeline (application-level orchestration).
//!
//! This module implements the **command dispatch pattern** for event-sourced aggregates.
//! It orchestrates the full lifecycle: loading history, rehydrating state, handling commands
//! and persisting events under optimistic concurrency, retrying on conflict.
//!
//! ## Command Execution Flow
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the aggregate's stream from the store
//!   ↓
//! 2. Decode payloads by kind tag and rehydrate through `Aggregate::apply`
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Append with the loaded version as the expectation
//!   ↓
//! 5. On conflict: reload and run the same command again (bounded)
//! ```
//!
//! This module contains no IO itself; it composes the `EventStore` trait.

use std::thread;
use std::time::Duration;

use thiserror::Error;

use bankledger_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use bankledger_events::{Command, EventCodec, EventEnvelope, execute};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// The four outcomes a caller has to distinguish.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DispatchErrorKind {
    Validation,
    Conflict,
    Corruption,
    Store,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The command violates an aggregate invariant or is malformed. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Optimistic concurrency kept failing; `attempts` is how many times the command ran.
    #[error("conflict after {attempts} attempt(s): {message}")]
    Conflict { attempts: u32, message: String },

    /// The stored history cannot be decoded or replayed.
    #[error("corrupted history: {0}")]
    Corruption(String),

    /// Storage failure. The command is treated as not applied.
    #[error("event store error: {0}")]
    Store(EventStoreError),
}

impl DispatchError {
    pub fn kind(&self) -> DispatchErrorKind {
        match self {
            DispatchError::Validation(_) => DispatchErrorKind::Validation,
            DispatchError::Conflict { .. } => DispatchErrorKind::Conflict,
            DispatchError::Corruption(_) => DispatchErrorKind::Corruption,
            DispatchError::Store(_) => DispatchErrorKind::Store,
        }
    }
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency { .. } => DispatchError::Conflict {
                attempts: 1,
                message: value.to_string(),
            },
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::Corruption(msg) => DispatchError::Corruption(msg),
        }
    }
}

/// How often a conflicting command is re-run before giving up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; values below 1 are raised to 1.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Run once and surface the first conflict.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::ZERO)
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// ## Execution Guarantees
///
/// - **Atomicity**: a command's events are appended as one batch or not at all
/// - **Isolation**: each command operates on a single aggregate instance
/// - **Determinism**: rehydration and the live check both go through `Aggregate::apply`
///
/// ## Error Semantics
///
/// - **Domain errors**: `DispatchError::Validation`, never persisted
/// - **Concurrency errors**: retried per `RetryPolicy`, then `DispatchError::Conflict`
/// - **Decode/replay errors**: `DispatchError::Corruption`
/// - **Backend errors**: `DispatchError::Store`, propagated as-is
///
/// Re-delivered commands are not deduplicated. A client-assigned idempotency key
/// would be checked here, before step 3.
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Dispatch a command, retrying on optimistic-concurrency conflicts.
    ///
    /// `make_aggregate` builds the zero-valued aggregate for an id; it is called
    /// once per attempt. Returns the committed envelopes with typed payloads.
    pub fn dispatch<A>(
        &self,
        command: &A::Command,
        make_aggregate: impl Fn(AggregateId) -> A,
    ) -> Result<Vec<EventEnvelope<A::Event>>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Command: Command,
        A::Event: EventCodec,
    {
        let aggregate_id = command.target_aggregate_id();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.dispatch_once(command, &make_aggregate) {
                Ok(committed) => {
                    tracing::info!(
                        aggregate_id = %aggregate_id,
                        command = command.command_type(),
                        attempt,
                        events = committed.len(),
                        "command committed"
                    );
                    return Ok(committed);
                }
                Err(DispatchError::Conflict { message, .. }) if attempt < self.retry.max_attempts => {
                    tracing::warn!(
                        aggregate_id = %aggregate_id,
                        command = command.command_type(),
                        attempt,
                        error = %message,
                        "concurrent write detected, retrying"
                    );
                    if !self.retry.backoff.is_zero() {
                        thread::sleep(self.retry.backoff);
                    }
                }
                Err(DispatchError::Conflict { message, .. }) => {
                    tracing::error!(
                        aggregate_id = %aggregate_id,
                        command = command.command_type(),
                        attempts = attempt,
                        error = %message,
                        "retries exhausted"
                    );
                    return Err(DispatchError::Conflict {
                        attempts: attempt,
                        message,
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Rebuild an aggregate's current state from its stream.
    pub fn load_aggregate<A>(
        &self,
        aggregate_id: &AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: EventCodec,
    {
        let history = self.store.load(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let events = decode_history::<A::Event>(history)?;
        let aggregate = make_aggregate(aggregate_id.clone()).load_from_history(&events)?;
        Ok(aggregate)
    }

    fn dispatch_once<A>(
        &self,
        command: &A::Command,
        make_aggregate: &impl Fn(AggregateId) -> A,
    ) -> Result<Vec<EventEnvelope<A::Event>>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Command: Command,
        A::Event: EventCodec,
    {
        let aggregate_id = command.target_aggregate_id();

        // 1-2) Load and rehydrate
        let aggregate = self.load_aggregate(aggregate_id, make_aggregate)?;
        let expected = ExpectedVersion::exact(aggregate.version());

        // 3) Decide, and check the decision applies cleanly
        let (_, decided) = execute(aggregate, command)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id.clone(), ev))
            .collect::<Result<Vec<_>, _>>()?;
        let committed = self.store.append(aggregate_id, expected, uncommitted)?;

        Ok(committed
            .into_iter()
            .zip(decided)
            .map(|(stored, event)| stored.with_payload(event))
            .collect())
    }
}

/// Decode stored payloads into the aggregate's event type, by kind tag.
pub fn decode_history<E>(history: Vec<StoredEvent>) -> Result<Vec<E>, DomainError>
where
    E: EventCodec,
{
    history
        .into_iter()
        .map(|stored| stored.try_map_payload(E::decode).map(EventEnvelope::into_payload))
        .collect()
}

fn validate_loaded_stream(aggregate_id: &AggregateId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    // A backend returning someone else's events or a gapped stream cannot be replayed.
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id() != aggregate_id {
            return Err(DispatchError::Corruption(format!(
                "stream '{aggregate_id}' contains an event for '{}' at index {idx}",
                e.aggregate_id()
            )));
        }
        let expected = idx as u64 + 1;
        if e.version() != expected {
            return Err(DispatchError::Corruption(format!(
                "stream '{aggregate_id}' has version {} at index {idx}, expected {expected}",
                e.version()
            )));
        }
    }
    Ok(())
}
