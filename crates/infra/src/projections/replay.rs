//! Projection replay over the event store.
//!
//! Cold start folds the whole log up to the high-water mark observed when the
//! replay began; events committed while it runs are left for the next
//! catch-up. Catch-up resumes from a runner's cursor via `load_all_from`.
//! No store lock is held while projections run.

use thiserror::Error;

use bankledger_core::DomainError;
use bankledger_events::{EventCodec, EventEnvelope, Projection, ProjectionCursor, ProjectionError, ProjectionRunner};

use crate::event_store::{EventStore, EventStoreError, StoredEvent};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("corrupted log: {0}")]
    Corruption(#[from] DomainError),

    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),
}

/// Decode stored envelopes into typed ones, by kind tag.
pub fn decode_log<E>(stored: Vec<StoredEvent>) -> Result<Vec<EventEnvelope<E>>, DomainError>
where
    E: EventCodec,
{
    stored.into_iter().map(|s| s.try_map_payload(E::decode)).collect()
}

/// Rebuild a projection from its zero value.
pub fn replay<P, S>(store: &S) -> Result<(P, ProjectionCursor), ReplayError>
where
    P: Projection,
    P::Ev: EventCodec,
    S: EventStore + ?Sized,
{
    replay_into(store, P::default())
}

/// Rebuild starting from an explicitly seeded zero value (e.g. a configured
/// [`NetFlow`](super::NetFlow)).
pub fn replay_into<P, S>(store: &S, seed: P) -> Result<(P, ProjectionCursor), ReplayError>
where
    P: Projection,
    P::Ev: EventCodec,
    S: EventStore + ?Sized,
{
    let mut runner = ProjectionRunner::resume(seed, ProjectionCursor::default());
    let bound = store.high_water_mark()?;
    advance(store, &mut runner, bound)?;
    Ok(runner.into_parts())
}

/// Fold everything committed after the runner's cursor. Returns how many
/// events were applied.
pub fn catch_up<P, S>(store: &S, runner: &mut ProjectionRunner<P>) -> Result<usize, ReplayError>
where
    P: Projection,
    P::Ev: EventCodec,
    S: EventStore + ?Sized,
{
    let bound = store.high_water_mark()?;
    advance(store, runner, bound)
}

fn advance<P, S>(store: &S, runner: &mut ProjectionRunner<P>, bound: u64) -> Result<usize, ReplayError>
where
    P: Projection,
    P::Ev: EventCodec,
    S: EventStore + ?Sized,
{
    let from = runner.cursor().last_global_sequence();
    if bound <= from {
        return Ok(0);
    }

    let stored: Vec<StoredEvent> = store
        .load_all_from(from)?
        .into_iter()
        .take_while(|e| e.global_sequence() <= bound)
        .collect();
    let envelopes = decode_log::<P::Ev>(stored)?;
    runner.run(&envelopes)?;

    tracing::debug!(
        from,
        to = runner.cursor().last_global_sequence(),
        applied = envelopes.len(),
        "projection replayed"
    );
    Ok(envelopes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::{InMemoryEventStore, UncommittedEvent};
    use crate::projections::testing::*;
    use crate::projections::{AccountCounts, TotalFunds};
    use bankledger_accounts::AccountEvent;
    use bankledger_core::{AggregateId, EventId, ExpectedVersion};
    use serde_json::json;

    fn append(store: &InMemoryEventStore, events: Vec<AccountEvent>) {
        for event in events {
            let id = event.account_id().clone();
            let current = store.load(&id).unwrap().len() as u64;
            let uncommitted = UncommittedEvent::from_typed(id.clone(), &event).unwrap();
            store.append(&id, ExpectedVersion::exact(current), vec![uncommitted]).unwrap();
        }
    }

    #[test]
    fn cold_replay_folds_the_whole_log() {
        let store = InMemoryEventStore::new();
        append(&store, vec![opened("ACC1", "Ann"), deposited("ACC1", 500), withdrawn("ACC1", 200, 300)]);

        let (funds, cursor) = replay::<TotalFunds, _>(&store).unwrap();
        assert_eq!(funds.total(), 300);
        assert_eq!(cursor.last_global_sequence(), 3);
    }

    #[test]
    fn catch_up_applies_only_new_events() {
        let store = InMemoryEventStore::new();
        append(&store, vec![opened("ACC1", "Ann"), opened("ACC2", "Bob")]);

        let (counts, cursor) = replay::<AccountCounts, _>(&store).unwrap();
        let mut runner = ProjectionRunner::resume(counts, cursor);
        assert_eq!(catch_up(&store, &mut runner).unwrap(), 0);

        append(&store, vec![closed("ACC2"), opened("ACC3", "Cy")]);
        assert_eq!(catch_up(&store, &mut runner).unwrap(), 2);
        assert_eq!((runner.projection().open(), runner.projection().closed()), (2, 1));
        assert_eq!(runner.cursor().last_global_sequence(), 4);
    }

    #[test]
    fn unknown_kind_in_the_log_is_corruption() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("ACC1").unwrap();
        let bogus = UncommittedEvent {
            event_id: EventId::new(),
            aggregate_id: id.clone(),
            event_type: "Frozen".to_string(),
            event_version: 1,
            payload: json!({}),
        };
        store.append(&id, ExpectedVersion::NEW_STREAM, vec![bogus]).unwrap();

        let err = replay::<TotalFunds, _>(&store).unwrap_err();
        assert!(matches!(err, ReplayError::Corruption(e) if e.is_corruption()));
    }
}
