use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use bankledger_core::{AggregateId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

type Stream = Arc<RwLock<Vec<StoredEvent>>>;

fn poisoned<T>(_: T) -> EventStoreError {
    EventStoreError::Storage("lock poisoned".to_string())
}

/// In-memory append-only event store.
///
/// Each aggregate stream has its own lock; the version check, version and
/// global sequence assignment, and the push all happen while holding it. The
/// global log lock is only taken for the final push, so writers to different
/// aggregates contend on that short section alone.
///
/// Intended for tests/dev and as the reference for durable backends.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Stream>>,
    log: RwLock<Vec<StoredEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing_stream(&self, aggregate_id: &AggregateId) -> Result<Option<Stream>, EventStoreError> {
        let streams = self.streams.read().map_err(poisoned)?;
        Ok(streams.get(aggregate_id).cloned())
    }

    fn stream_for_write(&self, aggregate_id: &AggregateId) -> Result<Stream, EventStoreError> {
        if let Some(stream) = self.existing_stream(aggregate_id)? {
            return Ok(stream);
        }
        let mut streams = self.streams.write().map_err(poisoned)?;
        Ok(Arc::clone(streams.entry(aggregate_id.clone()).or_default()))
    }

    /// Re-insert an already committed event, e.g. from an exported log.
    ///
    /// Events must arrive in global order: the global sequence has to be the
    /// next one in the log and the version the next one in its stream.
    pub fn restore(&self, event: StoredEvent) -> Result<(), EventStoreError> {
        let stream = self.stream_for_write(event.aggregate_id())?;
        let mut stream = stream.write().map_err(poisoned)?;

        let next_version = stream.len() as u64 + 1;
        if event.version() != next_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "restored event for '{}' has version {}, expected {next_version}",
                event.aggregate_id(),
                event.version()
            )));
        }

        let mut log = self.log.write().map_err(poisoned)?;
        let next_sequence = log.len() as u64 + 1;
        if event.global_sequence() != next_sequence {
            return Err(EventStoreError::InvalidAppend(format!(
                "restored event has global sequence {}, expected {next_sequence}",
                event.global_sequence()
            )));
        }

        log.push(event.clone());
        drop(log);
        stream.push(event);
        Ok(())
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        aggregate_id: &AggregateId,
        expected_version: ExpectedVersion,
        events: Vec<UncommittedEvent>,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        // All events must target the stream being appended to.
        for (idx, e) in events.iter().enumerate() {
            if &e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch for '{aggregate_id}' contains an event for '{}' (index {idx})",
                    e.aggregate_id
                )));
            }
        }

        let stream = self.stream_for_write(aggregate_id)?;
        let mut stream = stream.write().map_err(poisoned)?;

        let current = stream.len() as u64;
        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency {
                aggregate_id: aggregate_id.clone(),
                expected: expected_version.value(),
                actual: current,
            });
        }

        let recorded_at = Utc::now();
        let mut log = self.log.write().map_err(poisoned)?;
        let first_sequence = log.len() as u64 + 1;

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(0u64..)
            .map(|(e, offset)| {
                StoredEvent::new(
                    e.event_id,
                    e.aggregate_id,
                    e.event_type,
                    e.event_version,
                    current + 1 + offset,
                    first_sequence + offset,
                    recorded_at,
                    e.payload,
                )
            })
            .collect();

        log.extend(committed.iter().cloned());
        drop(log);
        stream.extend(committed.iter().cloned());

        tracing::debug!(
            aggregate_id = %aggregate_id,
            count = committed.len(),
            first_global_sequence = first_sequence,
            version = current + committed.len() as u64,
            "appended events"
        );

        Ok(committed)
    }

    fn load(&self, aggregate_id: &AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let events = match self.existing_stream(aggregate_id)? {
            Some(stream) => stream.read().map_err(poisoned)?.clone(),
            None => Vec::new(),
        };
        tracing::debug!(aggregate_id = %aggregate_id, count = events.len(), "loaded stream");
        Ok(events)
    }

    fn load_all_from(&self, after_global_sequence: u64) -> Result<Vec<StoredEvent>, EventStoreError> {
        let log = self.log.read().map_err(poisoned)?;
        let start = usize::try_from(after_global_sequence).unwrap_or(usize::MAX);
        Ok(log.get(start..).map(<[StoredEvent]>::to_vec).unwrap_or_default())
    }

    fn high_water_mark(&self) -> Result<u64, EventStoreError> {
        let log = self.log.read().map_err(poisoned)?;
        Ok(log.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankledger_core::EventId;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Barrier;
    use std::thread;

    fn id(s: &str) -> AggregateId {
        AggregateId::new(s).unwrap()
    }

    fn event(aggregate_id: &AggregateId, amount: i64) -> UncommittedEvent {
        UncommittedEvent {
            event_id: EventId::new(),
            aggregate_id: aggregate_id.clone(),
            event_type: "Deposited".to_string(),
            event_version: 1,
            payload: json!({ "amount": amount }),
        }
    }

    #[test]
    fn append_assigns_versions_and_global_sequence() {
        let store = InMemoryEventStore::new();
        let a = id("ACC1");
        let b = id("ACC2");

        let first = store
            .append(&a, ExpectedVersion::NEW_STREAM, vec![event(&a, 1), event(&a, 2)])
            .unwrap();
        let second = store.append(&b, ExpectedVersion::NEW_STREAM, vec![event(&b, 3)]).unwrap();
        let third = store.append(&a, ExpectedVersion::exact(2), vec![event(&a, 4)]).unwrap();

        assert_eq!(first.iter().map(|e| e.version()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(first.iter().map(|e| e.global_sequence()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!((second[0].version(), second[0].global_sequence()), (1, 3));
        assert_eq!((third[0].version(), third[0].global_sequence()), (3, 4));

        let stream = store.load(&a).unwrap();
        assert_eq!(stream.iter().map(|e| e.version()).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(store.high_water_mark().unwrap(), 4);
        assert!(store.load(&id("ACC9")).unwrap().is_empty());
    }

    #[test]
    fn stale_expected_version_commits_nothing() {
        let store = InMemoryEventStore::new();
        let a = id("ACC1");
        store.append(&a, ExpectedVersion::NEW_STREAM, vec![event(&a, 1)]).unwrap();

        let err = store
            .append(&a, ExpectedVersion::NEW_STREAM, vec![event(&a, 2), event(&a, 3)])
            .unwrap_err();
        match err {
            EventStoreError::Concurrency {
                aggregate_id,
                expected,
                actual,
            } => {
                assert_eq!(aggregate_id, a);
                assert_eq!((expected, actual), (0, 1));
            }
            other => panic!("expected concurrency error, got {other:?}"),
        }

        assert_eq!(store.load(&a).unwrap().len(), 1);
        assert_eq!(store.high_water_mark().unwrap(), 1);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let store = InMemoryEventStore::new();
        let a = id("ACC1");
        assert!(store.append(&a, ExpectedVersion::exact(7), vec![]).unwrap().is_empty());
        assert_eq!(store.high_water_mark().unwrap(), 0);
    }

    #[test]
    fn batch_targeting_another_aggregate_is_rejected() {
        let store = InMemoryEventStore::new();
        let a = id("ACC1");
        let b = id("ACC2");

        let err = store
            .append(&a, ExpectedVersion::NEW_STREAM, vec![event(&a, 1), event(&b, 2)])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn writers_at_the_same_version_conflict_then_succeed_after_reload() {
        let store = InMemoryEventStore::new();
        let a = id("ACC1");
        store.append(&a, ExpectedVersion::NEW_STREAM, vec![event(&a, 1)]).unwrap();
        let n = store.load(&a).unwrap().len() as u64;

        store.append(&a, ExpectedVersion::exact(n), vec![event(&a, 2)]).unwrap();
        let err = store.append(&a, ExpectedVersion::exact(n), vec![event(&a, 3)]).unwrap_err();
        assert!(err.is_concurrency());

        let reloaded = store.load(&a).unwrap().len() as u64;
        assert_eq!(reloaded, n + 1);
        let committed = store.append(&a, ExpectedVersion::exact(reloaded), vec![event(&a, 3)]).unwrap();
        assert_eq!(committed[0].version(), n + 2);
    }

    #[test]
    fn racing_writers_on_one_stream_commit_exactly_once() {
        const WRITERS: usize = 8;
        let store = Arc::new(InMemoryEventStore::new());
        let barrier = Arc::new(Barrier::new(WRITERS));
        let a = id("ACC1");

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let a = a.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store.append(&a, ExpectedVersion::NEW_STREAM, vec![event(&a, i as i64), event(&a, 0)])
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(EventStoreError::is_concurrency));

        assert_eq!(store.load(&a).unwrap().len(), 2);
        assert_eq!(store.high_water_mark().unwrap(), 2);
    }

    #[test]
    fn concurrent_appends_produce_a_total_global_order() {
        const WRITERS: usize = 6;
        const PER_WRITER: u64 = 25;
        let store = Arc::new(InMemoryEventStore::new());
        let barrier = Arc::new(Barrier::new(WRITERS));

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let a = id(&format!("ACC{i}"));
                    barrier.wait();
                    for v in 0..PER_WRITER {
                        store.append(&a, ExpectedVersion::exact(v), vec![event(&a, 1)]).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let log = store.load_all().unwrap();
        let total = WRITERS as u64 * PER_WRITER;
        assert_eq!(log.iter().map(|e| e.global_sequence()).collect::<Vec<_>>(), (1..=total).collect::<Vec<_>>());

        for i in 0..WRITERS {
            let a = id(&format!("ACC{i}"));
            let stream = store.load(&a).unwrap();
            assert_eq!(stream.iter().map(|e| e.version()).collect::<Vec<_>>(), (1..=PER_WRITER).collect::<Vec<_>>());
            assert!(stream.windows(2).all(|w| w[0].global_sequence() < w[1].global_sequence()));
        }
    }

    #[test]
    fn load_all_from_returns_the_suffix_after_a_checkpoint() {
        let store = InMemoryEventStore::new();
        let a = id("ACC1");
        store
            .append(&a, ExpectedVersion::NEW_STREAM, vec![event(&a, 1), event(&a, 2), event(&a, 3)])
            .unwrap();

        let tail = store.load_all_from(1).unwrap();
        assert_eq!(tail.iter().map(|e| e.global_sequence()).collect::<Vec<_>>(), vec![2, 3]);
        assert!(store.load_all_from(3).unwrap().is_empty());
        assert!(store.load_all_from(u64::MAX).unwrap().is_empty());
    }

    #[test]
    fn restore_rejects_gaps_and_duplicates() {
        let source = InMemoryEventStore::new();
        let a = id("ACC1");
        source
            .append(&a, ExpectedVersion::NEW_STREAM, vec![event(&a, 1), event(&a, 2)])
            .unwrap();
        let log = source.load_all().unwrap();

        let target = InMemoryEventStore::new();
        assert!(matches!(target.restore(log[1].clone()), Err(EventStoreError::InvalidAppend(_))));

        target.restore(log[0].clone()).unwrap();
        assert!(matches!(target.restore(log[0].clone()), Err(EventStoreError::InvalidAppend(_))));
        target.restore(log[1].clone()).unwrap();

        assert_eq!(target.load_all().unwrap(), log);
        assert_eq!(target.load(&a).unwrap(), log);
    }

    proptest! {
        #[test]
        fn versions_stay_contiguous_under_any_append_pattern(
            ops in prop::collection::vec((0usize..3, 1usize..4, any::<bool>()), 1..40)
        ) {
            let store = InMemoryEventStore::new();
            let ids = [id("ACC1"), id("ACC2"), id("ACC3")];

            for (which, batch, stale) in ops {
                let a = &ids[which];
                let current = store.load(a).unwrap().len() as u64;
                let expected = if stale && current > 0 { current - 1 } else { current };
                let events = (0..batch).map(|n| event(a, n as i64)).collect();
                let result = store.append(a, ExpectedVersion::exact(expected), events);
                prop_assert_eq!(result.is_ok(), expected == current);
            }

            for a in &ids {
                let versions: Vec<u64> = store.load(a).unwrap().iter().map(|e| e.version()).collect();
                prop_assert_eq!(versions.clone(), (1..=versions.len() as u64).collect::<Vec<_>>());
            }
            let log = store.load_all().unwrap();
            prop_assert!(log.windows(2).all(|w| w[0].global_sequence() + 1 == w[1].global_sequence()));
        }
    }
}
