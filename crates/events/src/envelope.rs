use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankledger_core::{AggregateId, EventId};

/// Envelope for a committed event, containing stream + global-log metadata.
///
/// This is the unit the store hands back from appends and reads.
///
/// Notes:
/// - **Append-only**: once committed an envelope is never edited, reordered or deleted.
/// - `version` is the 1-based, gap-free position in the aggregate's own stream.
/// - `global_sequence` is the 1-based, gap-free position in the whole store and
///   the only legitimate ordering key for projections.
/// - `recorded_at` is informational; nothing orders by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: EventId,
    aggregate_id: AggregateId,

    event_type: String,
    event_version: u32,

    version: u64,
    global_sequence: u64,

    recorded_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_id: EventId,
        aggregate_id: AggregateId,
        event_type: impl Into<String>,
        event_version: u32,
        version: u64,
        global_sequence: u64,
        recorded_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            event_type: event_type.into(),
            event_version,
            version,
            global_sequence,
            recorded_at,
            payload,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    /// Position in the aggregate stream.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Position in the global log.
    pub fn global_sequence(&self) -> u64 {
        self.global_sequence
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Swap the payload, keeping all metadata.
    pub fn with_payload<T>(self, payload: T) -> EventEnvelope<T> {
        EventEnvelope {
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            event_type: self.event_type,
            event_version: self.event_version,
            version: self.version,
            global_sequence: self.global_sequence,
            recorded_at: self.recorded_at,
            payload,
        }
    }

    /// Decode (or otherwise convert) the payload, keeping all metadata.
    pub fn try_map_payload<T, Err>(
        self,
        f: impl FnOnce(&str, u32, E) -> Result<T, Err>,
    ) -> Result<EventEnvelope<T>, Err> {
        let EventEnvelope {
            event_id,
            aggregate_id,
            event_type,
            event_version,
            version,
            global_sequence,
            recorded_at,
            payload,
        } = self;
        let payload = f(&event_type, event_version, payload)?;
        Ok(EventEnvelope {
            event_id,
            aggregate_id,
            event_type,
            event_version,
            version,
            global_sequence,
            recorded_at,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(payload: &str) -> EventEnvelope<String> {
        EventEnvelope::new(
            EventId::new(),
            AggregateId::new("ACC1").unwrap(),
            "Noted",
            1,
            4,
            9,
            Utc::now(),
            payload.to_string(),
        )
    }

    #[test]
    fn try_map_payload_keeps_metadata() {
        let env = envelope("42");
        let id = env.event_id();

        let mapped = env
            .try_map_payload(|ty, v, p| {
                assert_eq!(ty, "Noted");
                assert_eq!(v, 1);
                p.parse::<u32>()
            })
            .unwrap();

        assert_eq!(*mapped.payload(), 42);
        assert_eq!(mapped.event_id(), id);
        assert_eq!(mapped.version(), 4);
        assert_eq!(mapped.global_sequence(), 9);
    }

    #[test]
    fn try_map_payload_propagates_decode_failure() {
        assert!(envelope("nope").try_map_payload(|_, _, p| p.parse::<u32>()).is_err());
    }

    #[test]
    fn envelope_serializes_with_metadata() {
        let json = serde_json::to_value(envelope("x")).unwrap();
        assert_eq!(json["aggregate_id"], "ACC1");
        assert_eq!(json["global_sequence"], 9);
        assert_eq!(json["payload"], "x");
    }
}
