//! Payload encoding boundary between typed domain events and the store.
//!
//! The store keeps payloads as JSON tagged with `event_type` and
//! `event_version`. Decoding is directed by the tag: the domain crate parses it
//! against its closed set of kinds and only then deserializes the fields.

use serde_json::Value as JsonValue;

use bankledger_core::DomainResult;

use crate::Event;

pub trait EventCodec: Event + Sized {
    /// Serialize the kind-specific fields (the tag travels separately).
    fn encode(&self) -> Result<JsonValue, serde_json::Error>;

    /// Rebuild a typed event from its stored tag and payload.
    ///
    /// Unknown tags, unsupported schema versions and malformed payloads are
    /// `DomainError::Corruption`: they must stop replay, never be skipped.
    fn decode(event_type: &str, event_version: u32, payload: JsonValue) -> DomainResult<Self>;
}
