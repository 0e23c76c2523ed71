//! Aggregate root trait for event-sourced domain models.

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Highest per-aggregate version applied so far (0 = nothing applied).
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an append.
///
/// Holds the version the writer loaded at. The append is accepted only if the
/// stream's next free version is `expected + 1`, i.e. nobody else appended in
/// between.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpectedVersion(u64);

impl ExpectedVersion {
    /// Expect a stream that has never had events.
    pub const NEW_STREAM: ExpectedVersion = ExpectedVersion(0);

    pub fn exact(version: u64) -> Self {
        Self(version)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// First per-aggregate version the append will assign.
    pub fn next(self) -> u64 {
        self.0 + 1
    }

    pub fn matches(self, actual: u64) -> bool {
        self.0 == actual
    }
}

impl From<u64> for ExpectedVersion {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State transition**: `apply(self, event)` returns the next state.
///
/// `apply` is the only transition function. The same call evolves state after a
/// live decision and during rehydration from history, so the two can never
/// diverge. Aggregates must not perform IO or side effects.
pub trait Aggregate: AggregateRoot + Sized {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve state by exactly one event (+1 version).
    ///
    /// Fails when the event cannot be applied to this state (history is
    /// corrupt); it never silently skips.
    fn apply(self, event: &Self::Event) -> Result<Self, Self::Error>;

    /// Decide which events to emit given the current state and a command.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Rebuild state by folding `apply` over an ordered history, starting from
    /// `self` (normally the empty aggregate).
    fn load_from_history<'a, I>(self, history: I) -> Result<Self, Self::Error>
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        history.into_iter().try_fold(self, |state, event| state.apply(event))
    }
}
