use bankledger_core::AggregateId;

/// A command targets exactly one aggregate stream.
///
/// Commands represent **intent**. They are transient (never persisted) and are
/// either rejected or turned into events by the target aggregate. A command
/// never spans two aggregates.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> &AggregateId;

    /// Stable command name, used in logs and error messages.
    fn command_type(&self) -> &'static str;
}
