/// Execute an aggregate command deterministically (no IO).
///
/// The canonical event-sourced step:
///
/// 1. **Decide**: `aggregate.handle(command)` produces events without mutating state.
/// 2. **Evolve**: each event goes through `Aggregate::apply`, the same transition
///    used when replaying history.
///
/// Returns the evolved aggregate together with the new events. On a rejected
/// command, the aggregate is dropped and the error returned; callers that still
/// need the old state should clone before calling.
///
/// For the full pipeline (load, append, retry), use `CommandDispatcher::dispatch()`
/// in `bankledger-infra`.
pub fn execute<A>(aggregate: A, command: &A::Command) -> Result<(A, Vec<A::Event>), A::Error>
where
    A: bankledger_core::Aggregate,
{
    let events = aggregate.handle(command)?;
    let aggregate = events
        .iter()
        .try_fold(aggregate, |state, event| state.apply(event))?;
    Ok((aggregate, events))
}
