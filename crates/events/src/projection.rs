use crate::EventEnvelope;

/// A projection builds a read model from the global event log.
///
/// Projections implement the **CQRS read model pattern**: they fold committed
/// events (write model) into queryable state (read model).
///
/// ## Fold semantics
///
/// A projection is an accumulator seeded at its zero value (`Default`) and
/// advanced one envelope at a time by `apply`. It must be deterministic: the
/// same log folded twice gives the same read model.
///
/// ## Ordering
///
/// Envelopes are fed in strict global-sequence order (see `ProjectionRunner`).
/// Implementations must never reorder by `recorded_at` or by any timestamp in
/// the payload; those are caller-controlled and do not define causal order.
/// They may still *bucket* by a timestamp (e.g. per-month totals) since that
/// does not depend on arrival order.
///
/// ## Disposability
///
/// Read models are disposable: they can be dropped and rebuilt from the log at
/// any time. Persistence of read models is outside this crate.
pub trait Projection: Default {
    type Ev;

    /// Apply a single envelope, updating the read model.
    ///
    /// Envelopes irrelevant to this projection are ignored.
    fn apply(&mut self, envelope: &EventEnvelope<Self::Ev>);

    /// Fold a whole ordered sequence from the zero value.
    fn fold<'a>(envelopes: impl IntoIterator<Item = &'a EventEnvelope<Self::Ev>>) -> Self
    where
        Self::Ev: 'a,
    {
        let mut acc = Self::default();
        for env in envelopes {
            acc.apply(env);
        }
        acc
    }
}
