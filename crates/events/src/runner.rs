//! Projection runner utilities (read model builders).
//!
//! Read models are **disposable**; events are the source of truth.
//! This module provides deterministic replay and checkpoint tracking over the
//! global sequence without making storage assumptions.

use thiserror::Error;

use crate::{EventEnvelope, Projection};

/// Tracks projection progress through the global log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ProjectionCursor {
    last_global_sequence: u64,
}

impl ProjectionCursor {
    /// A checkpoint saved earlier (0 = nothing applied).
    pub fn at(last_global_sequence: u64) -> Self {
        Self { last_global_sequence }
    }

    pub fn last_global_sequence(&self) -> u64 {
        self.last_global_sequence
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("non-monotonic global sequence (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Runs envelopes through a projection and tracks progress.
#[derive(Debug)]
pub struct ProjectionRunner<P>
where
    P: Projection,
{
    projection: P,
    cursor: ProjectionCursor,
}

impl<P> ProjectionRunner<P>
where
    P: Projection,
{
    /// A cold-start runner: zero-valued projection, nothing applied.
    pub fn new() -> Self {
        Self::resume(P::default(), ProjectionCursor::default())
    }

    /// Continue a projection that has already folded everything up to `cursor`.
    pub fn resume(projection: P, cursor: ProjectionCursor) -> Self {
        Self { projection, cursor }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn into_projection(self) -> P {
        self.projection
    }

    pub fn cursor(&self) -> ProjectionCursor {
        self.cursor
    }

    pub fn into_parts(self) -> (P, ProjectionCursor) {
        (self.projection, self.cursor)
    }

    /// Apply a single envelope, enforcing strictly increasing global sequence.
    ///
    /// A rejected envelope leaves both the read model and the cursor untouched.
    pub fn apply(&mut self, envelope: &EventEnvelope<P::Ev>) -> Result<(), ProjectionError> {
        let found = envelope.global_sequence();
        let last = self.cursor.last_global_sequence;
        if found <= last {
            return Err(ProjectionError::NonMonotonicSequence { last, found });
        }

        self.projection.apply(envelope);
        self.cursor.last_global_sequence = found;
        Ok(())
    }

    /// Apply many envelopes in order.
    pub fn run<'a>(
        &mut self,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<(), ProjectionError>
    where
        P::Ev: 'a,
    {
        let mut applied = 0usize;
        for env in envelopes {
            self.apply(env)?;
            applied += 1;
        }
        tracing::debug!(
            applied,
            last_global_sequence = self.cursor.last_global_sequence,
            "projection advanced"
        );
        Ok(())
    }

    /// Rebuild a projection from scratch by replaying the full event history.
    pub fn rebuild_from_scratch<'a>(
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<(P, ProjectionCursor), ProjectionError>
    where
        P::Ev: 'a,
    {
        let mut runner = Self::new();
        runner.run(envelopes)?;
        Ok(runner.into_parts())
    }
}

impl<P> Default for ProjectionRunner<P>
where
    P: Projection,
{
    fn default() -> Self {
        Self::new()
    }
}
