//! Every baseline read model, built in one pass over the log.

use serde::Serialize;

use bankledger_accounts::AccountEvent;
use bankledger_events::{EventEnvelope, Projection, ProjectionCursor};

use crate::config::ProjectionConfig;
use crate::event_store::EventStore;

use super::replay::{ReplayError, replay_into};
use super::{AccountCounts, NetFlow, Period, RankedAccount, TopBalances, TotalFunds};

/// The four baseline projections folded together.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LedgerProjections {
    pub total_funds: TotalFunds,
    pub counts: AccountCounts,
    pub top_balances: TopBalances,
    pub net_flow: NetFlow,
}

impl LedgerProjections {
    pub fn with_period(period: Period) -> Self {
        Self {
            net_flow: NetFlow::with_period(period),
            ..Self::default()
        }
    }
}

impl Projection for LedgerProjections {
    type Ev = AccountEvent;

    fn apply(&mut self, envelope: &EventEnvelope<AccountEvent>) {
        self.total_funds.apply(envelope);
        self.counts.apply(envelope);
        self.top_balances.apply(envelope);
        self.net_flow.apply(envelope);
    }
}

/// A point-in-time report, as of `through_global_sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankReport {
    pub through_global_sequence: u64,
    pub total_funds: i128,
    pub open_accounts: u64,
    pub closed_accounts: u64,
    pub top_balances: Vec<RankedAccount>,
    pub net_flow: Vec<(String, i64)>,
}

impl BankReport {
    pub fn build<S>(store: &S, config: &ProjectionConfig) -> Result<Self, ReplayError>
    where
        S: EventStore + ?Sized,
    {
        let (projections, cursor) = replay_into(store, LedgerProjections::with_period(config.period))?;
        Ok(Self::from_projections(&projections, cursor, config.top_n))
    }

    pub fn from_projections(projections: &LedgerProjections, cursor: ProjectionCursor, top_n: usize) -> Self {
        Self {
            through_global_sequence: cursor.last_global_sequence(),
            total_funds: projections.total_funds.total(),
            open_accounts: projections.counts.open(),
            closed_accounts: projections.counts.closed(),
            top_balances: projections.top_balances.top(top_n),
            net_flow: projections.net_flow.buckets(),
        }
    }
}
