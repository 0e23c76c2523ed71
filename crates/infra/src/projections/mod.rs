//! Projection implementations (read model builders).
//!
//! Projections consume account events in global order and build
//! query-optimized read models. All projections are:
//! - **Rebuildable**: can be reconstructed from the event log
//! - **Deterministic**: the same log always folds to the same value
//! - **Checkpointable**: a `ProjectionCursor` lets them resume incrementally

pub mod account_counts;
pub mod net_flow;
pub mod replay;
pub mod report;
pub mod top_balances;
pub mod total_funds;

#[cfg(test)]
pub(crate) mod testing;

pub use account_counts::AccountCounts;
pub use net_flow::{NetFlow, Period};
pub use replay::{ReplayError, catch_up, decode_log, replay, replay_into};
pub use report::{BankReport, LedgerProjections};
pub use top_balances::{RankedAccount, TopBalances};
pub use total_funds::TotalFunds;
