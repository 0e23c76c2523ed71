//! Total funds held across all accounts.

use bankledger_accounts::AccountEvent;
use bankledger_events::{EventEnvelope, Projection};

/// Running sum of deposits minus withdrawals.
///
/// Rejected withdrawals move no money and contribute nothing. The sum is kept
/// as `i128` so that many accounts near `i64::MAX` cannot overflow it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TotalFunds {
    total: i128,
}

impl TotalFunds {
    pub fn total(&self) -> i128 {
        self.total
    }
}

impl Projection for TotalFunds {
    type Ev = AccountEvent;

    fn apply(&mut self, envelope: &EventEnvelope<AccountEvent>) {
        match envelope.payload() {
            AccountEvent::Deposited(e) => self.total += i128::from(e.amount),
            AccountEvent::Withdrawn(e) => self.total -= i128::from(e.amount),
            AccountEvent::Opened(_) | AccountEvent::WithdrawalRejected(_) | AccountEvent::Closed(_) => {}
        }
    }
}
