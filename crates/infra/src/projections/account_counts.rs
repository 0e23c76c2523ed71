use bankledger_accounts::AccountEvent;
use bankledger_events::{EventEnvelope, Projection};

/// Number of open and closed accounts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccountCounts {
    open: u64,
    closed: u64,
}

impl AccountCounts {
    pub fn open(&self) -> u64 {
        self.open
    }

    pub fn closed(&self) -> u64 {
        self.closed
    }
}

impl Projection for AccountCounts {
    type Ev = AccountEvent;

    fn apply(&mut self, envelope: &EventEnvelope<AccountEvent>) {
        match envelope.payload() {
            AccountEvent::Opened(_) => self.open += 1,
            AccountEvent::Closed(_) => {
                self.open = self.open.saturating_sub(1);
                self.closed += 1;
            }
            AccountEvent::Deposited(_) | AccountEvent::Withdrawn(_) | AccountEvent::WithdrawalRejected(_) => {}
        }
    }
}
