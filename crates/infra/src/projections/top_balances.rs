//! Ranking of accounts by balance.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use bankledger_accounts::AccountEvent;
use bankledger_core::AggregateId;
use bankledger_events::{EventEnvelope, Projection};

/// One row of the top-N report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedAccount {
    pub account_id: AggregateId,
    pub name: String,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Holding {
    name: String,
    balance: i64,
}

/// Last-known balance per open account, ordered by balance descending and
/// then by id ascending.
///
/// The ranking is a `BTreeSet` keyed on `(Reverse(balance), id)`, so a
/// balance change is a remove plus an insert and `top(n)` walks the first `n`
/// entries. Closed accounts drop out of the ranking.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TopBalances {
    holdings: HashMap<AggregateId, Holding>,
    ranking: BTreeSet<(Reverse<i64>, AggregateId)>,
}

impl TopBalances {
    /// The `n` largest balances.
    pub fn top(&self, n: usize) -> Vec<RankedAccount> {
        self.ranking
            .iter()
            .take(n)
            .filter_map(|(Reverse(balance), id)| {
                self.holdings.get(id).map(|h| RankedAccount {
                    account_id: id.clone(),
                    name: h.name.clone(),
                    balance: *balance,
                })
            })
            .collect()
    }

    pub fn balance_of(&self, account_id: &AggregateId) -> Option<i64> {
        self.holdings.get(account_id).map(|h| h.balance)
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    fn set_balance(&mut self, account_id: &AggregateId, balance: i64) {
        let holding = self.holdings.entry(account_id.clone()).or_insert_with(|| Holding {
            name: String::new(),
            balance: 0,
        });
        self.ranking.remove(&(Reverse(holding.balance), account_id.clone()));
        holding.balance = balance;
        self.ranking.insert((Reverse(balance), account_id.clone()));
    }

    fn remove(&mut self, account_id: &AggregateId) {
        if let Some(holding) = self.holdings.remove(account_id) {
            self.ranking.remove(&(Reverse(holding.balance), account_id.clone()));
        }
    }
}

impl Projection for TopBalances {
    type Ev = AccountEvent;

    fn apply(&mut self, envelope: &EventEnvelope<AccountEvent>) {
        match envelope.payload() {
            AccountEvent::Opened(e) => {
                self.holdings.insert(
                    e.account_id.clone(),
                    Holding {
                        name: e.name.clone(),
                        balance: 0,
                    },
                );
                self.ranking.insert((Reverse(0), e.account_id.clone()));
            }
            AccountEvent::Deposited(e) => {
                let current = self.balance_of(&e.account_id).unwrap_or(0);
                self.set_balance(&e.account_id, current.saturating_add(e.amount));
            }
            // The event carries the resulting balance; no arithmetic needed.
            AccountEvent::Withdrawn(e) => self.set_balance(&e.account_id, e.balance),
            AccountEvent::WithdrawalRejected(_) => {}
            AccountEvent::Closed(e) => self.remove(&e.account_id),
        }
    }
}
