//! Envelope builders shared by the projection tests.

use chrono::{DateTime, Utc};

use bankledger_accounts::{
    AccountClosed, AccountEvent, AccountOpened, MoneyDeposited, MoneyWithdrawn, WithdrawalRejected,
};
use bankledger_core::{AggregateId, EventId};
use bankledger_events::{Event, EventEnvelope};

pub fn id(s: &str) -> AggregateId {
    AggregateId::new(s).unwrap()
}

pub fn opened(account: &str, name: &str) -> AccountEvent {
    AccountEvent::Opened(AccountOpened {
        account_id: id(account),
        name: name.to_string(),
        occurred_at: Utc::now(),
    })
}

pub fn deposited(account: &str, amount: i64) -> AccountEvent {
    AccountEvent::Deposited(MoneyDeposited {
        account_id: id(account),
        amount,
        occurred_at: Utc::now(),
    })
}

pub fn withdrawn(account: &str, amount: i64, balance: i64) -> AccountEvent {
    AccountEvent::Withdrawn(MoneyWithdrawn {
        account_id: id(account),
        amount,
        balance,
        occurred_at: Utc::now(),
    })
}

pub fn rejected(account: &str, amount: i64, balance: i64) -> AccountEvent {
    AccountEvent::WithdrawalRejected(WithdrawalRejected {
        account_id: id(account),
        amount,
        balance,
        occurred_at: Utc::now(),
    })
}

pub fn closed(account: &str) -> AccountEvent {
    AccountEvent::Closed(AccountClosed {
        account_id: id(account),
        occurred_at: Utc::now(),
    })
}

/// Envelope at `global_sequence`, recorded at `recorded_at`. The stream
/// version is not meaningful to projections and mirrors the sequence.
pub fn env_at(global_sequence: u64, recorded_at: DateTime<Utc>, event: AccountEvent) -> EventEnvelope<AccountEvent> {
    EventEnvelope::new(
        EventId::new(),
        event.account_id().clone(),
        event.event_type(),
        event.version(),
        global_sequence,
        global_sequence,
        recorded_at,
        event,
    )
}

/// Number the events 1.. in order.
pub fn log(events: Vec<AccountEvent>) -> Vec<EventEnvelope<AccountEvent>> {
    events
        .into_iter()
        .zip(1u64..)
        .map(|(event, seq)| env_at(seq, Utc::now(), event))
        .collect()
}
