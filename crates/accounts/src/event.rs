use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use bankledger_core::{AggregateId, DomainError, DomainResult};
use bankledger_events::{Event, EventCodec};

/// Current schema version of every account event payload.
pub const SCHEMA_VERSION: u32 = 1;

/// Closed set of account event kinds.
///
/// The name table below is the persisted tag. Adding a kind means adding a
/// variant here, which makes every exhaustive `match` in the workspace fail to
/// compile until it is handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountEventKind {
    Opened,
    Deposited,
    Withdrawn,
    WithdrawalRejected,
    Closed,
}

impl AccountEventKind {
    pub const ALL: [AccountEventKind; 5] = [
        AccountEventKind::Opened,
        AccountEventKind::Deposited,
        AccountEventKind::Withdrawn,
        AccountEventKind::WithdrawalRejected,
        AccountEventKind::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccountEventKind::Opened => "Opened",
            AccountEventKind::Deposited => "Deposited",
            AccountEventKind::Withdrawn => "Withdrawn",
            AccountEventKind::WithdrawalRejected => "WithdrawalRejected",
            AccountEventKind::Closed => "Closed",
        }
    }
}

impl core::fmt::Display for AccountEventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountEventKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::corruption(format!("unknown event kind '{s}'")))
    }
}

/// Event: an account was opened with a zero balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOpened {
    pub account_id: AggregateId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: money was deposited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyDeposited {
    pub account_id: AggregateId,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: money was withdrawn. `balance` is the balance after the withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyWithdrawn {
    pub account_id: AggregateId,
    pub amount: i64,
    pub balance: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a withdrawal was refused for insufficient funds.
///
/// An audit record, not a state change: `balance` is the unchanged balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRejected {
    pub account_id: AggregateId,
    pub amount: i64,
    pub balance: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: the account was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountClosed {
    pub account_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    Opened(AccountOpened),
    Deposited(MoneyDeposited),
    Withdrawn(MoneyWithdrawn),
    WithdrawalRejected(WithdrawalRejected),
    Closed(AccountClosed),
}

impl AccountEvent {
    pub fn kind(&self) -> AccountEventKind {
        match self {
            AccountEvent::Opened(_) => AccountEventKind::Opened,
            AccountEvent::Deposited(_) => AccountEventKind::Deposited,
            AccountEvent::Withdrawn(_) => AccountEventKind::Withdrawn,
            AccountEvent::WithdrawalRejected(_) => AccountEventKind::WithdrawalRejected,
            AccountEvent::Closed(_) => AccountEventKind::Closed,
        }
    }

    pub fn account_id(&self) -> &AggregateId {
        match self {
            AccountEvent::Opened(e) => &e.account_id,
            AccountEvent::Deposited(e) => &e.account_id,
            AccountEvent::Withdrawn(e) => &e.account_id,
            AccountEvent::WithdrawalRejected(e) => &e.account_id,
            AccountEvent::Closed(e) => &e.account_id,
        }
    }

    /// True for the insufficient-funds audit record.
    ///
    /// The command that produced it *succeeded* from the ledger's point of view;
    /// callers decide whether to report it to clients as a failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, AccountEvent::WithdrawalRejected(_))
    }
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        self.kind().as_str()
    }

    fn version(&self) -> u32 {
        SCHEMA_VERSION
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::Opened(e) => e.occurred_at,
            AccountEvent::Deposited(e) => e.occurred_at,
            AccountEvent::Withdrawn(e) => e.occurred_at,
            AccountEvent::WithdrawalRejected(e) => e.occurred_at,
            AccountEvent::Closed(e) => e.occurred_at,
        }
    }
}

fn decode_fields<T: serde::de::DeserializeOwned>(
    kind: AccountEventKind,
    payload: JsonValue,
) -> DomainResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| DomainError::corruption(format!("malformed {kind} payload: {e}")))
}

impl EventCodec for AccountEvent {
    fn encode(&self) -> Result<JsonValue, serde_json::Error> {
        match self {
            AccountEvent::Opened(e) => serde_json::to_value(e),
            AccountEvent::Deposited(e) => serde_json::to_value(e),
            AccountEvent::Withdrawn(e) => serde_json::to_value(e),
            AccountEvent::WithdrawalRejected(e) => serde_json::to_value(e),
            AccountEvent::Closed(e) => serde_json::to_value(e),
        }
    }

    fn decode(event_type: &str, event_version: u32, payload: JsonValue) -> DomainResult<Self> {
        let kind: AccountEventKind = event_type.parse()?;
        if event_version != SCHEMA_VERSION {
            return Err(DomainError::corruption(format!(
                "unsupported schema version {event_version} for {kind}"
            )));
        }

        Ok(match kind {
            AccountEventKind::Opened => AccountEvent::Opened(decode_fields(kind, payload)?),
            AccountEventKind::Deposited => AccountEvent::Deposited(decode_fields(kind, payload)?),
            AccountEventKind::Withdrawn => AccountEvent::Withdrawn(decode_fields(kind, payload)?),
            AccountEventKind::WithdrawalRejected => {
                AccountEvent::WithdrawalRejected(decode_fields(kind, payload)?)
            }
            AccountEventKind::Closed => AccountEvent::Closed(decode_fields(kind, payload)?),
        })
    }
}
