use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use bankledger_core::{AggregateId, DomainError, DomainResult};
use bankledger_events::Command;

/// Command: OpenAccount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAccount {
    pub account_id: AggregateId,
    pub name: String,
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

/// Command: DepositMoney.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMoney {
    pub account_id: AggregateId,
    pub amount: i64,
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

/// Command: WithdrawMoney.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawMoney {
    pub account_id: AggregateId,
    pub amount: i64,
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

/// Command: CloseAccount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseAccount {
    pub account_id: AggregateId,
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

/// Closed set of command kinds, with the tag accepted on tagged input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AccountCommandKind {
    Open,
    Deposit,
    Withdraw,
    Close,
}

impl AccountCommandKind {
    pub const ALL: [AccountCommandKind; 4] = [
        AccountCommandKind::Open,
        AccountCommandKind::Deposit,
        AccountCommandKind::Withdraw,
        AccountCommandKind::Close,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccountCommandKind::Open => "Open",
            AccountCommandKind::Deposit => "Deposit",
            AccountCommandKind::Withdraw => "Withdraw",
            AccountCommandKind::Close => "Close",
        }
    }
}

impl core::fmt::Display for AccountCommandKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountCommandKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown command kind '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCommand {
    Open(OpenAccount),
    Deposit(DepositMoney),
    Withdraw(WithdrawMoney),
    Close(CloseAccount),
}

impl AccountCommand {
    pub fn open(account_id: AggregateId, name: impl Into<String>) -> Self {
        AccountCommand::Open(OpenAccount {
            account_id,
            name: name.into(),
            occurred_at: Utc::now(),
        })
    }

    pub fn deposit(account_id: AggregateId, amount: i64) -> Self {
        AccountCommand::Deposit(DepositMoney {
            account_id,
            amount,
            occurred_at: Utc::now(),
        })
    }

    pub fn withdraw(account_id: AggregateId, amount: i64) -> Self {
        AccountCommand::Withdraw(WithdrawMoney {
            account_id,
            amount,
            occurred_at: Utc::now(),
        })
    }

    pub fn close(account_id: AggregateId) -> Self {
        AccountCommand::Close(CloseAccount {
            account_id,
            occurred_at: Utc::now(),
        })
    }

    pub fn kind(&self) -> AccountCommandKind {
        match self {
            AccountCommand::Open(_) => AccountCommandKind::Open,
            AccountCommand::Deposit(_) => AccountCommandKind::Deposit,
            AccountCommand::Withdraw(_) => AccountCommandKind::Withdraw,
            AccountCommand::Close(_) => AccountCommandKind::Close,
        }
    }

    /// Parse a tagged command, e.g. `{"kind": "Deposit", "account_id": "ACC1", "amount": 5}`.
    ///
    /// The tag is checked against the closed set first so an unknown kind is
    /// reported by name; field errors are validation failures too.
    pub fn from_tagged(value: JsonValue) -> DomainResult<Self> {
        let JsonValue::Object(mut fields) = value else {
            return Err(DomainError::validation("command must be a JSON object"));
        };

        let kind = match fields.remove("kind") {
            Some(JsonValue::String(kind)) => kind.parse::<AccountCommandKind>()?,
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "command kind must be a string, got {other}"
                )));
            }
            None => return Err(DomainError::validation("command is missing 'kind'")),
        };

        let fields = JsonValue::Object(fields);
        let invalid = |e: serde_json::Error| DomainError::validation(format!("invalid {kind} command: {e}"));

        Ok(match kind {
            AccountCommandKind::Open => AccountCommand::Open(serde_json::from_value(fields).map_err(invalid)?),
            AccountCommandKind::Deposit => {
                AccountCommand::Deposit(serde_json::from_value(fields).map_err(invalid)?)
            }
            AccountCommandKind::Withdraw => {
                AccountCommand::Withdraw(serde_json::from_value(fields).map_err(invalid)?)
            }
            AccountCommandKind::Close => AccountCommand::Close(serde_json::from_value(fields).map_err(invalid)?),
        })
    }
}

impl Command for AccountCommand {
    fn target_aggregate_id(&self) -> &AggregateId {
        match self {
            AccountCommand::Open(c) => &c.account_id,
            AccountCommand::Deposit(c) => &c.account_id,
            AccountCommand::Withdraw(c) => &c.account_id,
            AccountCommand::Close(c) => &c.account_id,
        }
    }

    fn command_type(&self) -> &'static str {
        self.kind().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_commands() {
        let cmd = AccountCommand::from_tagged(json!({
            "kind": "Deposit",
            "account_id": "ACC1",
            "amount": 500
        }))
        .unwrap();

        match &cmd {
            AccountCommand::Deposit(d) => {
                assert_eq!(d.account_id.as_str(), "ACC1");
                assert_eq!(d.amount, 500);
            }
            other => panic!("expected deposit, got {other:?}"),
        }
        assert_eq!(cmd.target_aggregate_id().as_str(), "ACC1");
        assert_eq!(cmd.command_type(), "Deposit");
    }

    #[test]
    fn occurred_at_is_kept_when_given_and_stamped_when_missing() {
        let given = AccountCommand::from_tagged(json!({
            "kind": "Close",
            "account_id": "ACC1",
            "occurred_at": "2024-03-01T12:00:00Z"
        }))
        .unwrap();
        let AccountCommand::Close(close) = given else {
            panic!("expected close");
        };
        assert_eq!(close.occurred_at.to_rfc3339(), "2024-03-01T12:00:00+00:00");

        let before = Utc::now();
        let stamped = AccountCommand::from_tagged(json!({ "kind": "Close", "account_id": "ACC1" })).unwrap();
        let AccountCommand::Close(close) = stamped else {
            panic!("expected close");
        };
        assert!(close.occurred_at >= before && close.occurred_at <= Utc::now());
    }

    #[test]
    fn unknown_kind_is_named_in_the_error() {
        let err = AccountCommand::from_tagged(json!({ "kind": "Transfer", "account_id": "ACC1" })).unwrap_err();
        assert_eq!(err, DomainError::validation("unknown command kind 'Transfer'"));
    }

    #[test]
    fn missing_kind_or_bad_fields_are_validation_errors() {
        let missing = AccountCommand::from_tagged(json!({ "account_id": "ACC1" })).unwrap_err();
        assert!(matches!(missing, DomainError::Validation(_)));

        let bad = AccountCommand::from_tagged(json!({ "kind": "Open", "account_id": "" , "name": "Ann" }))
            .unwrap_err();
        assert!(matches!(bad, DomainError::Validation(msg) if msg.starts_with("invalid Open command")));

        let not_object = AccountCommand::from_tagged(json!(["Open"])).unwrap_err();
        assert!(matches!(not_object, DomainError::Validation(_)));
    }
}
