use bankledger_core::{Aggregate, AggregateId, AggregateRoot, DomainError};

use crate::command::{AccountCommand, CloseAccount, DepositMoney, OpenAccount, WithdrawMoney};
use crate::event::{
    AccountClosed, AccountEvent, AccountOpened, MoneyDeposited, MoneyWithdrawn, WithdrawalRejected,
};

/// Lifecycle position of an account.
///
/// `Closed` is distinct from `Nonexistent`: a closed account keeps its history
/// and can never be opened again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AccountStatus {
    #[default]
    Nonexistent,
    Open,
    Closed,
}

/// Aggregate root: Account.
///
/// A cache of the account's stream, never authoritative. Rebuild it with
/// `Account::empty(id).load_from_history(..)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AggregateId,
    name: String,
    balance: i64,
    status: AccountStatus,
    version: u64,
}

impl Account {
    /// Create an empty, not-yet-opened aggregate instance for rehydration.
    pub fn empty(id: AggregateId) -> Self {
        Self {
            id,
            name: String::new(),
            balance: 0,
            status: AccountStatus::Nonexistent,
            version: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == AccountStatus::Open
    }

    /// False only before the account has been opened.
    pub fn exists(&self) -> bool {
        self.status != AccountStatus::Nonexistent
    }
}

impl AggregateRoot for Account {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Account {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = DomainError;

    fn apply(mut self, event: &Self::Event) -> Result<Self, Self::Error> {
        if event.account_id() != &self.id {
            return Err(DomainError::corruption(format!(
                "{} event for account '{}' found in stream '{}'",
                event.kind(),
                event.account_id(),
                self.id
            )));
        }

        match event {
            AccountEvent::Opened(e) => {
                if self.exists() {
                    return Err(self.corrupt(event, "account was already opened"));
                }
                self.name = e.name.clone();
                self.balance = 0;
                self.status = AccountStatus::Open;
            }
            AccountEvent::Deposited(e) => {
                self.require_open(event)?;
                if e.amount <= 0 {
                    return Err(self.corrupt(event, "non-positive amount"));
                }
                let Some(balance) = self.balance.checked_add(e.amount) else {
                    return Err(self.corrupt(event, "balance overflow"));
                };
                self.balance = balance;
            }
            AccountEvent::Withdrawn(e) => {
                self.require_open(event)?;
                if e.amount <= 0 || e.amount > self.balance {
                    return Err(self.corrupt(event, "amount not covered by balance"));
                }
                let balance = self.balance - e.amount;
                if e.balance != balance {
                    return Err(self.corrupt(event, "recorded balance does not match history"));
                }
                self.balance = balance;
            }
            AccountEvent::WithdrawalRejected(e) => {
                self.require_open(event)?;
                if e.balance != self.balance {
                    return Err(self.corrupt(event, "recorded balance does not match history"));
                }
            }
            AccountEvent::Closed(_) => {
                self.require_open(event)?;
                if self.balance != 0 {
                    return Err(self.corrupt(event, "closed with a non-zero balance"));
                }
                self.status = AccountStatus::Closed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
        Ok(self)
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::Open(cmd) => self.handle_open(cmd),
            AccountCommand::Deposit(cmd) => self.handle_deposit(cmd),
            AccountCommand::Withdraw(cmd) => self.handle_withdraw(cmd),
            AccountCommand::Close(cmd) => self.handle_close(cmd),
        }
    }
}

impl Account {
    fn corrupt(&self, event: &AccountEvent, reason: &str) -> DomainError {
        DomainError::corruption(format!(
            "cannot apply {} to account '{}' at version {}: {reason}",
            event.kind(),
            self.id,
            self.version
        ))
    }

    fn require_open(&self, event: &AccountEvent) -> Result<(), DomainError> {
        match self.status {
            AccountStatus::Open => Ok(()),
            AccountStatus::Nonexistent => Err(self.corrupt(event, "account was never opened")),
            AccountStatus::Closed => Err(self.corrupt(event, "account is closed")),
        }
    }

    fn ensure_account_id(&self, account_id: &AggregateId) -> Result<(), DomainError> {
        if &self.id != account_id {
            return Err(DomainError::validation(format!(
                "command targets account '{account_id}' but was routed to '{}'",
                self.id
            )));
        }
        Ok(())
    }

    fn ensure_open(&self, action: &str) -> Result<(), DomainError> {
        match self.status {
            AccountStatus::Open => Ok(()),
            AccountStatus::Nonexistent => Err(DomainError::validation(format!(
                "cannot {action} account '{}': account is not open",
                self.id
            ))),
            AccountStatus::Closed => Err(DomainError::validation(format!(
                "cannot {action} account '{}': account is closed",
                self.id
            ))),
        }
    }

    fn ensure_positive(amount: i64, what: &str) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::validation(format!(
                "{what} amount must be greater than zero (amount: {amount})"
            )));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenAccount) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_account_id(&cmd.account_id)?;
        match self.status {
            AccountStatus::Nonexistent => {}
            AccountStatus::Open => {
                return Err(DomainError::validation(format!(
                    "cannot open account '{}': account was already opened",
                    self.id
                )));
            }
            AccountStatus::Closed => {
                return Err(DomainError::validation(format!(
                    "cannot open account '{}': account is closed",
                    self.id
                )));
            }
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![AccountEvent::Opened(AccountOpened {
            account_id: cmd.account_id.clone(),
            name: cmd.name.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deposit(&self, cmd: &DepositMoney) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_account_id(&cmd.account_id)?;
        self.ensure_open("deposit into")?;
        Self::ensure_positive(cmd.amount, "deposit")?;
        if self.balance.checked_add(cmd.amount).is_none() {
            return Err(DomainError::validation("deposit would overflow the balance"));
        }

        Ok(vec![AccountEvent::Deposited(MoneyDeposited {
            account_id: cmd.account_id.clone(),
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &WithdrawMoney) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_account_id(&cmd.account_id)?;
        self.ensure_open("withdraw from")?;
        Self::ensure_positive(cmd.amount, "withdrawal")?;

        if self.balance >= cmd.amount {
            return Ok(vec![AccountEvent::Withdrawn(MoneyWithdrawn {
                account_id: cmd.account_id.clone(),
                amount: cmd.amount,
                balance: self.balance - cmd.amount,
                occurred_at: cmd.occurred_at,
            })]);
        }

        // Insufficient funds is a recorded outcome, not a command failure.
        Ok(vec![AccountEvent::WithdrawalRejected(WithdrawalRejected {
            account_id: cmd.account_id.clone(),
            amount: cmd.amount,
            balance: self.balance,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close(&self, cmd: &CloseAccount) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_account_id(&cmd.account_id)?;
        self.ensure_open("close")?;
        if self.balance > 0 {
            return Err(DomainError::validation(format!(
                "cannot close account '{}' with a balance of {}",
                self.id, self.balance
            )));
        }

        Ok(vec![AccountEvent::Closed(AccountClosed {
            account_id: cmd.account_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
