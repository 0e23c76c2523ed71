//! Checking account domain module (event-sourced).
//!
//! This crate contains the business rules for accounts, implemented as
//! deterministic domain logic (no IO, no storage). `Account::handle` and
//! `Account::apply` never read the clock; the timestamp travels on the command.
//! The `AccountCommand` constructors and tagged parsing stamp `occurred_at`
//! with the current time when the caller does not supply one.

pub mod account;
pub mod command;
pub mod event;

pub use account::{Account, AccountStatus};
pub use command::{
    AccountCommand, AccountCommandKind, CloseAccount, DepositMoney, OpenAccount, WithdrawMoney,
};
pub use event::{
    AccountClosed, AccountEvent, AccountEventKind, AccountOpened, MoneyDeposited, MoneyWithdrawn,
    WithdrawalRejected,
};
