//! Command service for checking accounts.

use serde_json::Value as JsonValue;

use bankledger_accounts::{Account, AccountCommand, AccountEvent};
use bankledger_core::AggregateId;
use bankledger_events::EventEnvelope;

use crate::command_dispatcher::{CommandDispatcher, DispatchError, RetryPolicy};
use crate::config::LedgerConfig;
use crate::event_store::EventStore;

/// Accepts account commands and runs them through the dispatcher.
///
/// A `WithdrawalRejected` envelope in the result means the withdrawal was
/// refused for insufficient funds; the refusal is recorded, so the call
/// itself succeeds.
#[derive(Debug)]
pub struct AccountService<S> {
    dispatcher: CommandDispatcher<S>,
}

impl<S> AccountService<S>
where
    S: EventStore,
{
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, retry),
        }
    }

    pub fn from_config(store: S, config: &LedgerConfig) -> Self {
        Self::new(store, config.retry.policy())
    }

    pub fn store(&self) -> &S {
        self.dispatcher.store()
    }

    pub fn handle_command(&self, command: AccountCommand) -> Result<Vec<EventEnvelope<AccountEvent>>, DispatchError> {
        self.dispatcher.dispatch(&command, Account::empty)
    }

    /// Parse a tagged JSON command (`{"kind": "Deposit", ...}`) and handle it.
    pub fn handle_tagged(&self, command: JsonValue) -> Result<Vec<EventEnvelope<AccountEvent>>, DispatchError> {
        let command = AccountCommand::from_tagged(command)?;
        self.handle_command(command)
    }

    /// Current state of one account, rebuilt from its stream.
    pub fn account(&self, account_id: &AggregateId) -> Result<Account, DispatchError> {
        self.dispatcher.load_aggregate(account_id, Account::empty)
    }
}
