//! Infrastructure layer: event store, command service, projections, config.

pub mod account_service;
pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod projections;


pub use account_service::AccountService;
pub use command_dispatcher::{CommandDispatcher, DispatchError, DispatchErrorKind, RetryPolicy};
pub use config::{ConfigError, LedgerConfig};
