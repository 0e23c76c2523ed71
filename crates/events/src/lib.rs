//! Event-sourcing mechanics shared by domain modules and infrastructure:
//! event/command contracts, the committed envelope, and projection folding.

pub mod codec;
pub mod command;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod projection;
pub mod runner;

pub use codec::EventCodec;
pub use command::Command;
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use projection::Projection;
pub use runner::{ProjectionCursor, ProjectionError, ProjectionRunner};
