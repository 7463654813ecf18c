mod dead_letter;
mod executor;
mod expiry;
mod sink;

pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use executor::{AuditRecord, ExecutionResult, SanctionExecutor};
pub use expiry::{spawn_expiry_sweeper, sweep_once};
pub use sink::{ActionKind, ActionSink, LoggingSink, PlatformAction};
