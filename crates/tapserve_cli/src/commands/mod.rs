//! CLI command implementations.

pub mod compact;
pub mod edit;
pub mod inspect;
pub mod sync;

/// Result of a command.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;
