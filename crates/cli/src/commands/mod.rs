//! Command handlers for the Colloquy CLI.

pub mod ask;
pub mod serve;

pub use ask::AskCommand;
pub use serve::ServeCommand;
