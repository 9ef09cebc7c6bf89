//! Conversation pipeline for Colloquy.
//!
//! - [`session`]: per-session history behind per-session locks
//! - [`rewriter`]: follow-up question to standalone question
//! - [`pipeline`]: rewrite, retrieve and stream an answer
//! - [`transport`]: answer fragments as response body bytes

pub mod options;
pub mod pipeline;
pub mod rewriter;
pub mod session;
pub mod transport;

#[cfg(test)]
mod tests;

pub use options::ModelOptions;
pub use pipeline::{AnswerPipeline, AnswerStream, PipelineRequest, PipelineState};
pub use rewriter::QueryRewriter;
pub use session::{Session, SessionGuard, SessionStore, Turn, TurnRole};
pub use transport::into_byte_stream;
