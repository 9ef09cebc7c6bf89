//! Byte framing for answer streams.
//!
//! Fragments are written as raw UTF-8 with no envelope, in the order the
//! model produced them.

use crate::pipeline::AnswerStream;
use bytes::Bytes;
use colloquy_core::AppError;
use futures::{Stream, StreamExt};

/// Body chunks for a streamed HTTP response.
///
/// An `Err` item aborts the body; the fragments already written stay with
/// the client.
pub fn into_byte_stream(answer: AnswerStream) -> impl Stream<Item = Result<Bytes, AppError>> + Send {
    answer.map(|fragment| fragment.map(Bytes::from))
}
