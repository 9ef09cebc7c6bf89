//! Generation gateway providers.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use colloquy_core::AppError;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;

/// Map a failed HTTP status onto the gateway error taxonomy.
pub fn status_error(provider: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("{} API error ({}): {}", provider, status, body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        AppError::RateLimited(message)
    } else if status.is_server_error() {
        AppError::GatewayUnavailable(message)
    } else {
        AppError::Generation(message)
    }
}

/// Map a transport-level failure (connect, TLS, send) onto the taxonomy.
pub fn send_error(provider: &str, err: reqwest::Error) -> AppError {
    AppError::GatewayUnavailable(format!("Failed to send request to {}: {}", provider, err))
}

/// Split a byte stream into trimmed, non-empty lines.
///
/// Network chunks do not align with line boundaries, so partial lines are
/// buffered until their newline arrives.
pub(crate) fn lines<S, B, E>(
    provider: &'static str,
    bytes: S,
) -> impl Stream<Item = Result<String, AppError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk
                .map_err(|e| AppError::Generation(format!("{} stream error: {}", provider, e)))?;
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    yield line;
                }
            }
        }

        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
        if !rest.is_empty() {
            yield rest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_lines_reassembles_split_chunks() {
        let chunks: Vec<Result<&'static [u8], String>> = vec![
            Ok(b"{\"a\":1}\n{\"b\"".as_slice()),
            Ok(b":2}\n\n".as_slice()),
            Ok(b"{\"c\":3}".as_slice()),
        ];

        let lines: Vec<String> = lines("test", stream::iter(chunks))
            .map(|line| line.unwrap())
            .collect()
            .await;

        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}", "{\"c\":3}"]);
    }

    #[tokio::test]
    async fn test_lines_propagates_transport_errors() {
        let chunks: Vec<Result<&'static [u8], String>> =
            vec![Ok(b"one\n".as_slice()), Err("connection reset".to_string())];

        let results: Vec<_> = lines("test", stream::iter(chunks)).collect().await;
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(AppError::Generation(_))));
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error("x", StatusCode::TOO_MANY_REQUESTS, ""),
            AppError::RateLimited(_)
        ));
        assert!(matches!(
            status_error("x", StatusCode::BAD_GATEWAY, ""),
            AppError::GatewayUnavailable(_)
        ));
        assert!(matches!(
            status_error("x", StatusCode::BAD_REQUEST, ""),
            AppError::Generation(_)
        ));
    }
}
