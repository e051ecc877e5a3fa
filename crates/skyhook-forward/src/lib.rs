//! Forwarding data plane for the skyhook relay
//!
//! Bridges public-facing sockets to `forwarded-tcpip` SSH channels: channel
//! opening with deadlines, the half-close-aware byte pump, the pooled pump
//! buffers, and the public accept loop for TCP tunnels.

pub mod forwarder;
pub mod pool;
pub mod pump;

pub use forwarder::{open_backchannel, Forwarder, CHANNEL_OPEN_TIMEOUT};
pub use pool::{BufferPool, PooledBuffer, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use pump::{is_closed_error, splice, PumpStats};

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("timed out opening forwarded-tcpip channel")]
    OpenTimeout,

    #[error("channel open cancelled by session shutdown")]
    Cancelled,

    #[error("pump failed ({})", format_pump_failure(.to_public, .to_channel))]
    Pump {
        to_public: Option<std::io::Error>,
        to_channel: Option<std::io::Error>,
    },
}

fn format_pump_failure(
    to_public: &Option<std::io::Error>,
    to_channel: &Option<std::io::Error>,
) -> String {
    let mut parts = Vec::new();
    if let Some(err) = to_public {
        parts.push(format!("to public: {err}"));
    }
    if let Some(err) = to_channel {
        parts.push(format!("to channel: {err}"));
    }
    parts.join("; ")
}

const BAD_GATEWAY: &[u8] = b"HTTP/1.1 502 Bad Gateway\r\n\
Content-Type: text/plain\r\n\
Content-Length: 11\r\n\
\r\n\
Bad Gateway";

/// Canonical reply when no remote side is reachable for a public request.
pub async fn write_bad_gateway<W>(writer: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(BAD_GATEWAY).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn test_bad_gateway_shape() {
        let mut out = Vec::new();
        write_bad_gateway(&mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 502 Bad Gateway\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.ends_with("\r\n\r\nBad Gateway"));

        let body = text.split("\r\n\r\n").nth(1).unwrap();
        assert_eq!(body.len(), 11);
    }

    #[test]
    fn test_pump_error_joins_both_directions() {
        let err = ForwardError::Pump {
            to_public: Some(io::Error::new(io::ErrorKind::Other, "short write")),
            to_channel: Some(io::Error::new(io::ErrorKind::Other, "reset mid-read")),
        };
        let text = err.to_string();
        assert!(text.contains("to public: short write"));
        assert!(text.contains("to channel: reset mid-read"));
    }
}
