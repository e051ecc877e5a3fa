//! Bidirectional byte pump between a public socket and an SSH channel
//!
//! Each direction copies independently; when one side reaches EOF the
//! opposite writer is half-closed so the peer sees a clean teardown, and
//! the other direction keeps running to its own EOF.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::pool::BufferPool;
use crate::ForwardError;

/// Bytes moved by each pump direction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    /// Channel to public socket.
    pub to_public: u64,
    /// Public socket to channel.
    pub to_channel: u64,
}

/// Copy bytes both ways until both directions have finished.
///
/// EOF and closed-connection errors end a direction quietly; anything else
/// is joined into a single composite error after both directions stop.
/// Cancellation makes each direction return within one buffer read.
pub async fn splice<P, C>(
    public: P,
    channel: C,
    pool: &Arc<BufferPool>,
    cancel: &CancellationToken,
) -> Result<PumpStats, ForwardError>
where
    P: AsyncRead + AsyncWrite,
    C: AsyncRead + AsyncWrite,
{
    let (mut public_rx, mut public_tx) = tokio::io::split(public);
    let (mut channel_rx, mut channel_tx) = tokio::io::split(channel);

    let (to_public, to_channel) = tokio::join!(
        copy_direction(&mut channel_rx, &mut public_tx, pool, cancel),
        copy_direction(&mut public_rx, &mut channel_tx, pool, cancel),
    );

    match (to_public, to_channel) {
        (Ok(to_public), Ok(to_channel)) => {
            trace!(to_public, to_channel, "pump finished");
            Ok(PumpStats {
                to_public,
                to_channel,
            })
        }
        (to_public, to_channel) => Err(ForwardError::Pump {
            to_public: to_public.err(),
            to_channel: to_channel.err(),
        }),
    }
}

/// One pump direction. Half-closes the writer when the reader ends, then
/// reports how many bytes moved.
async fn copy_direction<R, W>(
    reader: &mut R,
    writer: &mut W,
    pool: &Arc<BufferPool>,
    cancel: &CancellationToken,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = pool.take();
    let mut copied = 0u64;

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = writer.shutdown().await;
                return Ok(copied);
            }
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                // reader is done; propagate the half-close
                let _ = writer.shutdown().await;
                return Ok(copied);
            }
            Ok(n) => {
                if let Err(err) = writer.write_all(&buf[..n]).await {
                    return finish(copied, err);
                }
                copied += n as u64;
            }
            Err(err) => {
                let _ = writer.shutdown().await;
                return finish(copied, err);
            }
        }
    }
}

fn finish(copied: u64, err: io::Error) -> io::Result<u64> {
    if is_closed_error(&err) {
        Ok(copied)
    } else {
        Err(err)
    }
}

/// Errors that just mean "the other side went away".
pub fn is_closed_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    ) || err.to_string().contains("closed")
}
