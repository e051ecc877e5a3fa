//! Public-side forwarding into SSH sessions
//!
//! Opens `forwarded-tcpip` channels toward the tunnel owner and, for TCP
//! tunnels, runs the public accept loop that feeds the byte pump.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use russh::server::{Handle, Msg};
use russh::Channel;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pool::BufferPool;
use crate::pump::splice;
use crate::ForwardError;

/// Deadline for the tunnel owner to accept a `forwarded-tcpip` open.
pub const CHANNEL_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a `forwarded-tcpip` channel back to the tunnel owner.
///
/// The channel announces the bound address as `localhost:<bound_port>` and
/// carries the public peer as the originator, matching what an OpenSSH
/// client expects for a `-R` forward. The open is raced against
/// [`CHANNEL_OPEN_TIMEOUT`] and the session's cancellation token.
pub async fn open_backchannel(
    handle: &Handle,
    bound_port: u16,
    origin: SocketAddr,
    cancel: &CancellationToken,
) -> Result<Channel<Msg>, ForwardError> {
    let open = handle.channel_open_forwarded_tcpip(
        "localhost",
        u32::from(bound_port),
        origin.ip().to_string(),
        u32::from(origin.port()),
    );

    tokio::select! {
        _ = cancel.cancelled() => Err(ForwardError::Cancelled),
        result = tokio::time::timeout(CHANNEL_OPEN_TIMEOUT, open) => match result {
            Ok(Ok(channel)) => Ok(channel),
            Ok(Err(err)) => Err(ForwardError::Ssh(err)),
            Err(_) => {
                warn!(%origin, bound_port, "forwarded-tcpip open timed out");
                Err(ForwardError::OpenTimeout)
            }
        },
    }
}

/// Accept loop for one TCP tunnel's public listener.
///
/// Each accepted connection gets its own task: open a backchannel under the
/// 5 s deadline, then splice. A failed open drops that connection only; the
/// loop runs until the session is cancelled.
pub struct Forwarder {
    listener: TcpListener,
    handle: Handle,
    port: u16,
    pool: Arc<BufferPool>,
    cancel: CancellationToken,
}

impl Forwarder {
    pub fn new(
        listener: TcpListener,
        handle: Handle,
        port: u16,
        pool: Arc<BufferPool>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            listener,
            handle,
            port,
            pool,
            cancel,
        }
    }

    pub async fn run(self) {
        info!(port = self.port, "public TCP listener up");

        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, port = self.port, "public connection accepted");
                    let handle = self.handle.clone();
                    let pool = Arc::clone(&self.pool);
                    let cancel = self.cancel.clone();
                    let port = self.port;
                    tokio::spawn(async move {
                        bridge_public_connection(handle, port, stream, peer, pool, cancel).await;
                    });
                }
                Err(err) => {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    warn!(port = self.port, "accept failed: {}", err);
                }
            }
        }

        debug!(port = self.port, "public accept loop closed");
    }
}

async fn bridge_public_connection(
    handle: Handle,
    port: u16,
    stream: TcpStream,
    peer: SocketAddr,
    pool: Arc<BufferPool>,
    cancel: CancellationToken,
) {
    let channel = match open_backchannel(&handle, port, peer, &cancel).await {
        Ok(channel) => channel,
        Err(err) => {
            warn!(%peer, port, "dropping public connection: {}", err);
            return;
        }
    };

    if let Err(err) = splice(stream, channel.into_stream(), &pool, &cancel).await {
        debug!(%peer, port, "pump ended with error: {}", err);
    }
}
