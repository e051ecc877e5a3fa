//! Public HTTP front door
//!
//! Accepts plain and TLS connections, extracts the tunnel slug from the
//! Host header, and splices matched connections onto `forwarded-tcpip`
//! channels through the session registry.

use std::net::SocketAddr;
use std::sync::Arc;

use skyhook_forward::{is_closed_error, open_backchannel, write_bad_gateway, BufferPool};
use skyhook_router::{SessionKey, SessionRegistry};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::rewrite::{
    append_forwarded_for, head_end, host_header, is_request_head, slug_of_host, ResponseRewriter,
};
use crate::IngressError;

/// Ceiling for a request head read off the public socket.
pub const DEFAULT_MAX_HEAD_BYTES: usize = 32 * 1024;

const BAD_REQUEST: &[u8] = b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n";
const HEAD_TOO_LARGE: &[u8] =
    b"HTTP/1.1 431 Request Header Fields Too Large\r\nContent-Length: 0\r\n\r\n";
const PING_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
Access-Control-Allow-Origin: *\r\n\
Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
Access-Control-Allow-Headers: *\r\n\
Content-Type: text/plain\r\n\
Content-Length: 4\r\n\
\r\n\
pong";

#[derive(Debug, Clone)]
pub struct IngressConfig {
    /// Base domain; tunnels live at `<slug>.<domain>`.
    pub domain: String,
    pub http_bind: SocketAddr,
    pub https_bind: Option<SocketAddr>,
    /// Whether the plain listener answers everything with a redirect to
    /// the HTTPS origin.
    pub tls_redirect: bool,
    /// Landing page for slugs with no live tunnel.
    pub not_found_url: String,
    pub max_head_bytes: usize,
    /// Value of the gateway fingerprint header stamped on responses.
    pub fingerprint: String,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
            http_bind: SocketAddr::from(([0, 0, 0, 0], 80)),
            https_bind: None,
            tls_redirect: false,
            not_found_url: "https://localhost".to_string(),
            max_head_bytes: DEFAULT_MAX_HEAD_BYTES,
            fingerprint: concat!("skyhook/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// The shared public listener serving every HTTP tunnel.
pub struct HttpIngress {
    config: IngressConfig,
    registry: Arc<SessionRegistry>,
    pool: Arc<BufferPool>,
    cancel: CancellationToken,
}

enum HeadRead {
    /// Complete head (including CRLFCRLF) plus any body bytes that came
    /// with it.
    Complete { head: Vec<u8>, rest: Vec<u8> },
    TooLarge,
    Closed,
}

impl HttpIngress {
    pub fn new(
        config: IngressConfig,
        registry: Arc<SessionRegistry>,
        pool: Arc<BufferPool>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            pool,
            cancel,
        })
    }

    /// Serve the plain-HTTP listener until cancelled.
    pub async fn run_http(self: Arc<Self>) -> Result<(), IngressError> {
        let listener = bind(self.config.http_bind).await?;
        info!(addr = %self.config.http_bind, "HTTP ingress listening");
        self.accept_loop(listener, None).await
    }

    /// Serve the TLS listener until cancelled.
    pub async fn run_https(self: Arc<Self>, acceptor: TlsAcceptor) -> Result<(), IngressError> {
        let addr = self
            .config
            .https_bind
            .ok_or_else(|| IngressError::Tls("no HTTPS bind address configured".to_string()))?;
        let listener = bind(addr).await?;
        info!(%addr, "HTTPS ingress listening");
        self.accept_loop(listener, Some(acceptor)).await
    }

    async fn accept_loop(
        self: Arc<Self>,
        listener: TcpListener,
        tls: Option<TlsAcceptor>,
    ) -> Result<(), IngressError> {
        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let this = Arc::clone(&self);
                    let tls = tls.clone();
                    tokio::spawn(async move {
                        let result = match tls {
                            Some(acceptor) => match acceptor.accept(stream).await {
                                Ok(tls_stream) => {
                                    this.serve_connection(tls_stream, peer, true).await
                                }
                                Err(err) => {
                                    warn!(%peer, "TLS handshake failed: {}", err);
                                    return;
                                }
                            },
                            None => this.serve_connection(stream, peer, false).await,
                        };
                        if let Err(err) = result {
                            debug!(%peer, "connection ended with error: {}", err);
                        }
                    });
                }
                Err(err) => {
                    error!("failed to accept public connection: {}", err);
                }
            }
        }
    }

    async fn serve_connection<S>(
        &self,
        mut stream: S,
        peer: SocketAddr,
        secure: bool,
    ) -> Result<(), IngressError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (head, rest) = match read_head(&mut stream, self.config.max_head_bytes).await? {
            HeadRead::Complete { head, rest } => (head, rest),
            HeadRead::TooLarge => {
                stream.write_all(HEAD_TOO_LARGE).await?;
                return Ok(());
            }
            HeadRead::Closed => return Ok(()),
        };

        let head_text = String::from_utf8_lossy(&head).into_owned();
        if !is_request_head(&head_text) {
            stream.write_all(BAD_REQUEST).await?;
            return Ok(());
        }

        let host = match host_header(&head_text) {
            Some(host) => host,
            None => {
                stream.write_all(BAD_REQUEST).await?;
                return Ok(());
            }
        };
        let slug = slug_of_host(&host);

        if !secure && self.config.tls_redirect {
            // canonical origin only; the client-supplied Host is never
            // echoed into the Location
            let location = format!("https://{}.{}/", slug, self.config.domain);
            write_redirect(&mut stream, &location).await?;
            return Ok(());
        }

        if slug == "ping" {
            stream.write_all(PING_RESPONSE).await?;
            return Ok(());
        }

        let session = match self.registry.get(&SessionKey::http(slug)) {
            Some(session) => session,
            None => {
                debug!(slug, %peer, "no tunnel for slug");
                write_redirect(&mut stream, &self.config.not_found_url).await?;
                return Ok(());
            }
        };

        let handle = match session.handle() {
            Some(handle) => handle,
            None => {
                write_bad_gateway(&mut stream).await?;
                return Ok(());
            }
        };

        let channel =
            match open_backchannel(&handle, session.forwarded_port(), peer, &self.cancel).await {
                Ok(channel) => channel,
                Err(err) => {
                    warn!(slug, %peer, "failed to reach tunnel: {}", err);
                    write_bad_gateway(&mut stream).await?;
                    return Ok(());
                }
            };

        debug!(slug, %peer, "splicing public connection into tunnel");
        let rewritten = append_forwarded_for(&head_text, &peer.ip().to_string());
        let rewriter =
            ResponseRewriter::new(self.config.fingerprint.clone(), self.config.max_head_bytes);

        splice_with_rewrite(
            stream,
            channel.into_stream(),
            rewritten.into_bytes(),
            rest,
            rewriter,
            &self.pool,
            &self.cancel,
        )
        .await
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, IngressError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| IngressError::Bind {
            address: addr.to_string(),
            reason: e.to_string(),
        })
}

async fn write_redirect<W>(writer: &mut W, location: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response = format!(
        "HTTP/1.1 301 Moved Permanently\r\nLocation: {location}\r\nContent-Length: 0\r\n\r\n"
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await
}

/// Read until CRLFCRLF or the head ceiling.
async fn read_head<S>(stream: &mut S, max: usize) -> Result<HeadRead, IngressError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(end) = head_end(&buf) {
            if end > max {
                return Ok(HeadRead::TooLarge);
            }
            let rest = buf.split_off(end);
            return Ok(HeadRead::Complete { head: buf, rest });
        }
        if buf.len() > max {
            return Ok(HeadRead::TooLarge);
        }

        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(HeadRead::Closed);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// The HTTP-aware variant of the byte pump: forwards the rewritten request
/// head first, then copies both directions with the response middleware on
/// the channel-to-public leg. Half-close on one side leaves the other
/// direction running.
async fn splice_with_rewrite<S, C>(
    public: S,
    channel: C,
    head: Vec<u8>,
    body_prefix: Vec<u8>,
    mut rewriter: ResponseRewriter,
    pool: &Arc<BufferPool>,
    cancel: &CancellationToken,
) -> Result<(), IngressError>
where
    S: AsyncRead + AsyncWrite,
    C: AsyncRead + AsyncWrite,
{
    let (mut public_rx, mut public_tx) = tokio::io::split(public);
    let (mut channel_rx, mut channel_tx) = tokio::io::split(channel);

    channel_tx.write_all(&head).await?;
    if !body_prefix.is_empty() {
        channel_tx.write_all(&body_prefix).await?;
    }

    let mut inbound = pool.take();
    let mut outbound = pool.take();
    let mut public_open = true;
    let mut channel_open = true;

    while public_open || channel_open {
        tokio::select! {
            _ = cancel.cancelled() => break,

            read = public_rx.read(&mut inbound), if public_open => match read {
                Ok(0) => {
                    public_open = false;
                    let _ = channel_tx.shutdown().await;
                }
                Ok(n) => {
                    if let Err(err) = channel_tx.write_all(&inbound[..n]).await {
                        public_open = false;
                        if !is_closed_error(&err) {
                            return Err(err.into());
                        }
                    }
                }
                Err(err) => {
                    public_open = false;
                    let _ = channel_tx.shutdown().await;
                    if !is_closed_error(&err) {
                        return Err(err.into());
                    }
                }
            },

            read = channel_rx.read(&mut outbound), if channel_open => match read {
                Ok(0) => {
                    channel_open = false;
                    let tail = rewriter.finish();
                    if !tail.is_empty() {
                        let _ = public_tx.write_all(&tail).await;
                    }
                    let _ = public_tx.shutdown().await;
                }
                Ok(n) => {
                    let out = rewriter.transform(&outbound[..n]);
                    if !out.is_empty() {
                        if let Err(err) = public_tx.write_all(&out).await {
                            channel_open = false;
                            if !is_closed_error(&err) {
                                return Err(err.into());
                            }
                        }
                    }
                }
                Err(err) => {
                    channel_open = false;
                    let _ = public_tx.shutdown().await;
                    if !is_closed_error(&err) {
                        return Err(err.into());
                    }
                }
            },
        }
    }

    Ok(())
}
