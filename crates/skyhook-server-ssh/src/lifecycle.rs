//! Session shutdown coordination
//!
//! Exactly-once teardown across every per-session collaborator: the
//! forwarder's accept loop and pumps (via cancellation), the interactive
//! channel, the SSH connection itself, the registry entry and, for TCP
//! tunnels, the claimed public port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use russh::Disconnect;
use skyhook_router::{PortRegistry, Session, SessionRegistry, TunnelKind, UnknownPort};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::console::Console;

#[derive(Debug, Error)]
pub enum CloseError {
    #[error("port release failed: {0}")]
    Port(#[from] UnknownPort),

    #[error("disconnect failed: {0}")]
    Ssh(#[from] russh::Error),
}

/// Owns the shutdown path for one session.
pub struct Lifecycle {
    session: Arc<Session>,
    registry: Arc<SessionRegistry>,
    ports: Arc<PortRegistry>,
    console: Arc<Console>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl Lifecycle {
    pub fn new(
        session: Arc<Session>,
        registry: Arc<SessionRegistry>,
        ports: Arc<PortRegistry>,
        console: Arc<Console>,
    ) -> Arc<Self> {
        Arc::new(Self {
            session,
            registry,
            ports,
            console,
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Token cancelled on close; the forwarder and every in-flight channel
    /// open and pump watch it.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Tear the session down. The first call runs every step and returns
    /// the failures worth reporting; later calls are no-ops returning an
    /// empty set. Closed-connection errors are swallowed.
    pub async fn close(&self) -> Vec<CloseError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }

        debug!(user = self.session.user(), "closing session");
        let mut issues = Vec::new();

        // stops the accept loop, pending channel opens, and the pumps
        self.cancel.cancel();

        self.console.stop().await;

        if let Some(key) = self.session.registry_key() {
            self.registry.remove(&key);
            if self.session.kind() == TunnelKind::Tcp {
                if let Err(err) = self.ports.set_status(self.session.forwarded_port(), false) {
                    issues.push(CloseError::Port(err));
                }
            }
        }

        if let Some(handle) = self.session.handle() {
            if let Err(err) = handle
                .disconnect(
                    Disconnect::ByApplication,
                    "tunnel closed".to_string(),
                    String::new(),
                )
                .await
            {
                match err {
                    russh::Error::SendError | russh::Error::Disconnect => {}
                    other => issues.push(CloseError::Ssh(other)),
                }
            }
        }

        for issue in &issues {
            warn!("session close issue: {}", issue);
        }
        issues
    }

    /// Fire-and-forget close, for callers inside SSH callbacks where
    /// awaiting the connection's own event loop would deadlock.
    pub fn close_in_background(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.close().await;
        });
    }
}
