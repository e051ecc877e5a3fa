//! Per-connection session state shared with the public front doors

use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use russh::server::Handle;

use crate::slug::SlugHolder;
use crate::{KeyKind, SessionKey};

/// Sentinel user id for connections that authenticated anonymously.
pub const UNAUTHORIZED_USER: &str = "UNAUTHORIZED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionStatus {
    Initializing = 0,
    Running = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TunnelKind {
    Unknown = 0,
    Http = 1,
    Tcp = 2,
}

/// State bundle for one SSH connection's tunnel.
///
/// The orchestrator owns the `Arc`; the registry and the front doors hold
/// non-owning references. Kind, port and status are written once while the
/// tunnel comes up and read lock-free from then on.
pub struct Session {
    user: String,
    started_at: DateTime<Utc>,
    status: AtomicU8,
    kind: AtomicU8,
    forwarded_port: AtomicU16,
    slug: SlugHolder,
    handle: Option<Handle>,
}

impl Session {
    /// Session backed by a live SSH connection.
    pub fn new(user: impl Into<String>, handle: Handle) -> Arc<Self> {
        Arc::new(Self {
            user: user.into(),
            started_at: Utc::now(),
            status: AtomicU8::new(SessionStatus::Initializing as u8),
            kind: AtomicU8::new(TunnelKind::Unknown as u8),
            forwarded_port: AtomicU16::new(0),
            slug: SlugHolder::new(),
            handle: Some(handle),
        })
    }

    /// Session with no connection behind it. Front doors treat it as an
    /// unreachable origin; registry tests build sessions this way.
    pub fn detached(user: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            user: user.into(),
            started_at: Utc::now(),
            status: AtomicU8::new(SessionStatus::Initializing as u8),
            kind: AtomicU8::new(TunnelKind::Unknown as u8),
            forwarded_port: AtomicU16::new(0),
            slug: SlugHolder::new(),
            handle: None,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Handle to the owning SSH connection, used to open `forwarded-tcpip`
    /// channels toward the client.
    pub fn handle(&self) -> Option<Handle> {
        self.handle.clone()
    }

    pub fn status(&self) -> SessionStatus {
        match self.status.load(Ordering::Acquire) {
            0 => SessionStatus::Initializing,
            _ => SessionStatus::Running,
        }
    }

    pub fn set_status(&self, status: SessionStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    pub fn kind(&self) -> TunnelKind {
        match self.kind.load(Ordering::Acquire) {
            1 => TunnelKind::Http,
            2 => TunnelKind::Tcp,
            _ => TunnelKind::Unknown,
        }
    }

    pub fn set_kind(&self, kind: TunnelKind) {
        self.kind.store(kind as u8, Ordering::Release);
    }

    /// Public port this tunnel is reachable on; 0 before binding.
    pub fn forwarded_port(&self) -> u16 {
        self.forwarded_port.load(Ordering::Acquire)
    }

    pub fn set_forwarded_port(&self, port: u16) {
        self.forwarded_port.store(port, Ordering::Release);
    }

    pub fn slug(&self) -> &SlugHolder {
        &self.slug
    }

    /// Key this session is currently registered under, derived from its
    /// kind and identity. `None` until a kind is assigned.
    pub fn registry_key(&self) -> Option<SessionKey> {
        match self.kind() {
            TunnelKind::Http => Some(SessionKey {
                id: self.slug.get(),
                kind: KeyKind::Http,
            }),
            TunnelKind::Tcp => Some(SessionKey::tcp(self.forwarded_port())),
            TunnelKind::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::detached("alice");
        assert_eq!(session.user(), "alice");
        assert_eq!(session.status(), SessionStatus::Initializing);
        assert_eq!(session.kind(), TunnelKind::Unknown);
        assert_eq!(session.forwarded_port(), 0);
        assert_eq!(session.slug().get(), "");
        assert!(session.registry_key().is_none());
    }

    #[test]
    fn test_http_registry_key_tracks_slug() {
        let session = Session::detached("alice");
        session.slug().set("abc123xyz");
        session.set_kind(TunnelKind::Http);
        session.set_forwarded_port(80);

        let key = session.registry_key().unwrap();
        assert_eq!(key, SessionKey::http("abc123xyz"));
    }

    #[test]
    fn test_tcp_registry_key_is_port() {
        let session = Session::detached("bob");
        session.set_kind(TunnelKind::Tcp);
        session.set_forwarded_port(10042);

        let key = session.registry_key().unwrap();
        assert_eq!(key, SessionKey::tcp(10042));
        assert_eq!(key.id, "10042");
    }
}
