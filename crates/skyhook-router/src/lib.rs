//! Tunnel identity and lookup for the skyhook relay
//!
//! Holds the shared indices the public front doors use to find the right
//! SSH session for every incoming request: the session registry (slug and
//! port namespaces), the public TCP port pool, and the slug allocation
//! policy (random generation, reserved names, blocked ports).

pub mod policy;
pub mod ports;
pub mod registry;
pub mod session;
pub mod slug;

pub use policy::{port_blocked, slug_reserved, slug_valid, slug_well_formed};
pub use ports::{PortRegistry, UnknownPort};
pub use registry::{RegistryError, SessionRegistry};
pub use session::{Session, SessionStatus, TunnelKind, UNAUTHORIZED_USER};
pub use slug::{random_string, SlugError, SlugHolder, GENERATED_SLUG_LEN};

/// Key under which a session is registered.
///
/// The slug namespace (HTTP) and the port namespace (TCP) are disjoint by
/// construction because every key carries its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    /// Slug for HTTP tunnels, decimal port for TCP tunnels.
    pub id: String,
    pub kind: KeyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Http,
    Tcp,
}

impl SessionKey {
    pub fn http(slug: impl Into<String>) -> Self {
        Self {
            id: slug.into(),
            kind: KeyKind::Http,
        }
    }

    pub fn tcp(port: u16) -> Self {
        Self {
            id: port.to_string(),
            kind: KeyKind::Tcp,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            KeyKind::Http => write!(f, "http:{}", self.id),
            KeyKind::Tcp => write!(f, "tcp:{}", self.id),
        }
    }
}
