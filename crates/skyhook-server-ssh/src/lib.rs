//! SSH side of the skyhook relay
//!
//! Accepts tunnel owners' SSH connections, negotiates remote forwarding,
//! and keeps each session registered with the shared indices until the
//! connection goes away.

pub mod console;
pub mod hostkey;
pub mod lifecycle;
pub mod server;

pub use console::Console;
pub use hostkey::{load_or_generate, HostKeyError, HOST_KEY_BITS};
pub use lifecycle::{CloseError, Lifecycle};
pub use server::{
    plan_forward, transport_config, ForwardPlan, Mode, RefuseReason, ServerError, SessionHandler,
    SshServerConfig, TunnelServer, FORWARD_WAIT, INTERACTIVE_WAIT,
};
