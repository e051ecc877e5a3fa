//! Public HTTP/HTTPS ingress for the skyhook relay
//!
//! The shared front door on ports 80/443: parses request heads, routes by
//! the leftmost Host label, applies the header middleware, and splices
//! matched connections onto SSH `forwarded-tcpip` channels.

pub mod rewrite;
pub mod server;
pub mod tls;

pub use rewrite::{
    append_forwarded_for, is_request_head, is_status_line, ResponseRewriter, FINGERPRINT_HEADER,
    HTTP_METHODS,
};
pub use server::{HttpIngress, IngressConfig, DEFAULT_MAX_HEAD_BYTES};
pub use tls::build_acceptor;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("failed to bind to {address}: {reason}")]
    Bind { address: String, reason: String },

    #[error("forward error: {0}")]
    Forward(#[from] skyhook_forward::ForwardError),
}
