//! Public TCP port pool
//!
//! Tracks which ports of the configured public range are handed out to TCP
//! tunnels. Allocation never blocks; callers that find the pool exhausted
//! refuse the forwarding request.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("port {0} is outside the public port range")]
pub struct UnknownPort(pub u16);

/// Pool of publicly bindable TCP ports with claim/release semantics.
#[derive(Debug, Default)]
pub struct PortRegistry {
    // port -> assigned; BTreeMap keeps the free-port scan ascending
    ports: Mutex<BTreeMap<u16, bool>>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every port in the inclusive range as known and unassigned.
    ///
    /// Ports already present keep their assignment state.
    pub fn add_range(&self, start: u16, end: u16) {
        let mut ports = self.ports.lock();
        for port in start..=end {
            ports.entry(port).or_insert(false);
        }
    }

    /// Lowest currently-unassigned port, or `None` when the range is
    /// exhausted.
    pub fn unassigned(&self) -> Option<u16> {
        let ports = self.ports.lock();
        ports
            .iter()
            .find(|(_, assigned)| !**assigned)
            .map(|(port, _)| *port)
    }

    /// Atomically mark a specific port assigned if it is known and free.
    pub fn claim(&self, port: u16) -> bool {
        let mut ports = self.ports.lock();
        match ports.get_mut(&port) {
            Some(assigned) if !*assigned => {
                *assigned = true;
                true
            }
            _ => false,
        }
    }

    /// Explicitly set a port's assignment state. Idempotent; fails only for
    /// ports outside every added range.
    pub fn set_status(&self, port: u16, assigned: bool) -> Result<(), UnknownPort> {
        let mut ports = self.ports.lock();
        match ports.get_mut(&port) {
            Some(slot) => {
                *slot = assigned;
                Ok(())
            }
            None => Err(UnknownPort(port)),
        }
    }
}
