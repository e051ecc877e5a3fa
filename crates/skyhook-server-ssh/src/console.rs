//! Interactive console adapter
//!
//! Thin boundary between the orchestrator and the tunnel owner's terminal.
//! When the owner accepted a session channel, status lines go there;
//! headless sessions get a no-op console. Identity and allocation errors
//! surface here and never on the public side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use russh::server::Msg;
use russh::Channel;
use tokio::sync::Mutex;
use tracing::trace;

/// Status-line sink for one session's owner.
pub struct Console {
    channel: Mutex<Option<Channel<Msg>>>,
    attached: AtomicBool,
    stopped: AtomicBool,
    dims: SyncMutex<(u32, u32)>,
}

impl Console {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            channel: Mutex::new(None),
            attached: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            dims: SyncMutex::new((80, 24)),
        })
    }

    /// Adopt the owner's session channel; the session is interactive from
    /// here on.
    pub async fn attach(&self, channel: Channel<Msg>) {
        *self.channel.lock().await = Some(channel);
        self.attached.store(true, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire) && !self.stopped.load(Ordering::Acquire)
    }

    /// Push one human-readable line to the owner's terminal. No-op for
    /// headless or stopped sessions; write failures are dropped (the
    /// connection is going away anyway).
    pub async fn send_line(&self, line: &str) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        if let Some(channel) = self.channel.lock().await.as_mut() {
            trace!(line, "console line");
            let _ = channel.data(format!("{line}\r\n").as_bytes()).await;
        }
    }

    /// Terminal dimensions from `pty-req` / `window-change`.
    pub fn set_wh(&self, cols: u32, rows: u32) {
        *self.dims.lock() = (cols, rows);
    }

    pub fn wh(&self) -> (u32, u32) {
        *self.dims.lock()
    }

    /// Close the owner's channel. Idempotent.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(channel) = self.channel.lock().await.take() {
            let _ = channel.eof().await;
            let _ = channel.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_headless_console_is_silent() {
        let console = Console::new();
        assert!(!console.is_attached());
        // must not block or panic without a channel
        console.send_line("nobody hears this").await;
        console.stop().await;
        console.stop().await;
    }

    #[test]
    fn test_window_dimensions() {
        let console = Console::new();
        assert_eq!(console.wh(), (80, 24));
        console.set_wh(132, 43);
        assert_eq!(console.wh(), (132, 43));
    }
}
