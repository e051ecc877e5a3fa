//! SSH server and per-connection session orchestration
//!
//! One handler per SSH connection drives the tunnel state machine: classify
//! the session as interactive or headless, service the `tcpip-forward`
//! request (slug allocation for HTTP ports, port claim + listener for the
//! rest), then keep the tunnel registered until the connection dies.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use russh::keys::{HashAlg, PrivateKey, PublicKey};
use russh::server::{Auth, Config, Handler, Msg, Server, Session as SshSession};
use russh::{Channel, ChannelId, Pty, SshId};
use skyhook_forward::{BufferPool, Forwarder};
use skyhook_router::{
    port_blocked, random_string, KeyKind, PortRegistry, Session, SessionKey, SessionRegistry,
    SessionStatus, SlugError, TunnelKind, GENERATED_SLUG_LEN, UNAUTHORIZED_USER,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::console::Console;
use crate::lifecycle::Lifecycle;

/// How long a fresh connection may take to open its session channel before
/// the session is classified headless. Tunable; matches the forward wait.
pub const INTERACTIVE_WAIT: Duration = Duration::from_millis(500);

/// How long after classification the `tcpip-forward` request may take.
pub const FORWARD_WAIT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Standalone,
    Cluster,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standalone" => Ok(Mode::Standalone),
            "cluster" => Ok(Mode::Cluster),
            other => Err(format!("unknown mode '{other}' (standalone|cluster)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SshServerConfig {
    pub bind: SocketAddr,
    /// Base domain announced to tunnel owners.
    pub domain: String,
    pub mode: Mode,
    /// Whether announced HTTP endpoints use the https scheme.
    pub tls_enabled: bool,
    pub interactive_wait: Duration,
    pub forward_wait: Duration,
}

impl Default for SshServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 2222)),
            domain: "localhost".to_string(),
            mode: Mode::Standalone,
            tls_enabled: false,
            interactive_wait: INTERACTIVE_WAIT,
            forward_wait: FORWARD_WAIT,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-level configuration for the listener.
pub fn transport_config(host_key: PrivateKey) -> Arc<Config> {
    let mut config = Config::default();
    config.server_id = SshId::Standard(format!("SSH-2.0-skyhook_{}", env!("CARGO_PKG_VERSION")));
    config.keys = vec![host_key];
    config.inactivity_timeout = Some(Duration::from_secs(3600));
    config.auth_rejection_time = Duration::from_secs(3);
    config.auth_rejection_time_initial = Some(Duration::ZERO);
    Arc::new(config)
}

/// The SSH front of the relay; spawns one [`SessionHandler`] per
/// connection.
pub struct TunnelServer {
    config: SshServerConfig,
    registry: Arc<SessionRegistry>,
    ports: Arc<PortRegistry>,
    pool: Arc<BufferPool>,
}

impl TunnelServer {
    pub fn new(
        config: SshServerConfig,
        registry: Arc<SessionRegistry>,
        ports: Arc<PortRegistry>,
        pool: Arc<BufferPool>,
    ) -> Self {
        Self {
            config,
            registry,
            ports,
            pool,
        }
    }

    /// Serve SSH connections until the listener fails.
    pub async fn run(mut self, transport: Arc<Config>) -> Result<(), ServerError> {
        let bind = self.config.bind;
        info!(%bind, "SSH server listening");
        self.run_on_address(transport, bind).await?;
        Ok(())
    }
}

impl Server for TunnelServer {
    type Handler = SessionHandler;

    fn new_client(&mut self, peer: Option<SocketAddr>) -> SessionHandler {
        debug!(?peer, "SSH connection accepted");
        SessionHandler {
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            ports: Arc::clone(&self.ports),
            pool: Arc::clone(&self.pool),
            peer,
            user: UNAUTHORIZED_USER.to_string(),
            console: Console::new(),
            session: None,
            lifecycle: None,
            forward_requested: false,
            interactive_signal: None,
            forward_signal: None,
            command_buf: String::new(),
        }
    }

    fn handle_session_error(&mut self, error: ServerError) {
        error!("session error: {}", error);
    }
}

/// What to do with a `tcpip-forward` request for a given port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardPlan {
    /// Route through the shared HTTP ingress under a fresh slug.
    Http(u16),
    /// Bind a dedicated public listener; 0 means pick from the pool.
    Tcp(u16),
    Refuse(RefuseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefuseReason {
    PortTooLarge(u32),
    PortBlocked(u16),
}

impl fmt::Display for RefuseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefuseReason::PortTooLarge(port) => write!(f, "port {port} exceeds 65535"),
            RefuseReason::PortBlocked(port) => write!(f, "port {port} is not allowed"),
        }
    }
}

/// Classify a requested forwarding port.
pub fn plan_forward(port: u32) -> ForwardPlan {
    if port > u32::from(u16::MAX) {
        return ForwardPlan::Refuse(RefuseReason::PortTooLarge(port));
    }
    let port = port as u16;
    if port == 80 || port == 443 {
        return ForwardPlan::Http(port);
    }
    if port != 0 && port_blocked(port) {
        return ForwardPlan::Refuse(RefuseReason::PortBlocked(port));
    }
    ForwardPlan::Tcp(port)
}

#[derive(Debug, Error)]
pub enum EstablishError {
    #[error("slug generation failed: {0}")]
    Slug(#[from] SlugError),

    #[error("slug '{0}' is already registered")]
    SlugCollision(String),

    #[error("no available port")]
    NoAvailablePort,

    #[error("port {0} is unavailable")]
    PortUnavailable(u16),

    #[error("bind failed on port {0}: {1}")]
    Bind(u16, std::io::Error),

    #[error("port {0} is already registered")]
    PortTaken(u16),

    #[error("connection handle unavailable")]
    NoConnection,
}

/// Per-connection state machine.
pub struct SessionHandler {
    config: SshServerConfig,
    registry: Arc<SessionRegistry>,
    ports: Arc<PortRegistry>,
    pool: Arc<BufferPool>,
    peer: Option<SocketAddr>,
    user: String,
    console: Arc<Console>,
    session: Option<Arc<Session>>,
    lifecycle: Option<Arc<Lifecycle>>,
    forward_requested: bool,
    interactive_signal: Option<oneshot::Sender<()>>,
    forward_signal: Option<oneshot::Sender<()>>,
    command_buf: String,
}

impl SessionHandler {
    /// One slug attempt, register, mark running.
    async fn establish_http(
        &self,
        entity: &Arc<Session>,
        port: u16,
    ) -> Result<String, EstablishError> {
        let slug = random_string(GENERATED_SLUG_LEN)?;
        entity.slug().set(slug.clone());

        // single attempt; a collision fails the request
        if !self.registry.register(SessionKey::http(slug.clone()), entity) {
            return Err(EstablishError::SlugCollision(slug));
        }

        entity.set_kind(TunnelKind::Http);
        entity.set_forwarded_port(port);
        entity.set_status(SessionStatus::Running);

        let scheme = if self.config.tls_enabled { "https" } else { "http" };
        self.notify(format!(
            "tunnel ready: {scheme}://{slug}.{}",
            self.config.domain
        ));
        Ok(slug)
    }

    /// Claim a port (or pick one), bind, register, start the accept loop.
    /// Every failure step unwinds whatever came before it.
    async fn establish_tcp(
        &self,
        entity: &Arc<Session>,
        lifecycle: &Arc<Lifecycle>,
        requested: u16,
    ) -> Result<u16, EstablishError> {
        let port = if requested == 0 {
            let port = self
                .ports
                .unassigned()
                .ok_or(EstablishError::NoAvailablePort)?;
            if !self.ports.claim(port) {
                return Err(EstablishError::NoAvailablePort);
            }
            port
        } else {
            if !self.ports.claim(requested) {
                return Err(EstablishError::PortUnavailable(requested));
            }
            requested
        };

        let listener = match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => listener,
            Err(err) => {
                let _ = self.ports.set_status(port, false);
                return Err(EstablishError::Bind(port, err));
            }
        };

        if !self.registry.register(SessionKey::tcp(port), entity) {
            drop(listener);
            let _ = self.ports.set_status(port, false);
            return Err(EstablishError::PortTaken(port));
        }

        let handle = match entity.handle() {
            Some(handle) => handle,
            None => {
                self.registry.remove(&SessionKey::tcp(port));
                let _ = self.ports.set_status(port, false);
                return Err(EstablishError::NoConnection);
            }
        };

        entity.set_kind(TunnelKind::Tcp);
        entity.set_forwarded_port(port);
        entity.slug().set(port.to_string());
        entity.set_status(SessionStatus::Running);

        let forwarder = Forwarder::new(
            listener,
            handle,
            port,
            Arc::clone(&self.pool),
            lifecycle.cancel_token(),
        );
        tokio::spawn(forwarder.run());

        self.notify(format!("tunnel ready: tcp://{}:{port}", self.config.domain));
        Ok(port)
    }

    /// Refuse the forward request and tear the session down.
    fn deny(&self, lifecycle: &Arc<Lifecycle>, err: EstablishError) -> Result<bool, ServerError> {
        warn!(peer = ?self.peer, "tunnel setup failed: {}", err);
        self.notify(format!("tunnel refused: {err}"));
        lifecycle.close_in_background();
        Ok(false)
    }

    /// Push a status line to the owner without blocking the SSH event
    /// loop.
    fn notify(&self, line: String) {
        if !self.console.is_attached() {
            return;
        }
        let console = Arc::clone(&self.console);
        tokio::spawn(async move {
            console.send_line(&line).await;
        });
    }

    fn banner(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "skyhook {} / user: {}",
            env!("CARGO_PKG_VERSION"),
            self.user
        )];
        match self.session.as_ref() {
            Some(session) if session.status() == SessionStatus::Running => {
                let endpoint = match session.kind() {
                    TunnelKind::Tcp => {
                        format!("tcp://{}:{}", self.config.domain, session.forwarded_port())
                    }
                    _ => {
                        let scheme = if self.config.tls_enabled { "https" } else { "http" };
                        format!("{scheme}://{}.{}", session.slug().get(), self.config.domain)
                    }
                };
                lines.push(format!("tunnel ready: {endpoint}"));
            }
            _ => lines.push("waiting for a forward request (ssh -R ...)".to_string()),
        }
        lines
    }

    /// Line-buffer terminal input; complete lines become console commands.
    fn feed_command_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            match byte {
                b'\r' | b'\n' => {
                    let line = std::mem::take(&mut self.command_buf);
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        self.handle_command(line);
                    }
                }
                _ => {
                    if self.command_buf.len() < 1024 && !byte.is_ascii_control() {
                        self.command_buf.push(byte as char);
                    }
                }
            }
        }
    }

    fn handle_command(&self, line: String) {
        let console = Arc::clone(&self.console);
        let registry = Arc::clone(&self.registry);
        let session = self.session.clone();
        let domain = self.config.domain.clone();
        let scheme = if self.config.tls_enabled { "https" } else { "http" };

        tokio::spawn(async move {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("rename"), Some(slug)) => {
                    let Some(session) = session else {
                        return;
                    };
                    let Some(old) = session.registry_key() else {
                        console.send_line("no tunnel to rename yet").await;
                        return;
                    };
                    if old.kind != KeyKind::Http {
                        console.send_line("rename applies to HTTP tunnels").await;
                        return;
                    }
                    match registry.update(session.user(), &old, SessionKey::http(slug)) {
                        Ok(()) => {
                            console
                                .send_line(&format!("tunnel renamed: {scheme}://{slug}.{domain}"))
                                .await
                        }
                        Err(err) => console.send_line(&format!("rename failed: {err}")).await,
                    }
                }
                (Some("rename"), None) => console.send_line("usage: rename <slug>").await,
                (Some(other), _) => {
                    console
                        .send_line(&format!("unknown command: {other} (try: rename <slug>)"))
                        .await
                }
                (None, _) => {}
            }
        });
    }
}

impl Handler for SessionHandler {
    type Error = ServerError;

    async fn auth_none(&mut self, _user: &str) -> Result<Auth, Self::Error> {
        // anonymous sessions keep the sentinel identity; standalone mode
        // refuses them at forward time
        Ok(Auth::Accept)
    }

    async fn auth_password(&mut self, user: &str, _password: &str) -> Result<Auth, Self::Error> {
        self.user = normalize_user(user);
        Ok(Auth::Accept)
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        debug!(
            user,
            fingerprint = %public_key.fingerprint(HashAlg::Sha256),
            "public key offered"
        );
        self.user = normalize_user(user);
        Ok(Auth::Accept)
    }

    async fn auth_succeeded(&mut self, session: &mut SshSession) -> Result<(), Self::Error> {
        debug!(user = %self.user, peer = ?self.peer, "session authenticated");

        let entity = Session::new(self.user.clone(), session.handle());
        let lifecycle = Lifecycle::new(
            Arc::clone(&entity),
            Arc::clone(&self.registry),
            Arc::clone(&self.ports),
            Arc::clone(&self.console),
        );

        let (interactive_tx, interactive_rx) = oneshot::channel();
        let (forward_tx, forward_rx) = oneshot::channel();
        self.interactive_signal = Some(interactive_tx);
        self.forward_signal = Some(forward_tx);
        self.session = Some(entity);
        self.lifecycle = Some(Arc::clone(&lifecycle));

        tokio::spawn(supervise(
            lifecycle,
            Arc::clone(&self.console),
            interactive_rx,
            forward_rx,
            self.config.interactive_wait,
            self.config.forward_wait,
        ));
        Ok(())
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut SshSession,
    ) -> Result<bool, Self::Error> {
        debug!(peer = ?self.peer, "session channel opened");
        self.console.attach(channel).await;
        if let Some(signal) = self.interactive_signal.take() {
            let _ = signal.send(());
        }
        Ok(true)
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        session.channel_success(channel)?;
        let console = Arc::clone(&self.console);
        let banner = self.banner();
        tokio::spawn(async move {
            for line in banner {
                console.send_line(&line).await;
            }
        });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        self.console.set_wh(col_width, row_height);
        session.channel_success(channel)?;
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        _channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        self.console.set_wh(col_width, row_height);
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        _data: &[u8],
        session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        session.channel_failure(channel)?;
        Ok(())
    }

    async fn data(
        &mut self,
        _channel: ChannelId,
        data: &[u8],
        _session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        self.feed_command_bytes(data);
        Ok(())
    }

    async fn tcpip_forward(
        &mut self,
        address: &str,
        port: &mut u32,
        _session: &mut SshSession,
    ) -> Result<bool, Self::Error> {
        if let Some(signal) = self.forward_signal.take() {
            let _ = signal.send(());
        }

        let (entity, lifecycle) = match (self.session.clone(), self.lifecycle.clone()) {
            (Some(entity), Some(lifecycle)) => (entity, lifecycle),
            _ => return Ok(false),
        };

        if self.forward_requested {
            // one tunnel per connection; later requests are refused without
            // touching the established one
            debug!(address, requested = *port, "additional tcpip-forward refused");
            return Ok(false);
        }
        self.forward_requested = true;

        if self.config.mode == Mode::Standalone
            && entity.user() == UNAUTHORIZED_USER
            && !self.console.is_attached()
        {
            info!(peer = ?self.peer, "refusing anonymous headless session in standalone mode");
            lifecycle.close_in_background();
            return Ok(false);
        }

        match plan_forward(*port) {
            ForwardPlan::Refuse(reason) => {
                warn!(peer = ?self.peer, address, "forward request refused: {}", reason);
                self.notify(format!("forward refused: {reason}"));
                lifecycle.close_in_background();
                Ok(false)
            }
            ForwardPlan::Http(http_port) => match self.establish_http(&entity, http_port).await {
                Ok(slug) => {
                    info!(%slug, port = http_port, user = entity.user(), "HTTP tunnel up");
                    Ok(true)
                }
                Err(err) => self.deny(&lifecycle, err),
            },
            ForwardPlan::Tcp(requested) => {
                match self.establish_tcp(&entity, &lifecycle, requested).await {
                    Ok(bound) => {
                        *port = u32::from(bound);
                        info!(port = bound, user = entity.user(), "TCP tunnel up");
                        Ok(true)
                    }
                    Err(err) => self.deny(&lifecycle, err),
                }
            }
        }
    }

    async fn cancel_tcpip_forward(
        &mut self,
        address: &str,
        port: u32,
        _session: &mut SshSession,
    ) -> Result<bool, Self::Error> {
        // not supported; refusing leaves the established tunnel untouched
        debug!(address, port, "cancel-tcpip-forward refused");
        Ok(false)
    }
}

impl Drop for SessionHandler {
    fn drop(&mut self) {
        if let Some(lifecycle) = self.lifecycle.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    lifecycle.close().await;
                });
            }
        }
    }
}

fn normalize_user(user: &str) -> String {
    if user.is_empty() {
        UNAUTHORIZED_USER.to_string()
    } else {
        user.to_string()
    }
}

/// Watches a fresh session through its first second: classify interactive
/// vs headless, then require a forward request or close.
async fn supervise(
    lifecycle: Arc<Lifecycle>,
    console: Arc<Console>,
    interactive: oneshot::Receiver<()>,
    forward: oneshot::Receiver<()>,
    interactive_wait: Duration,
    forward_wait: Duration,
) {
    let interactive_mode = matches!(timeout(interactive_wait, interactive).await, Ok(Ok(())));
    debug!(interactive = interactive_mode, "session classified");

    if matches!(timeout(forward_wait, forward).await, Ok(Ok(()))) {
        return;
    }

    if interactive_mode {
        console
            .send_line("no forwarding request received (use: ssh -R 80:localhost:<port> ...)")
            .await;
    }
    debug!("no tcpip-forward in time; closing session");
    lifecycle.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handler(mode: Mode) -> SessionHandler {
        SessionHandler {
            config: SshServerConfig {
                mode,
                ..SshServerConfig::default()
            },
            registry: Arc::new(SessionRegistry::new()),
            ports: Arc::new(PortRegistry::new()),
            pool: BufferPool::new(4096),
            peer: None,
            user: "alice".to_string(),
            console: Console::new(),
            session: None,
            lifecycle: None,
            forward_requested: false,
            interactive_signal: None,
            forward_signal: None,
            command_buf: String::new(),
        }
    }

    #[test]
    fn test_plan_forward_http_ports() {
        assert_eq!(plan_forward(80), ForwardPlan::Http(80));
        assert_eq!(plan_forward(443), ForwardPlan::Http(443));
    }

    #[test]
    fn test_plan_forward_oversize_port() {
        assert_eq!(
            plan_forward(65536),
            ForwardPlan::Refuse(RefuseReason::PortTooLarge(65536))
        );
        assert_eq!(plan_forward(65535), ForwardPlan::Tcp(65535));
    }

    #[test]
    fn test_plan_forward_blocked_ports() {
        assert_eq!(
            plan_forward(22),
            ForwardPlan::Refuse(RefuseReason::PortBlocked(22))
        );
        assert_eq!(
            plan_forward(3306),
            ForwardPlan::Refuse(RefuseReason::PortBlocked(3306))
        );
    }

    #[test]
    fn test_plan_forward_any_port() {
        // 0 means allocate from the pool
        assert_eq!(plan_forward(0), ForwardPlan::Tcp(0));
        assert_eq!(plan_forward(10042), ForwardPlan::Tcp(10042));
    }

    #[tokio::test]
    async fn test_establish_http_registers_running_session() {
        let handler = test_handler(Mode::Standalone);
        let entity = Session::detached("alice");

        let slug = handler.establish_http(&entity, 80).await.unwrap();
        assert_eq!(slug.len(), GENERATED_SLUG_LEN);
        assert_eq!(entity.kind(), TunnelKind::Http);
        assert_eq!(entity.forwarded_port(), 80);
        assert_eq!(entity.status(), SessionStatus::Running);
        assert_eq!(entity.slug().get(), slug);

        let found = handler.registry.get(&SessionKey::http(slug)).unwrap();
        assert_eq!(found.user(), "alice");
    }

    #[tokio::test]
    async fn test_establish_tcp_exhausted_pool() {
        let handler = test_handler(Mode::Standalone);
        handler.ports.add_range(10000, 10000);
        assert!(handler.ports.claim(10000));

        let entity = Session::detached("alice");
        let lifecycle = Lifecycle::new(
            Arc::clone(&entity),
            Arc::clone(&handler.registry),
            Arc::clone(&handler.ports),
            Console::new(),
        );

        let err = handler
            .establish_tcp(&entity, &lifecycle, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, EstablishError::NoAvailablePort));

        // nothing registered, nothing bound
        assert_eq!(entity.kind(), TunnelKind::Unknown);
        assert!(handler.registry.keys_for_user("alice").is_empty());
    }

    #[tokio::test]
    async fn test_establish_tcp_specific_port_unavailable() {
        let handler = test_handler(Mode::Standalone);
        handler.ports.add_range(10000, 10001);
        assert!(handler.ports.claim(10000));

        let entity = Session::detached("alice");
        let lifecycle = Lifecycle::new(
            Arc::clone(&entity),
            Arc::clone(&handler.registry),
            Arc::clone(&handler.ports),
            Console::new(),
        );

        let err = handler
            .establish_tcp(&entity, &lifecycle, 10000)
            .await
            .unwrap_err();
        assert!(matches!(err, EstablishError::PortUnavailable(10000)));

        // the other port is still free for the next session
        assert_eq!(handler.ports.unassigned(), Some(10001));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("standalone".parse::<Mode>().unwrap(), Mode::Standalone);
        assert_eq!("cluster".parse::<Mode>().unwrap(), Mode::Cluster);
        assert!("other".parse::<Mode>().is_err());
    }

    #[test]
    fn test_normalize_user() {
        assert_eq!(normalize_user("alice"), "alice");
        assert_eq!(normalize_user(""), UNAUTHORIZED_USER);
    }
}
