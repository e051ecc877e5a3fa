//! skyhook — expose local services to the public Internet over SSH
//! reverse tunnels
//!
//! One long-running binary: an SSH server for tunnel owners, a shared
//! HTTP/HTTPS front door for their visitors, and per-session public TCP
//! listeners for everything that is not web traffic.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use skyhook_forward::BufferPool;
use skyhook_router::{PortRegistry, SessionRegistry};
use skyhook_server_http::{build_acceptor, HttpIngress, IngressConfig, DEFAULT_MAX_HEAD_BYTES};
use skyhook_server_ssh::{
    load_or_generate, transport_config, Mode, SshServerConfig, TunnelServer,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// skyhook reverse-tunnel server
#[derive(Parser, Debug)]
#[command(name = "skyhook")]
#[command(about = "Expose local services to the public Internet over SSH reverse tunnels")]
#[command(version)]
struct Cli {
    /// Base domain; HTTP tunnels are served at <slug>.<domain>
    #[arg(long, env = "DOMAIN")]
    domain: String,

    /// SSH listener port
    #[arg(long, env = "SSH_PORT", default_value = "2222")]
    ssh_port: u16,

    /// Public HTTP listener port
    #[arg(long, env = "HTTP_PORT", default_value = "80")]
    http_port: u16,

    /// Public HTTPS listener port
    #[arg(long, env = "HTTPS_PORT", default_value = "443")]
    https_port: u16,

    /// Serve TLS on the HTTPS port
    #[arg(long, env = "TLS_ENABLED")]
    tls_enabled: bool,

    /// Answer plain HTTP with a permanent redirect to the HTTPS origin
    #[arg(long, env = "TLS_REDIRECT")]
    tls_redirect: bool,

    /// TLS certificate chain (PEM); required when TLS is enabled
    #[arg(long, env = "TLS_CERT_PATH")]
    tls_cert_path: Option<PathBuf>,

    /// TLS private key (PEM); required when TLS is enabled
    #[arg(long, env = "TLS_KEY_PATH")]
    tls_key_path: Option<PathBuf>,

    /// Pump buffer size in bytes (4096..=1048576; out-of-range values fall
    /// back to 32768)
    #[arg(long, env = "BUFFER_SIZE", default_value = "32768")]
    buffer_size: usize,

    /// First port of the public TCP tunnel range
    #[arg(long, env = "ALLOWED_PORTS_START", default_value = "10000")]
    allowed_ports_start: u16,

    /// Last port of the public TCP tunnel range (inclusive)
    #[arg(long, env = "ALLOWED_PORTS_END", default_value = "20000")]
    allowed_ports_end: u16,

    /// standalone refuses anonymous headless sessions; cluster allows them
    #[arg(long, env = "MODE", default_value = "standalone", value_parser = parse_mode)]
    mode: Mode,

    /// SSH host key path; a 4096-bit RSA key is generated when missing
    #[arg(long, env = "HOST_KEY_PATH", default_value = "skyhook_host_key")]
    host_key_path: PathBuf,

    /// Landing page for slugs with no live tunnel
    #[arg(long, env = "NOT_FOUND_URL")]
    not_found_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_mode(value: &str) -> Result<Mode, String> {
    value.parse()
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        error!("fatal: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.allowed_ports_start > cli.allowed_ports_end {
        bail!(
            "invalid public port range {}..={}",
            cli.allowed_ports_start,
            cli.allowed_ports_end
        );
    }

    // TLS material is an init-time requirement; a missing cert must not
    // surface as per-connection failures later
    let tls_paths = if cli.tls_enabled {
        match (&cli.tls_cert_path, &cli.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            _ => bail!("TLS is enabled but TLS_CERT_PATH/TLS_KEY_PATH are not set"),
        }
    } else {
        None
    };

    let host_key = load_or_generate(&cli.host_key_path)
        .with_context(|| format!("host key at {}", cli.host_key_path.display()))?;

    let registry = Arc::new(SessionRegistry::new());
    let ports = Arc::new(PortRegistry::new());
    ports.add_range(cli.allowed_ports_start, cli.allowed_ports_end);
    let pool = BufferPool::new(cli.buffer_size);
    let shutdown = CancellationToken::new();

    info!(
        domain = %cli.domain,
        ssh_port = cli.ssh_port,
        http_port = cli.http_port,
        tls = cli.tls_enabled,
        ports_start = cli.allowed_ports_start,
        ports_end = cli.allowed_ports_end,
        buffer_size = pool.buffer_size(),
        "starting skyhook"
    );

    let ingress = HttpIngress::new(
        IngressConfig {
            domain: cli.domain.clone(),
            http_bind: SocketAddr::from(([0, 0, 0, 0], cli.http_port)),
            https_bind: cli
                .tls_enabled
                .then(|| SocketAddr::from(([0, 0, 0, 0], cli.https_port))),
            tls_redirect: cli.tls_enabled && cli.tls_redirect,
            not_found_url: cli
                .not_found_url
                .clone()
                .unwrap_or_else(|| format!("https://{}", cli.domain)),
            max_head_bytes: DEFAULT_MAX_HEAD_BYTES,
            fingerprint: format!("skyhook/{}", env!("CARGO_PKG_VERSION")),
        },
        Arc::clone(&registry),
        Arc::clone(&pool),
        shutdown.clone(),
    );

    let http_task = tokio::spawn(Arc::clone(&ingress).run_http());

    let https_task = match tls_paths {
        Some((cert, key)) => {
            let acceptor = build_acceptor(&cert, &key).context("loading TLS material")?;
            Some(tokio::spawn(Arc::clone(&ingress).run_https(acceptor)))
        }
        None => None,
    };

    let ssh_server = TunnelServer::new(
        SshServerConfig {
            bind: SocketAddr::from(([0, 0, 0, 0], cli.ssh_port)),
            domain: cli.domain.clone(),
            mode: cli.mode,
            tls_enabled: cli.tls_enabled,
            ..SshServerConfig::default()
        },
        Arc::clone(&registry),
        Arc::clone(&ports),
        Arc::clone(&pool),
    );
    let ssh_task = tokio::spawn(ssh_server.run(transport_config(host_key)));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            shutdown.cancel();
            Ok(())
        }
        result = http_task => {
            result.context("HTTP ingress task")??;
            bail!("HTTP ingress exited unexpectedly");
        }
        result = async {
            match https_task {
                Some(task) => task.await,
                None => std::future::pending().await,
            }
        } => {
            result.context("HTTPS ingress task")??;
            bail!("HTTPS ingress exited unexpectedly");
        }
        result = ssh_task => {
            result.context("SSH server task")??;
            bail!("SSH server exited unexpectedly");
        }
    }
}
