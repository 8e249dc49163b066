//! Open a tunnel to a remote host through a SOCKS5 proxy, and relay it
//! over standard input and output.
//!
//! Logs go to standard error, so that standard output carries nothing
//! but bytes from the target.

#![warn(missing_docs)]

mod relay;

use std::path::{Path, PathBuf};

use socks_connector::{ClientIdentity, ConnEvent, ProxyConfig, SocksConnector, TargetConfig};

use anyhow::{Context, Result};
use argh::FromArgs;
use futures::future::Either;
use futures::io::AsyncReadExt;
use futures::stream::StreamExt;
use serde::Deserialize;
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs, Debug, Clone)]
/// Connect to HOST:PORT through a SOCKS5 proxy, and relay the
/// connection over stdin and stdout.
struct Args {
    /// read configuration from this file (may be repeated)
    #[argh(option, short = 'f')]
    rc: Vec<String>,
    /// override a configuration option (e.g. proxy.port=9050)
    #[argh(option, short = 'c')]
    cfg: Vec<String>,
    /// log at trace level
    #[argh(switch)]
    trace: bool,
    /// host to reach through the proxy
    #[argh(positional)]
    host: String,
    /// port to reach through the proxy
    #[argh(positional)]
    port: u16,
}

/// Default options to use for our configuration.
const CONNECT_DEFAULTS: &str = include_str!("./connect_defaults.toml");

/// Structure to hold our configuration options, whether from a
/// configuration file or the command line.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct ConnectConfig {
    /// How to reach the proxy.
    proxy: ProxyConfig,
    /// What to reach through it.
    target: TargetConfig,
    /// Client certificate to present to the target over TLS.
    #[serde(default)]
    identity: Option<IdentityFiles>,
}

/// Where to find a client certificate and its key.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct IdentityFiles {
    /// PEM certificate chain.
    cert_file: PathBuf,
    /// PEM PKCS#8 private key.
    key_file: PathBuf,
}

impl IdentityFiles {
    /// Read both files.
    fn load(&self) -> Result<ClientIdentity> {
        let cert = std::fs::read(&self.cert_file)
            .with_context(|| format!("Can't read {}", self.cert_file.display()))?;
        let key = std::fs::read(&self.key_file)
            .with_context(|| format!("Can't read {}", self.key_file.display()))?;
        Ok(ClientIdentity::from_pem(cert, key))
    }
}

/// Split a `key=value` override from the command line.
fn parse_override(opt: &str) -> Result<(&str, &str)> {
    let (key, value) = opt
        .split_once('=')
        .with_context(|| format!("Expected KEY=VALUE, not {:?}", opt))?;
    Ok((key.trim(), value.trim().trim_matches('"')))
}

/// Build our configuration from defaults, files, and `args`.
fn load_config(args: &Args) -> Result<ConnectConfig> {
    let mut cfg = config::Config::new();
    cfg.merge(config::File::from_str(
        CONNECT_DEFAULTS,
        config::FileFormat::Toml,
    ))?;
    for p in &args.rc {
        let f: config::File<_> = Path::new(p).into();
        cfg.merge(f.format(config::FileFormat::Toml))?;
    }
    cfg.set("target.host", args.host.as_str())?;
    cfg.set("target.port", i64::from(args.port))?;
    for opt in &args.cfg {
        let (key, value) = parse_override(opt)?;
        cfg.set(key, value)?;
    }
    Ok(cfg.try_into()?)
}

/// Open the tunnel, then relay it until one side is done.
async fn run(connector: SocksConnector) -> Result<()> {
    let mut conn = connector
        .connect()
        .await
        .context("Couldn't reach the SOCKS proxy")?;

    let mut events = conn.subscribe();
    tokio_crate::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                ConnEvent::Connect(binding) => info!("Tunnel open; proxy bound {}", binding),
                ConnEvent::Error(e) => warn!("Tunnel failed: {}", e),
                ConnEvent::Close { had_error } => info!("Tunnel closed (error: {})", had_error),
                _ => {}
            }
        }
    });

    conn.ready()
        .await
        .context("Couldn't open a tunnel through the proxy")?;
    if let Some(cert) = conn.peer_certificate()? {
        info!("Target presented a {}-byte certificate", cert.len());
    }

    let (conn_r, conn_w) = conn.split();
    let upstream = relay::copy_interactive(tokio_crate::io::stdin().compat(), conn_w);
    let downstream = relay::copy_interactive(conn_r, tokio_crate::io::stdout().compat_write());
    futures::pin_mut!(upstream, downstream);

    match futures::future::select(upstream, downstream).await {
        Either::Left((sent, downstream)) => {
            sent.context("Couldn't relay standard input")?;
            downstream.await.context("Couldn't relay to standard output")?;
        }
        Either::Right((received, _)) => {
            received.context("Couldn't relay to standard output")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    let config = load_config(&args)?;

    let level = if args.trace { "trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ConnectConfig {
        proxy,
        mut target,
        identity,
    } = config;
    if let Some(files) = identity {
        target.set_client_identity(files.load()?);
    }
    let connector = SocksConnector::new(target, proxy).context("Invalid configuration")?;

    let runtime = tokio_crate::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(connector))
}
