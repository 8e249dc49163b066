//! Entry point: turning configuration into tunnels.

use crate::config::{ProxyConfig, TargetConfig};
use crate::connection::{self, SocksConnection, TlsPlan};
use crate::tls::{NativeTlsUpgrader, TlsUpgrader};
use crate::Result;

use socks_client_proto::{SocksAuth, SocksClientHandshake, SocksRequest};

use futures::io::{AsyncRead, AsyncWrite};
use std::sync::Arc;
use tracing::debug;

/// An object that opens tunnels to one target through one SOCKS5 proxy.
///
/// All settings are checked when the connector is built, so a
/// misconfiguration shows up before any bytes are sent.
pub struct SocksConnector {
    /// Where we're going.
    target: TargetConfig,
    /// How we get there.
    proxy: ProxyConfig,
    /// The CONNECT request to send.
    request: SocksRequest,
    /// The credentials to offer.
    auth: SocksAuth,
    /// Used to wrap tunnels in TLS, if the target wants it.
    tls: Option<Arc<dyn TlsUpgrader>>,
}

impl SocksConnector {
    /// Construct a new connector.
    ///
    /// Fails if the target hostname or the credentials can't be
    /// expressed in SOCKS5, or if the TLS settings are unusable.
    pub fn new(target: TargetConfig, proxy: ProxyConfig) -> Result<Self> {
        let request = SocksRequest::connect(&target.host, target.port)?;
        let auth = proxy.auth()?;
        let tls = if target.ssl {
            let up: Arc<dyn TlsUpgrader> = Arc::new(NativeTlsUpgrader::from_config(&target)?);
            Some(up)
        } else {
            None
        };
        Ok(SocksConnector {
            target,
            proxy,
            request,
            auth,
            tls,
        })
    }

    /// Use `upgrader` instead of the native TLS library.
    ///
    /// Has no effect unless the target is configured for TLS.
    pub fn with_tls_upgrader(mut self, upgrader: Arc<dyn TlsUpgrader>) -> Self {
        if self.target.ssl {
            self.tls = Some(upgrader);
        }
        self
    }

    /// Return the proxy settings of this connector.
    pub fn proxy_config(&self) -> &ProxyConfig {
        &self.proxy
    }

    /// Return the target settings of this connector.
    pub fn target_config(&self) -> &TargetConfig {
        &self.target
    }

    /// Start opening a tunnel over `stream`, which must already be
    /// connected to the proxy.
    ///
    /// Nothing happens until the returned connection is read from, or
    /// until [`SocksConnection::ready`] is awaited.
    pub fn negotiate<S>(&self, stream: S) -> SocksConnection<S>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        debug!(
            "Negotiating tunnel to {}:{} (tls: {})",
            self.target.host,
            self.target.port,
            self.tls.is_some()
        );
        let hs = SocksClientHandshake::new(self.request.clone(), self.auth.clone());
        let plan = self.tls.as_ref().map(|up| TlsPlan {
            hostname: self.target.host.clone(),
            upgrader: Arc::clone(up),
        });
        let fut = connection::negotiate(stream, hs, plan);
        SocksConnection::new(Box::pin(fut), self.proxy.allow_half_open)
    }

    /// Dial the proxy and start opening a tunnel over the new
    /// connection.
    ///
    /// Errors from dialing are returned as-is.
    #[cfg(feature = "tokio")]
    pub async fn connect(&self) -> Result<SocksConnection<crate::ProxyStream>> {
        let stream = crate::net::dial(&self.proxy).await?;
        Ok(self.negotiate(stream))
    }
}
