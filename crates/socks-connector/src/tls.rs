//! Wrapping an established tunnel in TLS.
//!
//! The tunnel through the proxy is just a byte stream; when the target
//! speaks TLS, we run a TLS client handshake over it.  The TLS library
//! is pluggable through [`TlsUpgrader`]; [`NativeTlsUpgrader`] is the
//! one we use unless told otherwise.

use crate::config::TargetConfig;
use crate::{Error, Result};

use async_trait::async_trait;
use futures::io::{AsyncRead, AsyncWrite};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use tracing::trace;

/// A byte stream that can carry a TLS session.
pub trait Tunnel: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T> Tunnel for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// An object that knows about the certificate its peer presented.
pub trait CertifiedConn {
    /// Try to return the (DER-encoded) peer certificate for this
    /// connection, if any.
    fn peer_cert(&self) -> IoResult<Option<Vec<u8>>>;
}

/// An established TLS session over a [`Tunnel`].
pub trait TlsSession: AsyncRead + AsyncWrite + CertifiedConn + Send + Unpin {}
impl<T> TlsSession for T where T: AsyncRead + AsyncWrite + CertifiedConn + Send + Unpin {}

/// An object that can run a TLS client handshake over a tunnel.
#[async_trait]
pub trait TlsUpgrader: Send + Sync {
    /// Start a TLS session over `tunnel`, naming `hostname` as the
    /// server we expect to reach.
    ///
    /// Completes once the TLS handshake is over.
    async fn upgrade(
        &self,
        hostname: &str,
        tunnel: Box<dyn Tunnel>,
    ) -> IoResult<Box<dyn TlsSession>>;
}

/// A [`TlsUpgrader`] built on the platform's native TLS library.
pub struct NativeTlsUpgrader {
    /// The connector we use for every upgrade.
    connector: async_native_tls::TlsConnector,
    /// If true, treat a session without a peer certificate as a failure.
    request_cert: bool,
}

impl NativeTlsUpgrader {
    /// Build an upgrader that applies the TLS settings in `cfg`.
    ///
    /// Unless `reject_unauthorized` is set, certificates are accepted
    /// without any verification.
    pub fn from_config(cfg: &TargetConfig) -> Result<Self> {
        let mut builder = native_tls::TlsConnector::builder();
        builder
            .danger_accept_invalid_certs(!cfg.reject_unauthorized)
            .danger_accept_invalid_hostnames(!cfg.reject_unauthorized);
        if let Some(id) = &cfg.client_identity {
            let identity = native_tls::Identity::from_pkcs8(&id.cert_pem, &id.key_pem)
                .map_err(|e| Error::BadConfig(format!("unusable client identity: {}", e)))?;
            builder.identity(identity);
        }
        Ok(NativeTlsUpgrader {
            connector: builder.into(),
            request_cert: cfg.request_cert,
        })
    }
}

#[async_trait]
impl TlsUpgrader for NativeTlsUpgrader {
    async fn upgrade(
        &self,
        hostname: &str,
        tunnel: Box<dyn Tunnel>,
    ) -> IoResult<Box<dyn TlsSession>> {
        trace!("Starting TLS handshake with {}", hostname);
        let session = self
            .connector
            .connect(hostname, tunnel)
            .await
            .map_err(|e| IoError::new(ErrorKind::Other, e))?;
        if self.request_cert && session.peer_cert()?.is_none() {
            return Err(IoError::new(
                ErrorKind::Other,
                "peer presented no certificate",
            ));
        }
        Ok(Box::new(session))
    }
}

impl<S> CertifiedConn for async_native_tls::TlsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn peer_cert(&self) -> IoResult<Option<Vec<u8>>> {
        let cert = self.peer_certificate();
        match cert {
            Ok(Some(c)) => {
                let der = c.to_der().map_err(|e| IoError::new(ErrorKind::Other, e))?;
                Ok(Some(der))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(IoError::new(ErrorKind::Other, e)),
        }
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::{ClientIdentity, TargetConfigBuilder};

    #[test]
    fn build_upgrader() {
        let cfg = TargetConfigBuilder::default()
            .set_host("example.com".to_string())
            .set_port(443_u16)
            .set_ssl(true)
            .build()
            .unwrap();
        let up = NativeTlsUpgrader::from_config(&cfg).unwrap();
        assert!(!up.request_cert);
    }

    #[test]
    fn bad_identity() {
        let mut cfg = TargetConfigBuilder::default()
            .set_port(443_u16)
            .set_ssl(true)
            .build()
            .unwrap();
        cfg.set_client_identity(ClientIdentity::from_pem(
            &b"not a certificate"[..],
            &b"not a key"[..],
        ));
        let e = NativeTlsUpgrader::from_config(&cfg).err().unwrap();
        assert!(matches!(e, Error::BadConfig(_)));
    }
}
