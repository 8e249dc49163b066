//! Configuration for reaching a target through a SOCKS5 proxy.
//!
//! Both types here are immutable once constructed.  Build them with
//! [`ProxyConfigBuilder`] and [`TargetConfigBuilder`], or deserialize
//! them from a configuration file.

use derive_builder::Builder;
use serde::Deserialize;

use socks_client_proto::SocksAuth;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::{Error, Result};

/// Where the SOCKS5 proxy is, and how to talk to it.
///
/// To create an object of this type, use [`ProxyConfigBuilder`].
#[derive(Clone, Builder, Deserialize)]
#[builder(setter(prefix = "set", into))]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Hostname or address of the proxy.
    #[builder(default = "default_proxy_host()")]
    #[serde(default = "default_proxy_host")]
    pub(crate) host: String,

    /// TCP port of the proxy.
    #[builder(default = "default_proxy_port()")]
    #[serde(default = "default_proxy_port")]
    pub(crate) port: u16,

    /// Local address to bind before dialing the proxy.
    #[builder(default = "default_local_address()")]
    #[serde(default = "default_local_address")]
    pub(crate) local_address: IpAddr,

    /// If false, we close our side of the tunnel as soon as the remote
    /// side finishes sending.
    #[builder(default)]
    #[serde(default)]
    pub(crate) allow_half_open: bool,

    /// Username for username/password authentication.  If this is
    /// absent or empty, we only offer "no authentication".
    #[builder(default)]
    #[serde(default)]
    pub(crate) user: Option<String>,

    /// Password to go with `user`.
    #[builder(default)]
    #[serde(default)]
    pub(crate) pass: Option<String>,
}

/// Default proxy hostname.
fn default_proxy_host() -> String {
    "localhost".to_string()
}

/// Default proxy port.
fn default_proxy_port() -> u16 {
    1080
}

/// Default local address: let the OS pick.
fn default_local_address() -> IpAddr {
    Ipv4Addr::UNSPECIFIED.into()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            host: default_proxy_host(),
            port: default_proxy_port(),
            local_address: default_local_address(),
            allow_half_open: false,
            user: None,
            pass: None,
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("local_address", &self.local_address)
            .field("allow_half_open", &self.allow_half_open)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProxyConfig {
    /// Return the hostname or address of the proxy.
    pub fn host(&self) -> &str {
        &self.host
    }
    /// Return the TCP port of the proxy.
    pub fn port(&self) -> u16 {
        self.port
    }
    /// Return the local address we bind before dialing.
    pub fn local_address(&self) -> IpAddr {
        self.local_address
    }
    /// Return true if the tunnel may stay half-open.
    pub fn allow_half_open(&self) -> bool {
        self.allow_half_open
    }

    /// Return the authentication we'll offer to the proxy.
    pub(crate) fn auth(&self) -> Result<SocksAuth> {
        match self.user.as_deref() {
            Some(user) if !user.is_empty() => {
                let pass = self.pass.as_deref().unwrap_or("");
                Ok(SocksAuth::username(user, pass)?)
            }
            _ => Ok(SocksAuth::NoAuth),
        }
    }
}

/// A client certificate and its private key, both PEM-encoded.
///
/// The key must be in PKCS#8 format.
#[derive(Clone)]
pub struct ClientIdentity {
    /// PEM-encoded certificate chain.
    pub(crate) cert_pem: Vec<u8>,
    /// PEM-encoded PKCS#8 private key.
    pub(crate) key_pem: Vec<u8>,
}

impl ClientIdentity {
    /// Construct a new identity from a PEM certificate and a PEM key.
    pub fn from_pem<C, K>(cert_pem: C, key_pem: K) -> Self
    where
        C: Into<Vec<u8>>,
        K: Into<Vec<u8>>,
    {
        ClientIdentity {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// The remote endpoint we want to reach through the proxy.
///
/// To create an object of this type, use [`TargetConfigBuilder`].  The
/// port has no default.
#[derive(Debug, Clone, Builder, Deserialize)]
#[builder(setter(prefix = "set", into))]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Hostname or address of the target.  The proxy resolves names.
    #[builder(default = "default_target_host()")]
    #[serde(default = "default_target_host")]
    pub(crate) host: String,

    /// TCP port of the target.
    pub(crate) port: u16,

    /// If true, wrap the tunnel in TLS once it is established.
    #[builder(default)]
    #[serde(default)]
    pub(crate) ssl: bool,

    /// If true, the target's certificate must verify against the
    /// system trust roots and match `host`.
    #[builder(default)]
    #[serde(default)]
    pub(crate) reject_unauthorized: bool,

    /// If true, fail the TLS upgrade when the target presents no
    /// certificate at all.
    #[builder(default)]
    #[serde(default)]
    pub(crate) request_cert: bool,

    /// Certificate and key to present to the target, if it asks.
    #[builder(default)]
    #[serde(skip)]
    pub(crate) client_identity: Option<ClientIdentity>,
}

/// Default target hostname.
fn default_target_host() -> String {
    "localhost".to_string()
}

impl TargetConfig {
    /// Return the hostname or address of the target.
    pub fn host(&self) -> &str {
        &self.host
    }
    /// Return the TCP port of the target.
    pub fn port(&self) -> u16 {
        self.port
    }
    /// Return true if the tunnel will be wrapped in TLS.
    pub fn ssl(&self) -> bool {
        self.ssl
    }
    /// Use `identity` as our certificate when the target asks for one.
    pub fn set_client_identity(&mut self, identity: ClientIdentity) {
        self.client_identity = Some(identity);
    }
}

impl From<ProxyConfigBuilderError> for Error {
    fn from(e: ProxyConfigBuilderError) -> Error {
        Error::BadConfig(e.to_string())
    }
}

impl From<TargetConfigBuilderError> for Error {
    fn from(e: TargetConfigBuilderError) -> Error {
        Error::BadConfig(e.to_string())
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn proxy_defaults() {
        let built = ProxyConfigBuilder::default().build().unwrap();
        let dflt = ProxyConfig::default();
        for c in &[built, dflt] {
            assert_eq!(c.host(), "localhost");
            assert_eq!(c.port(), 1080);
            assert_eq!(c.local_address(), IpAddr::from([0, 0, 0, 0]));
            assert!(!c.allow_half_open());
            assert!(matches!(c.auth().unwrap(), SocksAuth::NoAuth));
        }
    }

    #[test]
    fn proxy_auth() {
        let c = ProxyConfigBuilder::default()
            .set_user("alice".to_string())
            .set_pass("hunter2".to_string())
            .build()
            .unwrap();
        assert!(matches!(c.auth().unwrap(), SocksAuth::Username(_, _)));
        assert!(!format!("{:?}", c).contains("hunter2"));

        // An empty username means "no authentication".
        let c = ProxyConfigBuilder::default()
            .set_user(String::new())
            .build()
            .unwrap();
        assert!(matches!(c.auth().unwrap(), SocksAuth::NoAuth));

        let c = ProxyConfigBuilder::default()
            .set_user("u".repeat(256))
            .build()
            .unwrap();
        assert!(c.auth().is_err());
    }

    #[test]
    fn target_needs_port() {
        let e: Error = TargetConfigBuilder::default().build().unwrap_err().into();
        assert!(matches!(e, Error::BadConfig(_)));

        let c = TargetConfigBuilder::default().set_port(443_u16).build().unwrap();
        assert_eq!(c.host(), "localhost");
        assert_eq!(c.port(), 443);
        assert!(!c.ssl());
        assert!(!c.reject_unauthorized);
        assert!(c.client_identity.is_none());
    }
}
