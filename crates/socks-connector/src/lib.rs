//! Open a byte stream to a remote host through a SOCKS5 proxy.
//!
//! A [`SocksConnector`] holds everything needed to reach one target:
//! where the proxy is, how to authenticate to it, where the target is,
//! and whether the tunnel should be wrapped in TLS.  Given a byte stream
//! to the proxy, it produces a [`SocksConnection`]: an `AsyncRead +
//! AsyncWrite` object that negotiates SOCKS5 behind the scenes, then
//! carries application bytes.
//!
//! Until negotiation (and the TLS upgrade, if any) is complete, reads
//! from a `SocksConnection` make no progress except driving the
//! handshake, and writes fail with [`Error::NotConnected`].  Callers who
//! want to wait for the tunnel explicitly can use
//! [`SocksConnection::ready`].  Lifecycle notifications are delivered as
//! [`ConnEvent`]s to any receiver obtained from
//! [`SocksConnection::subscribe`].
//!
//! The wire protocol itself lives in the `socks-client-proto` crate; this
//! crate adds the I/O around it:
//!
//!  * an accumulator that gathers exactly as many bytes as each protocol
//!    step needs, however the transport chooses to deliver them,
//!  * a pluggable [`TlsUpgrader`] (by default, one built on
//!    `native-tls`) that wraps the finished tunnel,
//!  * and, with the `tokio` feature, [`SocksConnector::connect`], which
//!    dials the proxy itself.
//!
//! No timeouts are imposed on any step: wrap the calls in your own
//! deadline if you need one.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::await_holding_lock)]

mod accumulate;
mod config;
mod connection;
mod connector;
mod err;
#[cfg(feature = "tokio")]
mod net;
#[cfg(test)]
mod testing;
mod tls;

pub use config::{
    ClientIdentity, ProxyConfig, ProxyConfigBuilder, TargetConfig, TargetConfigBuilder,
};
pub use connection::{ConnEvent, SocksConnection};
pub use connector::SocksConnector;
pub use err::Error;
#[cfg(feature = "tokio")]
pub use net::ProxyStream;
pub use tls::{CertifiedConn, NativeTlsUpgrader, TlsSession, TlsUpgrader, Tunnel};

pub use socks_client_proto::{ResolvedBinding, SocksAddr};

/// A Result type for the socks_connector crate.
pub type Result<T> = std::result::Result<T, Error>;
