//! Declare error types for socks-connector

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// An error from opening or using a tunnel through a SOCKS proxy.
///
/// This type is `Clone`, so that the same failure can be reported both
/// through a [`ConnEvent::Error`](crate::ConnEvent::Error) notification
/// and as the result of the operation that observed it.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The proxy broke the SOCKS protocol, or refused our request.
    #[error("{0}")]
    Proto(#[from] socks_client_proto::Error),

    /// The TLS session on top of the tunnel failed.
    #[error("TLS error: {0}")]
    Tls(#[source] Arc<io::Error>),

    /// Tried to write before the tunnel was established.
    #[error("Not connected")]
    NotConnected,

    /// The underlying transport failed.
    #[error("{0}")]
    Io(#[source] Arc<io::Error>),

    /// The configuration can't be used.
    #[error("Invalid configuration: {0}")]
    BadConfig(String),

    /// The connection was disposed of by its owner.
    #[error("Connection was disposed")]
    Disposed,

    /// An internal error of some kind that should never occur.
    #[error("Internal error: {0}")]
    Internal(&'static str),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(Arc::new(e))
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        use io::ErrorKind as K;
        let kind = match &e {
            Error::NotConnected | Error::Disposed => K::NotConnected,
            Error::Io(inner) => inner.kind(),
            Error::Proto(_) => K::InvalidData,
            _ => K::Other,
        };
        io::Error::new(kind, e)
    }
}

impl Error {
    /// Wrap an error from the TLS layer.
    pub(crate) fn tls(e: io::Error) -> Error {
        Error::Tls(Arc::new(e))
    }
}
