//! Declare an error type for socks_client_proto
use crate::msg::SocksStatus;
use thiserror::Error;

/// An error that occurs while negotiating a SOCKS handshake with a proxy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Tried to handle a message that wasn't complete: try again.
    #[error("Message truncated; need to wait for more")]
    Truncated,

    /// The proxy answered with a SOCKS version other than 5.
    #[error("Only SOCKS version 5 is supported")]
    ProtocolVersionMismatch(u8),

    /// The proxy rejected every authentication method we offered.
    #[error("SOCKS: No acceptable authentication methods")]
    NoAcceptableAuthMethod,

    /// The proxy rejected our username and password.
    #[error("SOCKS: Authentication failed")]
    AuthenticationFailed,

    /// The proxy refused or failed to carry out our CONNECT request.
    #[error("SOCKS: {}", .0.message())]
    ServerError(SocksStatus),

    /// The proxy's reply used an address type we can't decode.
    #[error("Invalid address type")]
    UnsupportedAddressType(u8),

    /// The proxy sent something that isn't valid SOCKS.
    #[error("SOCKS protocol syntax violation")]
    Syntax,

    /// A value given to us can't be expressed in a SOCKS frame.
    #[error("Invalid argument: {0}")]
    BadArgument(&'static str),

    /// Tried to progress the SOCKS handshake when it was already
    /// finished.  This is a programming error.
    #[error("SOCKS handshake was finished; no need to call this again")]
    AlreadyFinished,
}

impl From<socks_bytes::Error> for Error {
    fn from(e: socks_bytes::Error) -> Error {
        use socks_bytes::Error as E;
        match e {
            E::Truncated => Error::Truncated,
            _ => Error::Syntax,
        }
    }
}
