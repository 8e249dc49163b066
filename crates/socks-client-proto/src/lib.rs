//! Implements the client side of a SOCKS5 handshake.
//!
//! SOCKS5 lets a client ask a proxy to open a TCP connection on its
//! behalf.  The client announces which authentication methods it
//! supports, optionally authenticates with a username and password,
//! sends a CONNECT request naming the target, and reads back a reply
//! that reports success or one of several failure codes.  After a
//! successful reply, the connection carries raw application bytes.
//!
//! This crate hides the details of that exchange behind a stateful
//! [`SocksClientHandshake`] type.  It performs no I/O at all: the caller
//! feeds it the bytes that the proxy sent, and gets back an [`Action`]
//! telling it what to send next and how many input bytes were used.
//! Eventually the handshake either finishes with a [`ResolvedBinding`],
//! or fails with an [`Error`].
//!
//! Only the CONNECT command is supported, with either no authentication
//! or Username/Password authentication.  SOCKS4, BIND, UDP ASSOCIATE
//! and GSSAPI are not implemented.
//!
//! For more information about SOCKS:
//!
//!   * SOCKS5 is specified in
//!     [RFC 1928](https://tools.ietf.org/html/rfc1928).
//!   * Username/Password authentication is specified in
//!     [RFC 1929](https://tools.ietf.org/html/rfc1929).

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]

mod err;
mod handshake;
mod msg;

pub use err::Error;
pub use handshake::{Action, SocksClientHandshake};
pub use msg::{
    AuthMethod, ResolvedBinding, SocksAddr, SocksAuth, SocksHostname, SocksRequest, SocksStatus,
};

/// A Result type for the socks_client_proto crate.
pub type Result<T> = std::result::Result<T, Error>;
