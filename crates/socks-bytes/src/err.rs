//! Internal: Declare an Error type for socks-bytes

use thiserror::Error;

/// Error type for decoding SOCKS frames from bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// There were not enough bytes to decode the object: wait for more.
    #[error("object truncated (or not fully present)")]
    Truncated,
    /// The object was followed by bytes that nothing consumed.
    #[error("extra bytes at end of object")]
    ExtraneousBytes,
    /// The bytes were present, but they did not make sense.
    #[error("bad object: {0}")]
    BadMessage(&'static str),
}
