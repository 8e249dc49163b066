//! `socks-bytes`: Utilities to decode/encode SOCKS frames into bytes.
//!
//! # Overview
//!
//! SOCKS5 messages are small, byte-oriented, and not regular enough to
//! be worth a serde format: a version octet, a handful of single-byte
//! fields, length-prefixed strings, raw address octets and big-endian
//! ports.  This crate provides the two halves we need to handle them:
//!
//! * [`Reader`]: A view of a byte slice, from which data can be decoded.
//! * [`Writer`]: Trait to represent a growable buffer of bytes.
//!   (`Vec<u8>` implements this.)
//!
//! Types that appear on the wire implement [`Readable`] and/or
//! [`Writeable`], so that they can be pulled out of a `Reader` with
//! [`Reader::extract`] or appended to a `Writer` with [`Writer::write`].
//!
//! Nothing here performs I/O: the bytes must already be in memory.
//! Running out of input is reported as [`Error::Truncated`], which
//! callers treat as "wait for more bytes and try again".

#![deny(missing_docs)]
#![deny(unreachable_pub)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::missing_docs_in_private_items)]

mod err;
mod impls;
mod reader;
mod writer;

pub use err::Error;
pub use reader::Reader;
pub use writer::Writer;

/// Result type returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for an object that can be encoded onto a Writer by reference.
///
/// # Example
///
/// ```
/// use socks_bytes::{Writeable, Writer};
/// struct Greeting {
///   version: u8,
///   methods: Vec<u8>,
/// }
///
/// impl Writeable for Greeting {
///     fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
///         b.write_u8(self.version);
///         b.write_u8(self.methods.len() as u8);
///         b.write_all(&self.methods[..]);
///     }
/// }
///
/// let mut w: Vec<u8> = Vec::new();
/// w.write(&Greeting { version: 5, methods: vec![0] });
/// assert_eq!(w, &[5, 1, 0]);
/// ```
pub trait Writeable {
    /// Encode this object into the writer `b`.
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B);
}

/// Trait for an object that can be extracted from a Reader.
///
/// Implementations that fail part-way through may leave the reader
/// advanced; use [`Reader::extract`], which rewinds on failure.
pub trait Readable: Sized {
    /// Try to extract an object of this type from a Reader.
    fn take_from(r: &mut Reader<'_>) -> Result<Self>;
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn endpoint_round_trip() {
        let mut w: Vec<u8> = Vec::new();
        w.write(&Ipv4Addr::new(10, 0, 0, 7));
        w.write(&1080_u16);
        assert_eq!(w, &[10, 0, 0, 7, 0x04, 0x38]);

        let mut r = Reader::from_slice(&w[..]);
        let ip: Ipv4Addr = r.extract().unwrap();
        let port: u16 = r.extract().unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(port, 1080);
        r.should_be_exhausted().unwrap();
    }
}
