//! Internal: Declare the Reader type for socks-bytes

use crate::{Error, Readable, Result};
use arrayref::array_ref;

/// A type for reading frames from a slice of bytes.
///
/// Unlike `io::Read`, this object never blocks and never performs
/// I/O: if the slice is too short, the read fails with
/// [`Error::Truncated`] and the caller is expected to come back once
/// more bytes have arrived.
///
/// # Examples
///
/// ```
/// use socks_bytes::{Reader, Result};
/// // A SOCKS5 reply header: version, status, reserved, address type.
/// let msg = [0x05, 0x00, 0x00, 0x01, 0x7f, 0x00];
/// let mut r = Reader::from_slice(&msg[..]);
/// assert_eq!(r.take_u8()?, 5);
/// assert_eq!(r.take_u8()?, 0);
/// assert_eq!(r.take_u8()?, 0); // reserved
/// assert_eq!(r.take_u8()?, 1);
/// assert_eq!(r.remaining(), 2);
/// # Result::Ok(())
/// ```
pub struct Reader<'a> {
    /// The underlying slice that we're reading from
    b: &'a [u8],
    /// The next position in the slice that we intend to read from.
    off: usize,
}

impl<'a> Reader<'a> {
    /// Construct a new Reader from a slice of bytes.
    pub fn from_slice(slice: &'a [u8]) -> Self {
        Reader { b: slice, off: 0 }
    }
    /// Return the total number of bytes in this reader that have not
    /// yet been read.
    pub fn remaining(&self) -> usize {
        self.b.len() - self.off
    }
    /// Return Ok if this reader is out of bytes, and
    /// Err(Error::ExtraneousBytes) otherwise.
    pub fn should_be_exhausted(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::ExtraneousBytes);
        }
        Ok(())
    }
    /// Try to consume and return a slice of `n` bytes from this reader.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated);
        }
        let b = &self.b[self.off..(self.off + n)];
        self.off += n;
        Ok(b)
    }
    /// Try to consume and return a u8 from this reader.
    pub fn take_u8(&mut self) -> Result<u8> {
        let b = self.take(1)?;
        Ok(b[0])
    }
    /// Try to consume and return a big-endian u16 from this reader.
    pub fn take_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes(*array_ref![b, 0, 2]))
    }
    /// Try to consume and return a big-endian u32 from this reader.
    pub fn take_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes(*array_ref![b, 0, 4]))
    }
    /// Try to consume and return a big-endian u128 from this reader.
    pub fn take_u128(&mut self) -> Result<u128> {
        let b = self.take(16)?;
        Ok(u128::from_be_bytes(*array_ref![b, 0, 16]))
    }
    /// Consume a one-byte length, then that many bytes; return the bytes.
    ///
    /// This is how SOCKS encodes hostnames, usernames and passwords.
    ///
    /// On failure, consumes nothing.
    ///
    /// ```
    /// use socks_bytes::{Reader, Result};
    /// let mut r = Reader::from_slice(b"\x03bob\x06secret");
    /// assert_eq!(r.take_u8_prefixed()?, b"bob");
    /// assert_eq!(r.take_u8_prefixed()?, b"secret");
    /// # Result::Ok(())
    /// ```
    pub fn take_u8_prefixed(&mut self) -> Result<&'a [u8]> {
        let off_orig = self.off;
        let len = self.take_u8()?;
        self.take(len as usize).map_err(|e| {
            self.off = off_orig;
            e
        })
    }
    /// Try to decode and remove a Readable from this reader, using its
    /// take_from() method.
    ///
    /// On failure, consumes nothing.
    pub fn extract<E: Readable>(&mut self) -> Result<E> {
        let off_orig = self.off;
        let result = E::take_from(self);
        if result.is_err() {
            self.off = off_orig;
        }
        result
    }
}
