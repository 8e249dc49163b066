//! Internal: Declare the Writer trait for socks-bytes

use crate::Writeable;

/// A byte-oriented trait for writing to small buffers.
///
/// Unlike `std::io::Write`, this trait's methods are not allowed to
/// fail.  It's not for IO: build a frame in memory, then send it.
///
/// To define a new implementation, just define the write_all method.
///
/// ```
/// use socks_bytes::Writer;
/// let mut w: Vec<u8> = Vec::new();
/// w.write_u8(5);
/// w.write_u8(1);
/// w.write_zeros(1);
/// w.write_u16(443);
/// assert_eq!(w, &[0x05, 0x01, 0x00, 0x01, 0xbb]);
/// ```
pub trait Writer {
    /// Append a slice to the end of this writer.
    fn write_all(&mut self, b: &[u8]);

    /// Append a single u8 to this writer.
    fn write_u8(&mut self, x: u8) {
        self.write_all(&[x])
    }
    /// Append a single u16 to this writer, encoded in big-endian order.
    fn write_u16(&mut self, x: u16) {
        self.write_all(&x.to_be_bytes())
    }
    /// Write n bytes to this writer, all with the value zero.
    fn write_zeros(&mut self, n: usize) {
        let v = vec![0_u8; n];
        self.write_all(&v[..])
    }
    /// Append `b`, preceded by its length as a single byte.
    ///
    /// # Panics
    ///
    /// Panics if `b` is longer than 255 bytes; callers must reject such
    /// values before they get this far.
    fn write_u8_prefixed(&mut self, b: &[u8]) {
        assert!(b.len() <= u8::MAX as usize);
        self.write_u8(b.len() as u8);
        self.write_all(b);
    }
    /// Encode a Writeable object onto this writer, using its
    /// write_onto method.
    fn write<E: Writeable + ?Sized>(&mut self, e: &E) {
        e.write_onto(self)
    }
}
