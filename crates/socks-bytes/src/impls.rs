//! Implementations of Writeable and Readable for the primitive items
//! that appear in SOCKS frames.

use super::*;

/// Vec<u8> is the main type that implements Writer.
impl Writer for Vec<u8> {
    fn write_all(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
    fn write_u8(&mut self, byte: u8) {
        self.push(byte);
    }
    fn write_zeros(&mut self, n: usize) {
        let new_len = self.len() + n;
        self.resize(new_len, 0);
    }
}

impl Writeable for [u8] {
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
        b.write_all(self)
    }
}

impl Writeable for u8 {
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
        b.write_u8(*self)
    }
}
impl Readable for u8 {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        r.take_u8()
    }
}

impl Writeable for u16 {
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
        b.write_u16(*self)
    }
}
impl Readable for u16 {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        r.take_u16()
    }
}

/// IPv4 and IPv6 addresses are encoded as their raw octets, most
/// significant first; never as strings.
mod net_impls {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    impl Writeable for Ipv4Addr {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
            b.write_all(&self.octets()[..])
        }
    }
    impl Readable for Ipv4Addr {
        fn take_from(r: &mut Reader<'_>) -> Result<Self> {
            Ok(r.take_u32()?.into())
        }
    }

    impl Writeable for Ipv6Addr {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
            b.write_all(&self.octets()[..])
        }
    }
    impl Readable for Ipv6Addr {
        fn take_from(r: &mut Reader<'_>) -> Result<Self> {
            Ok(r.take_u128()?.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::net::Ipv6Addr;

    #[test]
    fn ipv6_octets() {
        let ip: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let mut w: Vec<u8> = Vec::new();
        w.write(&ip);
        assert_eq!(&w[..], &hex!("20010db8000000000000000000000001")[..]);

        let mut r = Reader::from_slice(&w[..]);
        let back: Ipv6Addr = r.extract().unwrap();
        assert_eq!(back, ip);
    }

    #[test]
    fn ipv6_truncated() {
        let mut r = Reader::from_slice(&[0x20, 0x01, 0x0d, 0xb8][..]);
        assert_eq!(r.extract::<Ipv6Addr>().err(), Some(Error::Truncated));
        assert_eq!(r.remaining(), 4);
    }
}
