//! Structures that represent SOCKS5 messages, and the frame codec that
//! turns them into bytes and back.

use crate::{Error, Result};

use caret::caret_int;
use socks_bytes::Result as BytesResult;
use socks_bytes::{Readable, Reader, Writeable, Writer};

use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The only SOCKS version spoken here.
pub(crate) const SOCKS_VERSION: u8 = 5;

/// Version octet for the Username/Password sub-negotiation (RFC 1929).
pub(crate) const USERPASS_VERSION: u8 = 1;

/// Command octet asking the proxy to connect to a remote TCP address:port.
const CMD_CONNECT: u8 = 1;

/// A target to connect to: what we put in a CONNECT request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocksRequest {
    /// The target address.
    addr: SocksAddr,
    /// The target port.
    port: u16,
}

/// An address sent or received as part of a SOCKS handshake
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum SocksAddr {
    /// A DNS hostname, for the proxy to resolve.
    Hostname(SocksHostname),
    /// An IP address.
    Ip(IpAddr),
}

/// A hostname for use with SOCKS.  It is limited to 255 bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocksHostname(String);

/// Credentials that the client is willing to present to the proxy.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SocksAuth {
    /// Offer no authentication.
    NoAuth,
    /// Offer Username/Password authentication (RFC 1929), and fall back
    /// to no authentication if the proxy prefers that.
    Username(Vec<u8>, Vec<u8>),
}

caret_int! {
    /// An authentication method, as named in a method-negotiation frame.
    pub struct AuthMethod(u8) {
        /// No authentication required.
        NO_AUTH = 0x00,
        /// Username and password, as in RFC 1929.
        USERNAME_PASSWORD = 0x02,
        /// Sent by the proxy: none of the offered methods are acceptable.
        NO_ACCEPTABLE = 0xFF,
    }
}

caret_int! {
    /// Possible reply status values from a SOCKS5 CONNECT request.
    pub struct SocksStatus(u8) {
        /// RFC 1928: "succeeded"
        SUCCEEDED = 0x00,
        /// RFC 1928: "general SOCKS server failure"
        GENERAL_FAILURE = 0x01,
        /// RFC 1928: "connection not allowed by ruleset"
        NOT_ALLOWED = 0x02,
        /// RFC 1928: "Network unreachable"
        NETWORK_UNREACHABLE = 0x03,
        /// RFC 1928: "Host unreachable"
        HOST_UNREACHABLE = 0x04,
        /// RFC 1928: "Connection refused"
        CONNECTION_REFUSED = 0x05,
        /// RFC 1928: "TTL expired"
        TTL_EXPIRED = 0x06,
        /// RFC 1928: "Command not supported"
        COMMAND_NOT_SUPPORTED = 0x07,
        /// RFC 1928: "Address type not supported"
        ADDRTYPE_NOT_SUPPORTED = 0x08,
    }
}

impl SocksStatus {
    /// Return a human-readable description of this status.
    pub fn message(self) -> &'static str {
        match self {
            SocksStatus::SUCCEEDED => "succeeded",
            SocksStatus::GENERAL_FAILURE => "general SOCKS server failure",
            SocksStatus::NOT_ALLOWED => "Connection not allowed by ruleset",
            SocksStatus::NETWORK_UNREACHABLE => "Network unreachable",
            SocksStatus::HOST_UNREACHABLE => "Host unreachable",
            SocksStatus::CONNECTION_REFUSED => "Connection refused",
            SocksStatus::TTL_EXPIRED => "TTL expired",
            SocksStatus::COMMAND_NOT_SUPPORTED => "Command not supported",
            SocksStatus::ADDRTYPE_NOT_SUPPORTED => "Address type not supported",
            _ => "Unknown error",
        }
    }
}

impl TryFrom<String> for SocksHostname {
    type Error = Error;
    fn try_from(s: String) -> Result<SocksHostname> {
        if s.len() > 255 {
            Err(Error::BadArgument("hostname longer than 255 bytes"))
        } else {
            Ok(SocksHostname(s))
        }
    }
}

impl AsRef<str> for SocksHostname {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl From<SocksHostname> for String {
    fn from(s: SocksHostname) -> String {
        s.0
    }
}

impl SocksAddr {
    /// Interpret `host` as a literal IP address if it is one, and as a
    /// hostname otherwise.
    ///
    /// Fails if `host` is a hostname that doesn't fit in a SOCKS frame.
    pub fn from_host(host: &str) -> Result<SocksAddr> {
        match host.parse::<IpAddr>() {
            Ok(ip) => Ok(SocksAddr::Ip(ip)),
            Err(_) => Ok(SocksAddr::Hostname(host.to_string().try_into()?)),
        }
    }

    /// Return the address-type octet used to encode this address.
    pub fn atyp(&self) -> u8 {
        match self {
            SocksAddr::Ip(IpAddr::V4(_)) => 1,
            SocksAddr::Hostname(_) => 3,
            SocksAddr::Ip(IpAddr::V6(_)) => 4,
        }
    }
}

impl fmt::Display for SocksAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksAddr::Ip(a) => write!(f, "{}", a),
            SocksAddr::Hostname(h) => write!(f, "{}", h.0),
        }
    }
}

impl fmt::Debug for SocksAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksAuth::NoAuth => write!(f, "NoAuth"),
            SocksAuth::Username(u, _) => {
                write!(f, "Username({:?}, <redacted>)", String::from_utf8_lossy(u))
            }
        }
    }
}

impl SocksAuth {
    /// Construct Username/Password credentials.
    ///
    /// Each part is sent behind a one-byte length, so neither may be
    /// longer than 255 bytes.
    pub fn username<U, P>(user: U, pass: P) -> Result<SocksAuth>
    where
        U: Into<Vec<u8>>,
        P: Into<Vec<u8>>,
    {
        let (user, pass) = (user.into(), pass.into());
        if user.len() > 255 {
            return Err(Error::BadArgument("username longer than 255 bytes"));
        }
        if pass.len() > 255 {
            return Err(Error::BadArgument("password longer than 255 bytes"));
        }
        Ok(SocksAuth::Username(user, pass))
    }

    /// Return the list of methods to offer in the method-negotiation
    /// frame, in order of preference.
    pub(crate) fn offered_methods(&self) -> &'static [AuthMethod] {
        match self {
            SocksAuth::NoAuth => &[AuthMethod::NO_AUTH],
            SocksAuth::Username(_, _) => &[AuthMethod::USERNAME_PASSWORD, AuthMethod::NO_AUTH],
        }
    }

    /// Encode the method-negotiation frame:
    /// `[0x05, N, method_1..method_N]`.
    pub(crate) fn method_request(&self) -> Vec<u8> {
        let methods = self.offered_methods();
        let mut w = Vec::new();
        w.write_u8(SOCKS_VERSION);
        w.write_u8(methods.len() as u8);
        for m in methods {
            w.write_u8((*m).into());
        }
        w
    }

    /// Encode the Username/Password sub-negotiation frame:
    /// `[0x01, ULEN, UNAME, PLEN, PASSWD]`.
    ///
    /// If we have no credentials but the proxy insists on this method
    /// anyway, we send empty ones.
    pub(crate) fn userpass_request(&self) -> Vec<u8> {
        let (user, pass): (&[u8], &[u8]) = match self {
            SocksAuth::Username(u, p) => (u, p),
            SocksAuth::NoAuth => (&[], &[]),
        };
        let mut w = Vec::new();
        w.write_u8(USERPASS_VERSION);
        w.write_u8_prefixed(user);
        w.write_u8_prefixed(pass);
        w
    }
}

impl SocksRequest {
    /// Create a CONNECT request for `host`:`port`.
    ///
    /// `host` may be a literal IPv4 or IPv6 address, or a hostname of at
    /// most 255 bytes.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = SocksAddr::from_host(host)?;
        Ok(SocksRequest { addr, port })
    }

    /// Return the requested address.
    pub fn addr(&self) -> &SocksAddr {
        &self.addr
    }

    /// Return the requested port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Writeable for SocksRequest {
    /// Encode `[0x05, 0x01, 0x00, ATYP, DST.ADDR, DST.PORT]`.
    fn write_onto<W: Writer + ?Sized>(&self, w: &mut W) {
        w.write_u8(SOCKS_VERSION);
        w.write_u8(CMD_CONNECT);
        w.write_zeros(1); // reserved.
        w.write(&self.addr);
        w.write_u16(self.port);
    }
}

impl Writeable for SocksAddr {
    fn write_onto<W: Writer + ?Sized>(&self, w: &mut W) {
        w.write_u8(self.atyp());
        match self {
            SocksAddr::Ip(IpAddr::V4(ip)) => w.write(ip),
            SocksAddr::Ip(IpAddr::V6(ip)) => w.write(ip),
            // SocksHostname can't be built longer than 255 bytes.
            SocksAddr::Hostname(h) => w.write_u8_prefixed(h.0.as_bytes()),
        }
    }
}

/// The proxy's answer to our method-negotiation frame.
#[derive(Clone, Debug)]
pub(crate) struct MethodReply {
    /// Version octet; should be 5.
    pub(crate) version: u8,
    /// The method the proxy picked.
    pub(crate) method: AuthMethod,
}

impl Readable for MethodReply {
    fn take_from(r: &mut Reader<'_>) -> BytesResult<Self> {
        let version = r.take_u8()?;
        let method = r.take_u8()?.into();
        Ok(MethodReply { version, method })
    }
}

/// The proxy's answer to our Username/Password frame.
#[derive(Clone, Debug)]
pub(crate) struct UserPassReply {
    /// Zero on success.
    pub(crate) status: u8,
}

impl Readable for UserPassReply {
    fn take_from(r: &mut Reader<'_>) -> BytesResult<Self> {
        // The version octet is not checked: proxies disagree about it.
        let _version = r.take_u8()?;
        let status = r.take_u8()?;
        Ok(UserPassReply { status })
    }
}

/// The fixed-size head of a CONNECT reply, before the bound address.
#[derive(Clone, Debug)]
pub(crate) struct ReplyHeader {
    /// Reply status from the proxy.
    pub(crate) status: SocksStatus,
    /// Address type of the bound address that follows.
    pub(crate) atyp: u8,
}

impl Readable for ReplyHeader {
    fn take_from(r: &mut Reader<'_>) -> BytesResult<Self> {
        let _version = r.take_u8()?;
        let status = r.take_u8()?.into();
        let _reserved = r.take_u8()?;
        let atyp = r.take_u8()?;
        Ok(ReplyHeader { status, atyp })
    }
}

/// The address and port that the proxy bound on our behalf, as reported
/// in a successful CONNECT reply.
///
/// This is informational: nothing is sent to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBinding {
    /// The bound address.
    addr: SocksAddr,
    /// The bound port.
    port: u16,
}

impl ResolvedBinding {
    /// Construct a new ResolvedBinding.
    pub(crate) fn new(addr: SocksAddr, port: u16) -> Self {
        ResolvedBinding { addr, port }
    }

    /// Decode a 4-byte IPv4 bound address, then the port.
    pub(crate) fn take_ipv4(r: &mut Reader<'_>) -> BytesResult<Self> {
        let ip: Ipv4Addr = r.extract()?;
        Self::take_port(SocksAddr::Ip(ip.into()), r)
    }

    /// Decode a 16-byte IPv6 bound address, then the port.
    pub(crate) fn take_ipv6(r: &mut Reader<'_>) -> BytesResult<Self> {
        let ip: Ipv6Addr = r.extract()?;
        Self::take_port(SocksAddr::Ip(ip.into()), r)
    }

    /// Decode a hostname of `len` bytes (its length octet was already
    /// read), then the port.
    ///
    /// Hostnames that aren't valid UTF-8 are converted lossily: the
    /// bound address is only informational, and we don't want to fail
    /// a working tunnel over it.
    pub(crate) fn take_hostname(len: u8, r: &mut Reader<'_>) -> BytesResult<Self> {
        let name = r.take(len as usize)?;
        let name = String::from_utf8_lossy(name).into_owned();
        Self::take_port(SocksAddr::Hostname(SocksHostname(name)), r)
    }

    /// Helper: read the port that follows every bound address.
    fn take_port(addr: SocksAddr, r: &mut Reader<'_>) -> BytesResult<Self> {
        let port = r.take_u16()?;
        Ok(ResolvedBinding::new(addr, port))
    }

    /// Return the bound address.
    pub fn addr(&self) -> &SocksAddr {
        &self.addr
    }

    /// Return the bound port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ResolvedBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.addr {
            SocksAddr::Ip(IpAddr::V6(a)) => write!(f, "[{}]:{}", a, self.port),
            a => write!(f, "{}:{}", a, self.port),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn display_sa() {
        let a = SocksAddr::Ip(IpAddr::V4("127.0.0.1".parse().unwrap()));
        assert_eq!(a.to_string(), "127.0.0.1");

        let a = SocksAddr::Ip(IpAddr::V6("f00::9999".parse().unwrap()));
        assert_eq!(a.to_string(), "f00::9999");

        let a = SocksAddr::Hostname("www.example.org".to_string().try_into().unwrap());
        assert_eq!(a.to_string(), "www.example.org");
    }

    #[test]
    fn from_host() {
        let a = SocksAddr::from_host("93.184.216.34").unwrap();
        assert_eq!(a, SocksAddr::Ip("93.184.216.34".parse().unwrap()));
        assert_eq!(a.atyp(), 1);

        let a = SocksAddr::from_host("2001:db8::1").unwrap();
        assert_eq!(a.atyp(), 4);

        let a = SocksAddr::from_host("example.com").unwrap();
        assert_eq!(a.atyp(), 3);

        // Brackets aren't part of a literal address.
        let a = SocksAddr::from_host("[::1]").unwrap();
        assert_eq!(a.atyp(), 3);

        let long = "x".repeat(256);
        assert!(matches!(
            SocksAddr::from_host(&long),
            Err(Error::BadArgument(_))
        ));
        assert!(SocksAddr::from_host(&long[..255]).is_ok());
    }

    #[test]
    fn status_messages() {
        let expected = [
            (1, "general SOCKS server failure"),
            (2, "Connection not allowed by ruleset"),
            (3, "Network unreachable"),
            (4, "Host unreachable"),
            (5, "Connection refused"),
            (6, "TTL expired"),
            (7, "Command not supported"),
            (8, "Address type not supported"),
            (9, "Unknown error"),
            (0xEE, "Unknown error"),
        ];
        for (code, msg) in expected.iter() {
            assert_eq!(SocksStatus::from(*code).message(), *msg);
        }
    }

    #[test]
    fn connect_frames() {
        let mut w: Vec<u8> = Vec::new();
        w.write(&SocksRequest::connect("93.184.216.34", 80).unwrap());
        assert_eq!(&w[..], &hex!("05 01 00 01 5db8d822 0050")[..]);

        let mut w: Vec<u8> = Vec::new();
        w.write(&SocksRequest::connect("::1", 8080).unwrap());
        assert_eq!(
            &w[..],
            &hex!("05 01 00 04 00000000000000000000000000000001 1f90")[..]
        );

        let mut w: Vec<u8> = Vec::new();
        w.write(&SocksRequest::connect("example.com", 443).unwrap());
        assert_eq!(&w[..], &b"\x05\x01\x00\x03\x0bexample.com\x01\xbb"[..]);
    }

    #[test]
    fn connect_request_parses_back() {
        // A CONNECT request carries its address in the same layout as
        // the bound address of a reply, so the reply decoder reads it back.
        let hosts = [
            "10.1.2.3".to_string(),
            "fe80::1:2".to_string(),
            "torproject.org".to_string(),
            "a".repeat(255),
        ];
        for host in hosts.iter() {
            let req = SocksRequest::connect(host, 9050).unwrap();
            let mut w: Vec<u8> = Vec::new();
            w.write(&req);

            let mut r = Reader::from_slice(&w[..]);
            assert_eq!(r.take(3).unwrap(), &[5, 1, 0]);
            let binding = match r.take_u8().unwrap() {
                1 => ResolvedBinding::take_ipv4(&mut r),
                4 => ResolvedBinding::take_ipv6(&mut r),
                3 => {
                    let len = r.take_u8().unwrap();
                    ResolvedBinding::take_hostname(len, &mut r)
                }
                atyp => panic!("unexpected address type {}", atyp),
            }
            .unwrap();
            r.should_be_exhausted().unwrap();
            assert_eq!(binding.addr(), req.addr());
            assert_eq!(binding.addr().to_string(), *host);
            assert_eq!(binding.port(), 9050);
        }
    }

    #[test]
    fn method_requests() {
        assert_eq!(SocksAuth::NoAuth.method_request(), vec![5, 1, 0]);
        let auth = SocksAuth::username("bob", "secret").unwrap();
        assert_eq!(auth.method_request(), vec![5, 2, 2, 0]);
        assert_eq!(auth.userpass_request(), b"\x01\x03bob\x06secret".to_vec());
        assert_eq!(SocksAuth::NoAuth.userpass_request(), vec![1, 0, 0]);
    }

    #[test]
    fn credentials_too_long() {
        let long = vec![b'p'; 256];
        assert!(matches!(
            SocksAuth::username("bob", long.clone()),
            Err(Error::BadArgument(_))
        ));
        assert!(matches!(
            SocksAuth::username(long, "pw"),
            Err(Error::BadArgument(_))
        ));
        assert!(SocksAuth::username(vec![b'u'; 255], vec![b'p'; 255]).is_ok());
    }

    #[test]
    fn auth_debug_hides_password() {
        let auth = SocksAuth::username("bob", "secret").unwrap();
        let s = format!("{:?}", auth);
        assert!(s.contains("bob"));
        assert!(!s.contains("secret"));
    }

    #[test]
    fn binding_display() {
        let b = ResolvedBinding::new(SocksAddr::Ip("127.0.0.1".parse().unwrap()), 1080);
        assert_eq!(b.to_string(), "127.0.0.1:1080");
        let b = ResolvedBinding::new(SocksAddr::Ip("::1".parse().unwrap()), 1080);
        assert_eq!(b.to_string(), "[::1]:1080");
    }
}
