//! Dialing the proxy with tokio.

use crate::config::ProxyConfig;

use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio_crate::net::{lookup_host, TcpSocket};
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, trace};

/// A TCP connection to the proxy, as a `futures::io` stream.
pub type ProxyStream = Compat<tokio_crate::net::TcpStream>;

/// Return the local address to bind when dialing `remote`, or None if
/// `local` can't reach it.
fn local_for(local: IpAddr, remote: &SocketAddr) -> Option<IpAddr> {
    match (local, remote) {
        (IpAddr::V4(_), SocketAddr::V4(_)) | (IpAddr::V6(_), SocketAddr::V6(_)) => Some(local),
        (l, SocketAddr::V6(_)) if l.is_unspecified() => Some(Ipv6Addr::UNSPECIFIED.into()),
        (l, SocketAddr::V4(_)) if l.is_unspecified() => Some(Ipv4Addr::UNSPECIFIED.into()),
        _ => None,
    }
}

/// Open a TCP connection to the proxy named in `cfg`, from its local
/// address.
///
/// Every address the proxy's name resolves to is tried in turn; if all
/// fail, the last error is returned.
pub(crate) async fn dial(cfg: &ProxyConfig) -> IoResult<ProxyStream> {
    let mut last_err = None;
    for addr in lookup_host((cfg.host.as_str(), cfg.port)).await? {
        let local = match local_for(cfg.local_address, &addr) {
            Some(l) => l,
            None => {
                trace!("Skipping {}: can't reach it from {}", addr, cfg.local_address);
                continue;
            }
        };
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.bind(SocketAddr::new(local, 0))?;
        match socket.connect(addr).await {
            Ok(stream) => {
                debug!("Connected to proxy at {}", addr);
                return Ok(stream.compat());
            }
            Err(e) => {
                debug!("Couldn't reach proxy at {}: {}", addr, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        IoError::new(
            ErrorKind::AddrNotAvailable,
            format!("no usable address for proxy {}", cfg.host),
        )
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn local_families() {
        let any4: IpAddr = Ipv4Addr::UNSPECIFIED.into();
        let lo4: IpAddr = Ipv4Addr::LOCALHOST.into();
        let v4: SocketAddr = "127.0.0.1:1080".parse().unwrap();
        let v6: SocketAddr = "[::1]:1080".parse().unwrap();

        assert_eq!(local_for(any4, &v4), Some(any4));
        assert_eq!(local_for(any4, &v6), Some(Ipv6Addr::UNSPECIFIED.into()));
        assert_eq!(local_for(lo4, &v4), Some(lo4));
        assert_eq!(local_for(lo4, &v6), None);
    }
}
