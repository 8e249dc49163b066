//! In-memory streams and a fake TLS layer, for tests.

use crate::tls::{CertifiedConn, TlsSession, TlsUpgrader, Tunnel};

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use futures::stream::StreamExt;
use futures::task::{Context, Poll};
use std::io::{self, Result as IoResult};
use std::pin::Pin;

/// Message type passed over a LocalStream.
type Chunk = Result<Vec<u8>, io::ErrorKind>;

/// One end of an in-memory byte stream.
///
/// Every write arrives at the other end as a separate chunk, so tests
/// control exactly how the bytes are fragmented.
pub(crate) struct LocalStream {
    /// Chunks we send to the other end.
    w: mpsc::UnboundedSender<Chunk>,
    /// Chunks the other end sent us.
    r: mpsc::UnboundedReceiver<Chunk>,
    /// Remainder of the chunk we're currently reading.
    pending: Vec<u8>,
    /// If set, closing this end fails with this kind.
    close_err: Option<io::ErrorKind>,
}

/// Return two connected LocalStreams.
pub(crate) fn stream_pair() -> (LocalStream, LocalStream) {
    let (w1, r2) = mpsc::unbounded();
    let (w2, r1) = mpsc::unbounded();
    let s1 = LocalStream {
        w: w1,
        r: r1,
        pending: Vec::new(),
        close_err: None,
    };
    let s2 = LocalStream {
        w: w2,
        r: r2,
        pending: Vec::new(),
        close_err: None,
    };
    (s1, s2)
}

impl LocalStream {
    /// Make the other end's next read fail with `kind`.
    pub(crate) fn send_err(&mut self, kind: io::ErrorKind) {
        let _ = self.w.unbounded_send(Err(kind));
    }

    /// Make our own next close fail with `kind`, after closing anyway.
    pub(crate) fn fail_close(&mut self, kind: io::ErrorKind) {
        self.close_err = Some(kind);
    }

    /// Send `data` one byte per chunk.
    pub(crate) async fn write_trickle(&mut self, data: &[u8]) {
        for b in data {
            self.write_all(std::slice::from_ref(b)).await.unwrap();
        }
    }

    /// Read exactly `n` bytes.
    pub(crate) async fn read_n(&mut self, n: usize) -> Vec<u8> {
        let mut buf = vec![0; n];
        self.read_exact(&mut buf).await.unwrap();
        buf
    }

    /// Return true if the other end has closed its write side and we
    /// have read everything it sent.
    pub(crate) async fn at_eof(&mut self) -> bool {
        let mut buf = [0_u8; 1];
        matches!(self.read(&mut buf).await, Ok(0))
    }
}

impl AsyncRead for LocalStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<IoResult<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        while self.pending.is_empty() {
            match futures::ready!(self.r.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(kind)) => return Poll::Ready(Err(kind.into())),
                None => return Poll::Ready(Ok(0)),
            }
        }
        let n = std::cmp::min(buf.len(), self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Poll::Ready(Ok(n))
    }
}

impl AsyncWrite for LocalStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<IoResult<usize>> {
        match self.w.unbounded_send(Ok(buf.to_vec())) {
            Ok(()) => Poll::Ready(Ok(buf.len())),
            Err(_) => Poll::Ready(Err(io::ErrorKind::BrokenPipe.into())),
        }
    }
    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        Poll::Ready(Ok(()))
    }
    fn poll_close(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        self.w.close_channel();
        match self.close_err.take() {
            Some(kind) => Poll::Ready(Err(kind.into())),
            None => Poll::Ready(Ok(())),
        }
    }
}

/// Sent by [`MockTlsUpgrader`] as its whole "handshake".
pub(crate) const CLIENT_HELLO: &[u8] = b"CLIENTHELLO";
/// What [`MockTlsUpgrader`] expects in answer.
pub(crate) const SERVER_HELLO: &[u8] = b"SERVERHELLO";
/// The certificate a [`MockTlsSession`] reports.
pub(crate) const FAKE_CERT: &[u8] = b"fake certificate";

/// A TLS upgrader that doesn't do TLS.
///
/// It sends [`CLIENT_HELLO`], waits for [`SERVER_HELLO`], and then
/// passes bytes through unchanged.
#[derive(Default)]
pub(crate) struct MockTlsUpgrader {
    /// The hostname we were last asked to upgrade for.
    pub(crate) last_host: std::sync::Mutex<Option<String>>,
}

/// A passthrough "TLS" session, from [`MockTlsUpgrader`].
pub(crate) struct MockTlsSession {
    /// The tunnel underneath.
    inner: Box<dyn Tunnel>,
}

#[async_trait]
impl TlsUpgrader for MockTlsUpgrader {
    async fn upgrade(
        &self,
        hostname: &str,
        mut tunnel: Box<dyn Tunnel>,
    ) -> IoResult<Box<dyn TlsSession>> {
        *self.last_host.lock().unwrap() = Some(hostname.to_string());
        tunnel.write_all(CLIENT_HELLO).await?;
        tunnel.flush().await?;
        let mut hello = vec![0; SERVER_HELLO.len()];
        tunnel.read_exact(&mut hello).await?;
        if hello != SERVER_HELLO {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad server hello"));
        }
        Ok(Box::new(MockTlsSession { inner: tunnel }))
    }
}

impl CertifiedConn for MockTlsSession {
    fn peer_cert(&self) -> IoResult<Option<Vec<u8>>> {
        Ok(Some(FAKE_CERT.to_vec()))
    }
}

impl AsyncRead for MockTlsSession {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<IoResult<usize>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockTlsSession {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<IoResult<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }
    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }
    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        Pin::new(&mut self.inner).poll_close(cx)
    }
}
