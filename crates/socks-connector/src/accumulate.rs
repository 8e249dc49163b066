//! Gather exact-sized chunks from a byte stream.
//!
//! The proxy may deliver a handshake reply in one piece, one byte at a
//! time, or anything in between.  An [`Accumulator`] hides that: each
//! call to [`Accumulator::take`] yields exactly the requested number of
//! bytes, or an error if the stream ends first.

use futures::io::AsyncRead;
use futures::task::{Context, Poll};
use std::io::{self, Result as IoResult};
use std::pin::Pin;

/// A wrapper around a stream that reads fixed-size chunks from it.
///
/// We only ever ask the stream for the bytes we are still missing, so
/// nothing past the end of a handshake message is consumed: once the
/// handshake is over, the stream can be used directly.
pub(crate) struct Accumulator<R> {
    /// The stream we're reading from.
    inner: R,
    /// Bytes received toward the chunk we're currently assembling.
    buf: Vec<u8>,
}

impl<R> Accumulator<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap `inner`.
    pub(crate) fn new(inner: R) -> Self {
        Accumulator {
            inner,
            buf: Vec::new(),
        }
    }

    /// Try to complete a chunk of `n` bytes.
    ///
    /// Bytes that arrive are kept across calls that return `Pending`; a
    /// later call with the same `n` picks up where this one left off.
    pub(crate) fn poll_take(&mut self, cx: &mut Context<'_>, n: usize) -> Poll<IoResult<Vec<u8>>> {
        while self.buf.len() < n {
            let start = self.buf.len();
            self.buf.resize(n, 0);
            let result = Pin::new(&mut self.inner).poll_read(cx, &mut self.buf[start..]);
            match result {
                Poll::Ready(Ok(0)) => {
                    self.buf.truncate(start);
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "proxy closed the connection mid-handshake",
                    )));
                }
                Poll::Ready(Ok(got)) => self.buf.truncate(start + got),
                Poll::Ready(Err(e)) if e.kind() == io::ErrorKind::Interrupted => {
                    self.buf.truncate(start)
                }
                Poll::Ready(Err(e)) => {
                    self.buf.truncate(start);
                    return Poll::Ready(Err(e));
                }
                Poll::Pending => {
                    self.buf.truncate(start);
                    return Poll::Pending;
                }
            }
        }
        let rest = self.buf.split_off(n);
        Poll::Ready(Ok(std::mem::replace(&mut self.buf, rest)))
    }

    /// Wait until exactly `n` bytes are available, and return them.
    pub(crate) async fn take(&mut self, n: usize) -> IoResult<Vec<u8>> {
        futures::future::poll_fn(|cx| self.poll_take(cx, n)).await
    }

    /// Return a mutable reference to the underlying stream.
    pub(crate) fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Give up the underlying stream.
    pub(crate) fn into_inner(self) -> R {
        debug_assert!(self.buf.is_empty());
        self.inner
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::testing::stream_pair;
    use futures::io::{AsyncReadExt, AsyncWriteExt};
    use futures::FutureExt;

    /// Send `msg` over a fresh stream in the given pieces, and read it
    /// back in chunks of `want` bytes.
    fn reassemble(msg: &[u8], cuts: &[usize], want: &[usize]) -> Vec<Vec<u8>> {
        let (mut tx, rx) = stream_pair();
        let mut prev = 0;
        for &c in cuts.iter().chain(std::iter::once(&msg.len())) {
            futures::executor::block_on(tx.write_all(&msg[prev..c])).unwrap();
            prev = c;
        }
        let mut acc = Accumulator::new(rx);
        want.iter()
            .map(|&n| futures::executor::block_on(acc.take(n)).unwrap())
            .collect()
    }

    #[test]
    fn fragmentation() {
        let msg = b"\x05\x00\x00\x01\x7f\x00\x00\x01\x04\x38";
        let want = [2, 2, 6];
        let expect = vec![msg[..2].to_vec(), msg[2..4].to_vec(), msg[4..].to_vec()];

        assert_eq!(reassemble(msg, &[], &want), expect);
        assert_eq!(reassemble(msg, &[1, 2, 3, 4, 5, 6, 7, 8, 9], &want), expect);
        assert_eq!(reassemble(msg, &[3], &want), expect);
        assert_eq!(reassemble(msg, &[1, 7], &want), expect);
    }

    #[test]
    fn no_overread() {
        let (mut tx, rx) = stream_pair();
        futures::executor::block_on(tx.write_all(b"abcdefgh")).unwrap();
        let mut acc = Accumulator::new(rx);
        let got = futures::executor::block_on(acc.take(3)).unwrap();
        assert_eq!(&got[..], b"abc");

        // Everything after the chunk is still in the stream.
        let mut rx = acc.into_inner();
        let mut rest = [0_u8; 5];
        futures::executor::block_on(rx.read_exact(&mut rest)).unwrap();
        assert_eq!(&rest, b"defgh");
    }

    #[test]
    fn partial_then_pending() {
        let (mut tx, rx) = stream_pair();
        let mut acc = Accumulator::new(rx);
        futures::executor::block_on(tx.write_all(b"ab")).unwrap();
        assert!(acc.take(4).now_or_never().is_none());
        futures::executor::block_on(tx.write_all(b"cd")).unwrap();
        let got = futures::executor::block_on(acc.take(4)).unwrap();
        assert_eq!(&got[..], b"abcd");
    }

    #[test]
    fn eof_mid_chunk() {
        let (mut tx, rx) = stream_pair();
        let mut acc = Accumulator::new(rx);
        futures::executor::block_on(async {
            tx.write_all(b"\x05").await.unwrap();
            tx.close().await.unwrap();
        });
        let e = futures::executor::block_on(acc.take(2)).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
    }
}
