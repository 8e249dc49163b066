//! Move bytes between standard I/O and the tunnel.

use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use std::io::Result as IoResult;

/// Copy all the data from `reader` into `writer` until we encounter an
/// EOF or an error.
///
/// The writer is flushed whenever the reader has nothing more for the
/// moment, so that interactive traffic isn't held back in a buffer.  On
/// a clean EOF the writer is closed; after an error it is only flushed.
pub(crate) async fn copy_interactive<R, W>(mut reader: R, mut writer: W) -> IoResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    use futures::{poll, task::Poll};

    let mut buf = [0_u8; 4096];

    let result: IoResult<()> = loop {
        let mut read_future = reader.read(&mut buf[..]);
        let n = match poll!(&mut read_future) {
            Poll::Ready(r) => r,
            Poll::Pending => {
                writer.flush().await?;
                read_future.await
            }
        };
        match n {
            Err(e) => break Err(e),
            Ok(0) => break Ok(()),
            Ok(n) => writer.write_all(&buf[..n]).await?,
        }
    };

    let finish = if result.is_ok() {
        writer.close().await
    } else {
        writer.flush().await
    };
    result.or(finish)
}
