//! The duplex stream that a SOCKS tunnel presents to its user.
//!
//! A [`SocksConnection`] starts out negotiating: it owns a future that
//! runs the SOCKS5 handshake (and the TLS upgrade, if any) over the
//! proxy stream.  Reading drives that future; once it completes, reads
//! and writes go straight to the tunnel.

use crate::accumulate::Accumulator;
use crate::tls::{CertifiedConn, TlsSession, TlsUpgrader};
use crate::{Error, Result};

use socks_client_proto::{ResolvedBinding, SocksClientHandshake};

use futures::channel::mpsc;
use futures::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use futures::task::{Context, Poll};
use futures::Future;
use std::io::Result as IoResult;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// A notification about the lifecycle of a [`SocksConnection`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ConnEvent {
    /// The tunnel is established (including TLS, if requested), and
    /// data can flow.  Carries the address the proxy reported binding.
    ///
    /// Sent at most once.
    Connect(ResolvedBinding),
    /// Something went wrong.  During negotiation this is the only event
    /// a failure produces; afterwards it is followed by a `Close`.
    Error(Error),
    /// Both directions of an established tunnel are finished.
    Close {
        /// True if the tunnel ended because of an error.
        had_error: bool,
    },
}

/// Whatever carries application bytes once negotiation is over.
pub(crate) enum ActiveTransport<S> {
    /// The raw tunnel through the proxy.
    Tunnel(S),
    /// A TLS session running over the tunnel.
    Tls(Box<dyn TlsSession>),
}

/// A future that negotiates a tunnel over a proxy stream.
type Negotiation<S> =
    Pin<Box<dyn Future<Output = Result<(ActiveTransport<S>, ResolvedBinding)>> + Send>>;

/// What we need to wrap a finished tunnel in TLS.
pub(crate) struct TlsPlan {
    /// Name to give the TLS library for the target.
    pub(crate) hostname: String,
    /// The TLS library to use.
    pub(crate) upgrader: Arc<dyn TlsUpgrader>,
}

/// Run `hs` to completion over `stream`, then apply `tls` if present.
pub(crate) async fn negotiate<S>(
    stream: S,
    mut hs: SocksClientHandshake,
    tls: Option<TlsPlan>,
) -> Result<(ActiveTransport<S>, ResolvedBinding)>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let mut acc = Accumulator::new(stream);
    loop {
        let input = acc.take(hs.wants()).await?;
        let action = hs.handshake(&input)?;
        if !action.reply.is_empty() {
            trace!("Sending {} bytes to proxy", action.reply.len());
            acc.get_mut().write_all(&action.reply).await?;
            acc.get_mut().flush().await?;
        }
        if action.finished {
            break;
        }
    }
    let binding = hs
        .into_binding()
        .ok_or(Error::Internal("finished handshake without a binding"))?;
    debug!("Proxy reports bound address {}", binding);

    let tunnel = acc.into_inner();
    let transport = match tls {
        None => ActiveTransport::Tunnel(tunnel),
        Some(plan) => {
            let session = plan
                .upgrader
                .upgrade(&plan.hostname, Box::new(tunnel))
                .await
                .map_err(Error::tls)?;
            debug!("TLS session with {} established", plan.hostname);
            ActiveTransport::Tls(session)
        }
    };
    Ok((transport, binding))
}

/// The tunnel, once it is carrying application data.
struct Streaming<S> {
    /// Where the bytes go.
    transport: ActiveTransport<S>,
    /// The proxy's reported binding.
    binding: ResolvedBinding,
    /// True once the remote side has finished sending.
    read_eof: bool,
    /// True once we've finished sending.
    write_closed: bool,
    /// True once we've reported a `Close` event.
    close_reported: bool,
}

/// Current state of a [`SocksConnection`].
enum ConnState<S> {
    /// Running the SOCKS handshake, and maybe the TLS one.
    Negotiating(Negotiation<S>),
    /// Carrying data.
    Streaming(Streaming<S>),
    /// Failed; the transport is gone.
    Failed(Error),
    /// Disposed by its owner; the transport is gone.
    Disposed,
}

/// A byte stream to a target, tunneled through a SOCKS5 proxy.
///
/// Use [`SocksConnector::negotiate`](crate::SocksConnector::negotiate)
/// to create one.  This type implements [`AsyncRead`] and
/// [`AsyncWrite`]: reading before the tunnel is up drives negotiation
/// and returns nothing until data can flow; writing before then fails
/// with [`Error::NotConnected`] and leaves the connection untouched.
pub struct SocksConnection<S> {
    /// Where we are in the connection's life.
    state: ConnState<S>,
    /// If false, close our side once the remote side is done sending.
    allow_half_open: bool,
    /// Everybody who wants to hear about [`ConnEvent`]s.
    subscribers: Vec<mpsc::UnboundedSender<ConnEvent>>,
}

/// Send `event` to every live subscriber, forgetting the rest.
fn emit(subscribers: &mut Vec<mpsc::UnboundedSender<ConnEvent>>, event: ConnEvent) {
    subscribers.retain(|s| s.unbounded_send(event.clone()).is_ok());
}

impl<S> AsyncRead for ActiveTransport<S>
where
    S: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<IoResult<usize>> {
        match self.get_mut() {
            ActiveTransport::Tunnel(s) => Pin::new(s).poll_read(cx, buf),
            ActiveTransport::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl<S> AsyncWrite for ActiveTransport<S>
where
    S: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<IoResult<usize>> {
        match self.get_mut() {
            ActiveTransport::Tunnel(s) => Pin::new(s).poll_write(cx, buf),
            ActiveTransport::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }
    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        match self.get_mut() {
            ActiveTransport::Tunnel(s) => Pin::new(s).poll_flush(cx),
            ActiveTransport::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }
    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        match self.get_mut() {
            ActiveTransport::Tunnel(s) => Pin::new(s).poll_close(cx),
            ActiveTransport::Tls(s) => Pin::new(s).poll_close(cx),
        }
    }
}

impl<S> SocksConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Wrap a negotiation future.
    pub(crate) fn new(negotiation: Negotiation<S>, allow_half_open: bool) -> Self {
        SocksConnection {
            state: ConnState::Negotiating(negotiation),
            allow_half_open,
            subscribers: Vec::new(),
        }
    }

    /// Return a stream of [`ConnEvent`]s for this connection.
    ///
    /// Only events that happen after this call are delivered.  The
    /// stream ends when the connection is dropped or disposed.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConnEvent> {
        let (tx, rx) = mpsc::unbounded();
        if !matches!(self.state, ConnState::Disposed) {
            self.subscribers.push(tx);
        }
        rx
    }

    /// Return true if the tunnel is established and carrying data.
    pub fn is_established(&self) -> bool {
        matches!(self.state, ConnState::Streaming(_))
    }

    /// Return the address the proxy reported binding, once the tunnel
    /// is established.
    pub fn binding(&self) -> Option<&ResolvedBinding> {
        match &self.state {
            ConnState::Streaming(st) => Some(&st.binding),
            _ => None,
        }
    }

    /// Return the DER-encoded certificate the target presented, if the
    /// tunnel is established and wrapped in TLS.
    pub fn peer_certificate(&self) -> Result<Option<Vec<u8>>> {
        match &self.state {
            ConnState::Streaming(Streaming {
                transport: ActiveTransport::Tls(session),
                ..
            }) => session.peer_cert().map_err(Error::tls),
            _ => Ok(None),
        }
    }

    /// Wait until the tunnel is established, and return the proxy's
    /// reported binding.
    ///
    /// If negotiation fails (now or earlier), return the error.
    pub async fn ready(&mut self) -> Result<ResolvedBinding> {
        futures::future::poll_fn(|cx| self.poll_negotiation(cx)).await?;
        self.binding()
            .cloned()
            .ok_or(Error::Internal("established without a binding"))
    }

    /// Tear down the connection at once.
    ///
    /// The proxy stream (and the TLS session over it, if any) is
    /// dropped, any negotiation in progress is abandoned, and no further
    /// events are delivered.  Calling this again does nothing.
    pub fn dispose(&mut self) {
        if !matches!(self.state, ConnState::Disposed) {
            debug!("Disposing of SOCKS connection");
        }
        self.state = ConnState::Disposed;
        self.subscribers.clear();
    }

    /// Drive negotiation forward; return Ready(Ok) once data can flow.
    fn poll_negotiation(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let outcome = match &mut self.state {
            ConnState::Negotiating(fut) => futures::ready!(fut.as_mut().poll(cx)),
            ConnState::Streaming(_) => return Poll::Ready(Ok(())),
            ConnState::Failed(e) => return Poll::Ready(Err(e.clone())),
            ConnState::Disposed => return Poll::Ready(Err(Error::Disposed)),
        };
        match outcome {
            Ok((transport, binding)) => {
                info!("SOCKS tunnel established; proxy bound {}", binding);
                self.state = ConnState::Streaming(Streaming {
                    transport,
                    binding: binding.clone(),
                    read_eof: false,
                    write_closed: false,
                    close_reported: false,
                });
                emit(&mut self.subscribers, ConnEvent::Connect(binding));
                Poll::Ready(Ok(()))
            }
            Err(e) => {
                warn!("SOCKS negotiation failed: {}", e);
                self.state = ConnState::Failed(e.clone());
                emit(&mut self.subscribers, ConnEvent::Error(e.clone()));
                Poll::Ready(Err(e))
            }
        }
    }

    /// Record that the established tunnel failed with `e`.
    fn fail(&mut self, e: std::io::Error) -> std::io::Error {
        let err = Error::from(e);
        warn!("SOCKS tunnel failed: {}", err);
        self.state = ConnState::Failed(err.clone());
        emit(&mut self.subscribers, ConnEvent::Error(err.clone()));
        emit(&mut self.subscribers, ConnEvent::Close { had_error: true });
        err.into()
    }

    /// If both directions are finished, report the close (once).
    fn check_closed(&mut self) {
        if let ConnState::Streaming(st) = &mut self.state {
            if st.read_eof && st.write_closed && !st.close_reported {
                st.close_reported = true;
                debug!("SOCKS tunnel closed");
                emit(&mut self.subscribers, ConnEvent::Close { had_error: false });
            }
        }
    }
}

impl<S> AsyncRead for SocksConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<IoResult<usize>> {
        let this = self.get_mut();
        futures::ready!(this.poll_negotiation(cx))?;
        let allow_half_open = this.allow_half_open;
        let st = match &mut this.state {
            ConnState::Streaming(st) => st,
            _ => return Poll::Ready(Err(Error::Internal("not streaming after negotiation").into())),
        };
        if !st.read_eof {
            match futures::ready!(Pin::new(&mut st.transport).poll_read(cx, buf)) {
                Ok(0) if !buf.is_empty() => {
                    debug!("Remote side of SOCKS tunnel finished sending");
                    st.read_eof = true;
                }
                Ok(n) => return Poll::Ready(Ok(n)),
                Err(e) => return Poll::Ready(Err(this.fail(e))),
            }
        }
        if !allow_half_open && !st.write_closed {
            if let Err(e) = futures::ready!(Pin::new(&mut st.transport).poll_close(cx)) {
                debug!("Couldn't close our side after remote EOF: {}", e);
            }
            st.write_closed = true;
        }
        this.check_closed();
        Poll::Ready(Ok(0))
    }
}

impl<S> AsyncWrite for SocksConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<IoResult<usize>> {
        let this = self.get_mut();
        let st = match &mut this.state {
            ConnState::Streaming(st) => st,
            ConnState::Negotiating(_) => return Poll::Ready(Err(Error::NotConnected.into())),
            ConnState::Failed(_) => return Poll::Ready(Err(Error::NotConnected.into())),
            ConnState::Disposed => return Poll::Ready(Err(Error::Disposed.into())),
        };
        match futures::ready!(Pin::new(&mut st.transport).poll_write(cx, buf)) {
            Ok(n) => Poll::Ready(Ok(n)),
            Err(e) => Poll::Ready(Err(this.fail(e))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        let this = self.get_mut();
        if let ConnState::Streaming(st) = &mut this.state {
            if let Err(e) = futures::ready!(Pin::new(&mut st.transport).poll_flush(cx)) {
                return Poll::Ready(Err(this.fail(e)));
            }
        }
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        let this = self.get_mut();
        match &mut this.state {
            ConnState::Streaming(st) => {
                if !st.write_closed {
                    if let Err(e) = futures::ready!(Pin::new(&mut st.transport).poll_close(cx)) {
                        return Poll::Ready(Err(this.fail(e)));
                    }
                    st.write_closed = true;
                }
                this.check_closed();
            }
            ConnState::Negotiating(_) => this.dispose(),
            ConnState::Failed(_) | ConnState::Disposed => {}
        }
        Poll::Ready(Ok(()))
    }
}
