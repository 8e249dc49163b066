//! Types to implement the client side of a SOCKS5 handshake.

use crate::msg::{
    AuthMethod, MethodReply, ReplyHeader, ResolvedBinding, SocksAuth, SocksRequest, SocksStatus,
    UserPassReply, SOCKS_VERSION,
};
use crate::{Error, Result};

use socks_bytes::{Reader, Writer};

/// An ongoing SOCKS5 handshake, from the client's point of view.
///
/// To perform a handshake, call the [SocksClientHandshake::handshake]
/// method repeatedly with the bytes received from the proxy, until the
/// resulting [Action] has `finished` set to true.  The first call takes
/// no input at all: it produces the method-negotiation frame.
///
/// Each step needs an exact number of bytes, given by
/// [SocksClientHandshake::wants].  Callers that read from a stream can
/// ask for exactly that many; callers that already hold a buffer can
/// pass the whole thing and drain `action.drain` bytes from it.
#[derive(Clone, Debug)]
pub struct SocksClientHandshake {
    /// Current state of the handshake. Each completed message
    /// advances the state.
    state: State,
    /// Where we are asking the proxy to connect.
    request: SocksRequest,
    /// Credentials to offer.
    auth: SocksAuth,
    /// The proxy's bound address, once its reply has been decoded.
    binding: Option<ResolvedBinding>,
}

/// Possible states for the client side of a SOCKS5 connection.
///
/// States only move forward, in declaration order; any failure moves
/// to `Failed`, which is terminal.
#[derive(Clone, Debug, Copy, PartialEq)]
enum State {
    /// Starting state: nothing has been sent yet.
    Initial,
    /// We've sent our list of methods and wait for the proxy's choice.
    MethodSent,
    /// We've sent a username and password and wait for the verdict.
    AuthSent,
    /// We've sent the CONNECT request and wait for the reply header.
    RequestSent,
    /// We've read a successful reply header; the bound address follows.
    BoundAddr(BoundAddrState),
    /// Ending (successful) state: the tunnel is established.
    Done,
    /// Ending (failed) state.  The connection should be closed.
    Failed,
}

/// What remains to read of the bound address in a CONNECT reply.
#[derive(Clone, Debug, Copy, PartialEq)]
enum BoundAddrState {
    /// 4 address bytes and 2 port bytes.
    Ipv4,
    /// The one-byte length of a hostname.
    HostnameLen,
    /// A hostname of this many bytes, then 2 port bytes.
    Hostname(u8),
    /// 16 address bytes and 2 port bytes.
    Ipv6,
}

/// An action to take in response to a SOCKS handshake message.
#[derive(Clone, Debug)]
#[allow(clippy::exhaustive_structs)]
pub struct Action {
    /// If nonzero, this many bytes should be drained from the
    /// proxy's input.
    pub drain: usize,
    /// If nonempty, this message should be sent to the proxy.
    pub reply: Vec<u8>,
    /// If true, then this handshake is over, successfully.
    pub finished: bool,
}

impl SocksClientHandshake {
    /// Construct a new SocksClientHandshake in its initial state, to ask
    /// for `request` while offering `auth`.
    pub fn new(request: SocksRequest, auth: SocksAuth) -> Self {
        SocksClientHandshake {
            state: State::Initial,
            request,
            auth,
            binding: None,
        }
    }

    /// Return the number of proxy bytes the next step consumes.
    ///
    /// This is zero when nothing needs to be read: at the very start,
    /// and once the handshake is over.
    pub fn wants(&self) -> usize {
        use BoundAddrState as B;
        match self.state {
            State::Initial | State::Done | State::Failed => 0,
            State::MethodSent | State::AuthSent => 2,
            State::RequestSent => 4,
            State::BoundAddr(B::Ipv4) => 4 + 2,
            State::BoundAddr(B::HostnameLen) => 1,
            State::BoundAddr(B::Hostname(len)) => len as usize + 2,
            State::BoundAddr(B::Ipv6) => 16 + 2,
        }
    }

    /// Try to advance the handshake, given some proxy input in `input`.
    ///
    /// If there isn't enough input, gives [Error::Truncated] and changes
    /// nothing.  Other errors are fatal: the handshake can't continue,
    /// and the connection to the proxy should be closed.
    ///
    /// On success, return an Action describing what to send to the proxy,
    /// and how much of its input to consume.
    pub fn handshake(&mut self, input: &[u8]) -> Result<Action> {
        let wants = self.wants();
        match self.state {
            State::Done => return Err(Error::AlreadyFinished),
            State::Failed => return Err(Error::Syntax),
            _ => {}
        }
        if input.len() < wants {
            return Err(Error::Truncated);
        }
        let mut r = Reader::from_slice(&input[..wants]);

        let result = match self.state {
            State::Initial => Ok(self.initial()),
            State::MethodSent => self.method_reply(&mut r),
            State::AuthSent => self.userpass_reply(&mut r),
            State::RequestSent => self.reply_header(&mut r),
            State::BoundAddr(b) => self.bound_addr(b, &mut r),
            State::Done | State::Failed => Err(Error::AlreadyFinished),
        };

        match result {
            Ok(reply) => {
                debug_assert_eq!(r.remaining(), 0);
                Ok(Action {
                    drain: wants,
                    reply,
                    finished: self.state == State::Done,
                })
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Send our list of acceptable authentication methods.
    fn initial(&mut self) -> Vec<u8> {
        self.state = State::MethodSent;
        self.auth.method_request()
    }

    /// Handle the proxy's method selection.
    ///
    /// Only USERNAME_PASSWORD leads to a sub-negotiation.  Any other
    /// selection except NO_ACCEPTABLE is treated as "no authentication",
    /// even if we never offered it: proxies that do this work in
    /// practice.
    fn method_reply(&mut self, r: &mut Reader<'_>) -> Result<Vec<u8>> {
        let reply: MethodReply = r.extract()?;
        if reply.version != SOCKS_VERSION {
            return Err(Error::ProtocolVersionMismatch(reply.version));
        }
        match reply.method {
            AuthMethod::NO_ACCEPTABLE => Err(Error::NoAcceptableAuthMethod),
            AuthMethod::USERNAME_PASSWORD => {
                self.state = State::AuthSent;
                Ok(self.auth.userpass_request())
            }
            _ => Ok(self.connect_request()),
        }
    }

    /// Handle the proxy's verdict on our username and password.
    fn userpass_reply(&mut self, r: &mut Reader<'_>) -> Result<Vec<u8>> {
        let reply: UserPassReply = r.extract()?;
        if reply.status != 0 {
            return Err(Error::AuthenticationFailed);
        }
        Ok(self.connect_request())
    }

    /// Encode the CONNECT request, and wait for its reply.
    fn connect_request(&mut self) -> Vec<u8> {
        self.state = State::RequestSent;
        let mut w = Vec::new();
        w.write(&self.request);
        w
    }

    /// Handle the first four bytes of the CONNECT reply.
    ///
    /// A failure status ends the handshake here, without reading the
    /// address that follows it.
    fn reply_header(&mut self, r: &mut Reader<'_>) -> Result<Vec<u8>> {
        let header: ReplyHeader = r.extract()?;
        if header.status != SocksStatus::SUCCEEDED {
            return Err(Error::ServerError(header.status));
        }
        let next = match header.atyp {
            1 => BoundAddrState::Ipv4,
            3 => BoundAddrState::HostnameLen,
            4 => BoundAddrState::Ipv6,
            other => return Err(Error::UnsupportedAddressType(other)),
        };
        self.state = State::BoundAddr(next);
        Ok(Vec::new())
    }

    /// Handle (part of) the bound address in the CONNECT reply.
    fn bound_addr(&mut self, b: BoundAddrState, r: &mut Reader<'_>) -> Result<Vec<u8>> {
        let binding = match b {
            BoundAddrState::HostnameLen => {
                let len = r.take_u8()?;
                self.state = State::BoundAddr(BoundAddrState::Hostname(len));
                return Ok(Vec::new());
            }
            BoundAddrState::Hostname(len) => ResolvedBinding::take_hostname(len, r)?,
            BoundAddrState::Ipv4 => ResolvedBinding::take_ipv4(r)?,
            BoundAddrState::Ipv6 => ResolvedBinding::take_ipv6(r)?,
        };
        self.binding = Some(binding);
        self.state = State::Done;
        Ok(Vec::new())
    }

    /// Return true if this handshake is finished successfully.
    pub fn finished(&self) -> bool {
        self.state == State::Done
    }

    /// Return the address the proxy bound for us, if the handshake has
    /// finished.
    pub fn binding(&self) -> Option<&ResolvedBinding> {
        self.binding.as_ref()
    }

    /// Consume this handshake's state; if it finished successfully,
    /// return the address the proxy bound for us.
    pub fn into_binding(self) -> Option<ResolvedBinding> {
        self.binding
    }
}
