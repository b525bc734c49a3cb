use crate::config::SessionConfig;
use crate::dns;
use crate::error::{Error, Result};
use crate::event::{EventHandler, SessionEvent};
use crate::net::channel::Channel;
use crate::net::SocketImpl;
use crate::probe::Response;
use crate::types::{Sequence, SessionId};
use std::net::IpAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::instrument;

/// The lifecycle state of a probe session.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SessionState {
    /// Created, not yet started.
    Idle,
    /// Resolving the target name.
    Resolving,
    /// Channel open, no probe sent yet.
    Open,
    /// At least one probe sent.
    Active,
    /// Stopped; the channel is closed and sends are rejected.
    Closed,
    /// Resolution or socket acquisition failed.
    Failed,
}

/// A probing session for a single destination.
///
/// Owns one [`Channel`] and a random 16-bit identifier, and dispatches typed
/// [`SessionEvent`]s to a single consumer. The session never interprets
/// replies beyond the identifier check; correlating them with outstanding
/// probes is the orchestrator's job.
pub struct ProbeSession {
    target: String,
    identifier: SessionId,
    config: SessionConfig,
    state: SessionState,
    channel: Option<Arc<Channel<SocketImpl>>>,
    peer_addr: Option<IpAddr>,
    handler: EventHandler,
    receiver: Option<JoinHandle<()>>,
}

impl ProbeSession {
    /// Create an idle session for a target host name or address literal.
    #[must_use]
    pub fn new(target: impl Into<String>, config: SessionConfig, handler: EventHandler) -> Self {
        Self {
            target: target.into(),
            identifier: SessionId(rand::random()),
            config,
            state: SessionState::Idle,
            channel: None,
            peer_addr: None,
            handler,
            receiver: None,
        }
    }

    /// The session identifier carried by every probe.
    #[must_use]
    pub const fn identifier(&self) -> SessionId {
        self.identifier
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The resolved peer address, once started.
    #[must_use]
    pub const fn peer_addr(&self) -> Option<IpAddr> {
        self.peer_addr
    }

    /// Resolve the target and open the channel.
    ///
    /// This is the only place name resolution occurs. Emits
    /// `Started(addr)` on success or `Failed` on either resolution or
    /// socket acquisition failure, both of which are fatal for the session.
    #[instrument(skip(self), fields(target = %self.target), level = "debug")]
    pub fn start(&mut self) -> Result<IpAddr> {
        if self.state != SessionState::Idle {
            return Err(Error::SessionClosed);
        }
        self.state = SessionState::Resolving;
        let addr = match dns::resolve(&self.target) {
            Ok(addr) => addr,
            Err(err) => return Err(self.fail(err)),
        };
        let channel = match Channel::open(addr, self.identifier, &self.config) {
            Ok(channel) => Arc::new(channel),
            Err(err) => return Err(self.fail(err)),
        };
        self.receiver = Some(spawn_receiver(
            channel.clone(),
            self.identifier,
            self.handler.clone(),
        )?);
        self.channel = Some(channel);
        self.peer_addr = Some(addr);
        self.state = SessionState::Open;
        self.dispatch(SessionEvent::Started { addr });
        Ok(addr)
    }

    /// Encode and transmit a single echo request.
    ///
    /// A transport failure is reported as `SendFailed` and returned, but
    /// does not close the session; whether to continue is the caller's
    /// decision.
    #[instrument(skip(self), level = "trace")]
    pub fn send_probe(&mut self, sequence: Sequence) -> Result<()> {
        let channel = match (self.state, &self.channel) {
            (SessionState::Open | SessionState::Active, Some(channel)) => channel.clone(),
            _ => return Err(Error::SessionClosed),
        };
        match channel.send_probe(self.identifier, sequence, self.config.payload_size) {
            Ok(()) => {
                self.state = SessionState::Active;
                self.dispatch(SessionEvent::Sent { sequence });
                Ok(())
            }
            Err(err) => {
                self.dispatch(SessionEvent::SendFailed {
                    sequence,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Stop the session.
    ///
    /// Closes the channel, which the receive loop observes and exits, then
    /// joins it. Idempotent; subsequent sends return [`Error::SessionClosed`].
    #[instrument(skip(self), level = "debug")]
    pub fn stop(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        if let Some(receiver) = self.receiver.take() {
            if receiver.join().is_err() {
                tracing::debug!("receive loop panicked");
            }
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        self.state = SessionState::Failed;
        self.dispatch(SessionEvent::Failed {
            error: err.to_string(),
        });
        err
    }

    fn dispatch(&self, event: SessionEvent) {
        (self.handler)(event);
    }
}

impl Drop for ProbeSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_receiver(
    channel: Arc<Channel<SocketImpl>>,
    identifier: SessionId,
    handler: EventHandler,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("echoprobe-recv-{}", identifier.0))
        .spawn(move || receive_loop(&channel, identifier, &handler))
        .map_err(|err| Error::Other(err.to_string()))
}

/// Drain the socket until the channel is closed.
///
/// A read error on a live channel is reported once as `Failed` and ends the
/// loop; after `close()` the same error is the expected wakeup and stays
/// silent.
fn receive_loop(channel: &Channel<SocketImpl>, identifier: SessionId, handler: &EventHandler) {
    while !channel.is_closed() {
        match channel.recv_response() {
            Ok(Some(response)) => handler(classify_response(identifier, response)),
            Ok(None) => {}
            Err(err) => {
                if !channel.is_closed() {
                    tracing::debug!(%err, "receive loop terminated");
                    handler(SessionEvent::Failed {
                        error: err.to_string(),
                    });
                }
                break;
            }
        }
    }
}

/// Decide what an inbound response means to this session.
///
/// Only an echo reply carrying our own identifier is a reply; everything
/// else is cross-talk from other processes or hosts sharing the socket.
fn classify_response(identifier: SessionId, response: Response) -> SessionEvent {
    match response {
        Response::EchoReply(data) if data.identifier == identifier.0 => {
            SessionEvent::ReplyReceived {
                sequence: Sequence(data.sequence),
                from: data.addr,
                received: data.recv,
            }
        }
        Response::EchoReply(data) => SessionEvent::UnexpectedPacket { from: data.addr },
        Response::TimeExceeded { addr } | Response::Other { addr, .. } => {
            SessionEvent::UnexpectedPacket { from: addr }
        }
    }
}
