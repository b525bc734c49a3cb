use crate::types::Sequence;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::SystemTime;

/// An event dispatched by a probe session to its consumer.
///
/// Events referencing a sequence number never imply anything about the state
/// of that probe; interpreting them is the orchestrator's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The target resolved and the channel opened.
    Started { addr: IpAddr },
    /// One echo request was transmitted.
    Sent { sequence: Sequence },
    /// An echo request could not be transmitted.
    SendFailed { sequence: Sequence, error: String },
    /// An echo reply matching the session identifier arrived.
    ReplyReceived {
        sequence: Sequence,
        from: IpAddr,
        received: SystemTime,
    },
    /// An inbound packet that is not a reply to this session. Informational,
    /// never treated as a reply.
    UnexpectedPacket { from: IpAddr },
    /// The session failed and will produce no further events.
    Failed { error: String },
}

/// The consumer of session events.
///
/// Invoked from the session's calling thread for `Started`, `Sent` and
/// `SendFailed`, and from the receive loop for the rest.
pub type EventHandler = Arc<dyn Fn(SessionEvent) + Send + Sync>;
