//! Event fan-out to connected sessions
//!
//! A single `tokio::sync::broadcast` channel carries every outbound event
//! tagged with its audience. Each session task subscribes and forwards the
//! envelopes addressed to it. Publishing never blocks: a session that falls
//! more than `capacity` events behind skips the oldest ones.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::protocol::ServerEvent;

/// Identifier of one connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who should receive an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Session(SessionId),
}

impl Target {
    pub fn includes(&self, session: SessionId) -> bool {
        match self {
            Target::All => true,
            Target::Session(id) => *id == session,
        }
    }
}

/// Event plus audience
#[derive(Debug, Clone)]
pub struct Envelope {
    pub target: Target,
    pub event: ServerEvent,
}

/// Publisher side of the session fan-out
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<Envelope>,
    next_session: Arc<AtomicU64>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate a fresh session id
    pub fn next_session_id(&self) -> SessionId {
        SessionId(self.next_session.fetch_add(1, Ordering::Relaxed))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Fire-and-forget publish; having no subscribers is not an error
    pub fn publish(&self, target: Target, event: ServerEvent) {
        crate::log_trace!("publish {} to {:?}", event.name(), target);
        let _ = self.tx.send(Envelope { target, event });
    }

    pub fn broadcast(&self, event: ServerEvent) {
        self.publish(Target::All, event);
    }

    pub fn send_to(&self, session: SessionId, event: ServerEvent) {
        self.publish(Target::Session(session), event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
