//! Cross-window invalidation channel.
//!
//! Every window of one profile holds a clone of the same [`WindowChannel`].
//! Messages only say that a table changed; a receiver pulls the snapshot from
//! the block store itself.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::Table;

/// Default channel capacity. A window that falls further behind than this
/// does a full refresh instead of replaying messages.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Identity of one window (one `Store` instance).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl WindowId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Wire message. Serializes as `{"type":"DB_UPDATE","table":"posts"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WindowMessage {
    #[serde(rename = "DB_UPDATE")]
    DbUpdate { table: Table },
}

/// A message plus the window that sent it.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub origin: WindowId,
    pub message: WindowMessage,
}

/// What a listener yields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Incoming {
    Message(WindowMessage),
    /// This many messages were dropped because the listener fell behind.
    Lagged(u64),
}

/// Broadcast channel shared by all windows of one profile.
#[derive(Clone, Debug)]
pub struct WindowChannel {
    sender: broadcast::Sender<Envelope>,
}

impl WindowChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send to every other window. Returns how many listeners were reached.
    pub fn post(&self, origin: WindowId, message: WindowMessage) -> usize {
        // No listeners is fine: this may be the only window.
        self.sender.send(Envelope { origin, message }).unwrap_or(0)
    }

    /// Start listening on behalf of `me`. Messages `me` posted are skipped.
    pub fn listen(&self, me: WindowId) -> WindowListener {
        WindowListener {
            receiver: self.sender.subscribe(),
            me,
        }
    }
}

impl Default for WindowChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Receiving side of a [`WindowChannel`] for one window.
pub struct WindowListener {
    receiver: broadcast::Receiver<Envelope>,
    me: WindowId,
}

impl WindowListener {
    /// Wait for the next message from another window. `None` once every
    /// sender is gone.
    pub async fn recv(&mut self) -> Option<Incoming> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.origin == self.me => continue,
                Ok(envelope) => return Some(Incoming::Message(envelope.message)),
                Err(broadcast::error::RecvError::Lagged(n)) => return Some(Incoming::Lagged(n)),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). `None` if nothing is queued.
    pub fn try_recv(&mut self) -> Option<Incoming> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if envelope.origin == self.me => continue,
                Ok(envelope) => return Some(Incoming::Message(envelope.message)),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Incoming::Lagged(n))
                }
                Err(_) => return None,
            }
        }
    }
}
