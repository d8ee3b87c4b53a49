//! Fans out periodic snapshots to subscribed clients. Modeled as a
//! producer with N bounded mailboxes: `tokio::sync::broadcast` already
//! implements a bounded queue with oldest entries dropped under
//! back-pressure — a lagging receiver observes `Lagged(n)` and simply
//! resumes from the newest entry; dropped messages are never replayed.

use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PushKind {
    Metrics,
    Transactions,
    Health,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub kind: PushKind,
    pub data: serde_json::Value,
}

pub struct PushBroadcaster {
    sender: broadcast::Sender<PushMessage>,
}

impl PushBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushMessage> {
        self.sender.subscribe()
    }

    /// Best-effort: a send with no live subscribers is not an error.
    pub fn publish(&self, kind: PushKind, data: serde_json::Value) {
        let _ = self.sender.send(PushMessage { kind, data });
    }
}

impl Default for PushBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
