//! Connected-character directory and best-effort delivery.
//!
//! Each connection hands over the sending half of its bounded outbound
//! queue at login. Delivery never blocks the game loop: a full queue or a
//! vanished connection drops the message, logs it, and bumps a counter.

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::game::protocol::ServerMessage;
use crate::game::resolver::OnlineName;
use crate::metrics;

/// Per-connection outbound queue depth. A client that stalls long enough to
/// fill this loses messages rather than stalling anyone else.
pub const OUTBOUND_QUEUE_DEPTH: usize = 128;

struct Entry {
    character_id: String,
    name: String,
    sender: mpsc::Sender<ServerMessage>,
}

/// Who is connected right now, and how to reach them. Registration order is
/// preserved and drives online listings.
#[derive(Default)]
pub struct PresenceDirectory {
    entries: Vec<Entry>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a character's delivery channel, replacing any stale entry
    /// for the same id.
    pub fn register(
        &mut self,
        character_id: &str,
        name: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) {
        self.entries.retain(|e| e.character_id != character_id);
        self.entries.push(Entry {
            character_id: character_id.to_string(),
            name: name.to_string(),
            sender,
        });
    }

    /// Safe to call for ids that were never registered.
    pub fn unregister(&mut self, character_id: &str) {
        self.entries.retain(|e| e.character_id != character_id);
    }

    pub fn is_registered(&self, character_id: &str) -> bool {
        self.entries.iter().any(|e| e.character_id == character_id)
    }

    pub fn online_count(&self) -> usize {
        self.entries.len()
    }

    /// Online characters in registration order.
    pub fn list_online(&self) -> Vec<OnlineName> {
        self.entries
            .iter()
            .map(|e| OnlineName {
                character_id: e.character_id.clone(),
                name: e.name.clone(),
            })
            .collect()
    }

    /// Best-effort delivery. A missing target or a full queue drops the
    /// message; neither is an error for the caller.
    pub fn send(&self, character_id: &str, message: ServerMessage) {
        match self.entries.iter().find(|e| e.character_id == character_id) {
            Some(entry) => deliver(entry, message),
            None => debug!("No delivery channel for {}; dropping message", character_id),
        }
    }

    /// Deliver to every registered channel, once each.
    pub fn send_to_all(&self, message: ServerMessage) {
        for entry in &self.entries {
            deliver(entry, message.clone());
        }
    }
}

fn deliver(entry: &Entry, message: ServerMessage) {
    match entry.sender.try_send(message) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            metrics::inc_sends_dropped();
            warn!(
                "Outbound queue full for {}; dropping message",
                entry.character_id
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            // The connection is mid-teardown; unregister will follow.
            metrics::inc_sends_dropped();
            debug!(
                "Outbound channel closed for {}; dropping message",
                entry.character_id
            );
        }
    }
}
