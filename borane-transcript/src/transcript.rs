use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::content::Part;
use crate::message::{Message, MessageId, Role};

/// Ordered, append-only list of messages for one flow.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message, stamping it with a fresh id and the current time.
    pub fn append(&mut self, role: Role, parts: Vec<Part>) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;

        self.messages.push(Message {
            id,
            role,
            parts,
            created_at_ms: now_ms(),
        });
        id
    }

    /// Discards every message, releasing each media handle they own first.
    ///
    /// Returns the number of handles released. Ids keep increasing across
    /// clears so a stale id never matches a newer message.
    pub fn clear(&mut self) -> usize {
        let mut released = 0;
        for message in self.messages.drain(..) {
            for part in message.parts {
                if let Part::Video(video) = part {
                    video.handle.release();
                    released += 1;
                }
            }
        }
        if released > 0 {
            debug!(released, "cleared transcript");
        }
        released
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of media handles currently owned by this transcript.
    pub fn handle_count(&self) -> usize {
        self.messages
            .iter()
            .flat_map(|m| m.parts.iter())
            .filter(|p| matches!(p, Part::Video(_)))
            .count()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
