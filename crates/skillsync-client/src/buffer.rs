//! Ordered in-memory message history.

use skillsync_core::Message;
use tokio::sync::watch;

/// Append-only sequence of messages for the current channel scope.
///
/// Insertion order is the only ordering guarantee: nothing is re-sorted by
/// timestamp and nothing is deduplicated, so the server echo of an optimistic
/// send shows up as a second entry. Every change bumps a revision counter
/// that subscribers can wait on before re-reading the snapshot.
#[derive(Debug)]
pub struct MessageBuffer {
    messages: Vec<Message>,
    revision: watch::Sender<u64>,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuffer {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            messages: Vec::new(),
            revision,
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.bump();
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.bump();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Change signal; the value is the revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}

impl<'a> IntoIterator for &'a MessageBuffer {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
