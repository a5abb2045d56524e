use crate::domains::message::Message;

/// Ordered, append-only transcript for the active session.
///
/// Carries no locking of its own; `ChatService` owns it behind a lock and a
/// writer gate.
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// The last `n` messages, or everything when `n` covers the whole transcript.
    pub fn tail(&self, n: usize) -> &[Message] {
        trailing(&self.messages, n)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// The last `n` entries of `messages`.
pub fn trailing(messages: &[Message], n: usize) -> &[Message] {
    &messages[messages.len().saturating_sub(n)..]
}
