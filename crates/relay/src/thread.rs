use std::sync::{Arc, Mutex};

use crate::models::message::Message;

/// Append-only message history shared between agents in a pipeline.
///
/// The thread is a cheap cloneable handle; all clones observe the same
/// history. Appends go through `push`/`extend` under one lock acquisition,
/// so a concurrent reader never sees a partially appended tool round.
/// Messages are never reordered or mutated in place.
#[derive(Debug, Clone, Default)]
pub struct ConversationThread {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl ConversationThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single message.
    pub fn push(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }

    /// Append a batch of messages atomically. Used for tool rounds, which
    /// must land in the thread all-or-nothing.
    pub fn extend(&self, messages: Vec<Message>) {
        self.messages.lock().unwrap().extend(messages);
    }

    /// Snapshot of the current history, in insertion order. This is the
    /// literal context sent to the completion provider.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
