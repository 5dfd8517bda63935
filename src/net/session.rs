use crate::net::message::{MessagePart, OutboundMessage};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Per-observer outbound channel. Implementations must not block.
pub trait MessageSink: Send + Sync {
    fn send(&self, message: OutboundMessage);
}

/// Handle to a connected client, opaque to the world.
#[derive(Clone)]
pub struct Session {
    sink: Arc<dyn MessageSink>,
}

impl Session {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    pub fn send(&self, message: OutboundMessage) {
        if !message.is_empty() {
            self.sink.send(message);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Keeps every message it receives; used by tools and tests to observe the world.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn session(self: &Arc<Self>) -> Session {
        Session::new(self.clone())
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().clone()
    }

    pub fn take(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn parts(&self) -> Vec<MessagePart> {
        self.messages
            .lock()
            .iter()
            .flat_map(|message| message.parts.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl MessageSink for RecordingSink {
    fn send(&self, message: OutboundMessage) {
        self.messages.lock().push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::message::TextKind;

    #[test]
    fn empty_messages_are_not_delivered() {
        let sink = RecordingSink::new();
        let session = sink.session();
        session.send(OutboundMessage::new());
        assert!(sink.is_empty());
        session.send(OutboundMessage::single(OutboundMessage::text(TextKind::Info, "hi")));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }
}
