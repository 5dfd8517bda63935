use crate::entities::creature::CreatureId;
use crate::net::message::{MessagePart, OutboundMessage};
use crate::net::session::Session;
use crate::world::registry::CreatureRegistry;
use std::collections::BTreeMap;

/// Messages gathered for each observer while one world operation runs.
///
/// Nothing leaves the outbox until `deliver`, so every observer receives at
/// most one message per operation.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: BTreeMap<CreatureId, OutboundMessage>,
    /// Sessions of creatures that left the registry during the operation.
    departed: BTreeMap<CreatureId, Session>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, to: CreatureId, part: MessagePart) {
        self.messages.entry(to).or_default().push(part);
    }

    pub fn push_all(&mut self, to: &[CreatureId], part: &MessagePart) {
        for id in to {
            self.push(*id, part.clone());
        }
    }

    pub fn extend(&mut self, to: CreatureId, parts: impl IntoIterator<Item = MessagePart>) {
        let mut parts = parts.into_iter().peekable();
        if parts.peek().is_some() {
            self.messages.entry(to).or_default().extend(parts);
        }
    }

    /// Keeps a removed creature reachable until the outbox is delivered.
    pub fn keep_session(&mut self, id: CreatureId, session: Session) {
        self.departed.insert(id, session);
    }

    pub fn message_for(&self, id: CreatureId) -> Option<&OutboundMessage> {
        self.messages.get(&id)
    }

    pub fn recipients(&self) -> Vec<CreatureId> {
        self.messages.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Hands every message to its observer's session; returns how many were sent.
    pub fn deliver(self, creatures: &CreatureRegistry) -> usize {
        let mut sent = 0;
        for (id, message) in self.messages {
            if message.is_empty() {
                continue;
            }
            let session = creatures
                .get(id)
                .and_then(|creature| creature.session())
                .or_else(|| self.departed.get(&id));
            if let Some(session) = session {
                session.send(message);
                sent += 1;
            }
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::creature::Creature;
    use crate::entities::skills::Vocation;
    use crate::net::session::RecordingSink;
    use crate::world::position::Position;

    #[test]
    fn parts_for_one_observer_arrive_together() {
        let sink = RecordingSink::new();
        let player = Creature::player("Ann", Position::new(5, 5, 7), Vocation::None)
            .with_session(sink.session());
        let id = player.id;
        let mut creatures = CreatureRegistry::new();
        creatures.insert(player);

        let mut outbox = Outbox::new();
        outbox.push(id, MessagePart::CancelAttack);
        outbox.push(id, MessagePart::Icons(8));
        outbox.push(CreatureId(1), MessagePart::CancelAttack);
        assert_eq!(outbox.deliver(&creatures), 1);

        let messages = sink.take();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].parts.len(), 2);
    }

    #[test]
    fn departed_creatures_still_get_their_last_message() {
        let sink = RecordingSink::new();
        let mut outbox = Outbox::new();
        outbox.keep_session(CreatureId(3), sink.session());
        outbox.push(CreatureId(3), MessagePart::CancelAttack);
        assert_eq!(outbox.deliver(&CreatureRegistry::new()), 1);
        assert_eq!(sink.len(), 1);
    }
}
