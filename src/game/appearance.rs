use super::notify::Outbox;
use super::World;
use crate::entities::creature::{CreatureId, Outfit};
use crate::error::GameResult;
use crate::net::message::MessagePart;
use crate::scheduler::task::GameTask;

impl World {
    pub fn change_outfit(&mut self, actor: CreatureId, outfit: Outfit) -> GameResult<()> {
        let creature = self.creature_mut(actor)?;
        creature.outfit = outfit;
        let position = creature.position;
        self.announce_outfit(actor, outfit, position);
        Ok(())
    }

    /// Shows `look_type` now and puts the current look back after `delay_ms`.
    pub fn change_outfit_after(&mut self, actor: CreatureId, look_type: u16, delay_ms: u64) -> GameResult<()> {
        let creature = self.creature_mut(actor)?;
        let previous = creature.outfit.look_type;
        creature.outfit.look_type = look_type;
        let (outfit, position) = (creature.outfit, creature.position);
        self.schedule(
            delay_ms,
            GameTask::ChangeOutfit {
                creature: actor,
                look_type: previous,
            },
        );
        self.announce_outfit(actor, outfit, position);
        Ok(())
    }

    pub(crate) fn restore_outfit(&mut self, id: CreatureId, look_type: u16) -> GameResult<()> {
        let Some(creature) = self.creatures.get_mut(id) else {
            return Ok(());
        };
        creature.outfit.look_type = look_type;
        let (outfit, position) = (creature.outfit, creature.position);
        self.announce_outfit(id, outfit, position);
        Ok(())
    }

    fn announce_outfit(&self, id: CreatureId, outfit: Outfit, position: crate::world::position::Position) {
        let mut outbox = Outbox::new();
        outbox.push_all(
            &self.spectators_of(position),
            &MessagePart::CreatureOutfit { creature: id, outfit },
        );
        outbox.deliver(&self.creatures);
    }

    /// Sets the walking speed. Ignored while a haste is running.
    pub fn change_speed(&mut self, actor: CreatureId, speed: u16) -> GameResult<()> {
        let creature = self.creature_mut(actor)?;
        if creature.timers.hasted() || creature.speed == speed {
            return Ok(());
        }
        creature.speed = speed;
        let position = creature.position;
        let mut outbox = Outbox::new();
        outbox.push_all(
            &self.spectators_of(position),
            &MessagePart::CreatureSpeed { creature: actor, speed },
        );
        outbox.deliver(&self.creatures);
        Ok(())
    }
}
