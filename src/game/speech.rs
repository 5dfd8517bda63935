use super::bans::{MASK_EXACT, MASK_RANGE};
use super::notify::Outbox;
use super::World;
use crate::combat::magic::{MagicEffect, ME_MAGIC_BLOOD, TEXT_COLOR_PHYSICAL};
use crate::entities::creature::{Creature, CreatureId};
use crate::error::{GameError, GameResult};
use crate::net::message::{MessagePart, SpeechKind};
use crate::world::position::{Range, VIEW_RANGE_X, VIEW_RANGE_Y};

/// How a line typed by a creature was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    Spoken,
    Command,
    Spell,
}

const WHISPER_NOISE: &str = "pspsps";

impl World {
    /// Says `text` aloud, or runs it as a command or spell.
    pub fn say(&mut self, actor: CreatureId, text: &str) -> GameResult<SpeechOutcome> {
        let creature = self.creature(actor)?;
        if text.starts_with('/') && creature.is_privileged() {
            self.run_command(actor, text)?;
            return Ok(SpeechOutcome::Command);
        }
        if self.say_spell(actor, text)? {
            return Ok(SpeechOutcome::Spell);
        }
        let position = self.creature(actor)?.position;
        self.speak(actor, SpeechKind::Say, text, &Range::around(position, false));
        Ok(SpeechOutcome::Spoken)
    }

    /// Listeners next to the speaker hear the words, the rest only noise.
    pub fn whisper(&mut self, actor: CreatureId, text: &str) -> GameResult<()> {
        let speaker = self.creature(actor)?;
        let position = speaker.position;
        let name = speaker.name.clone();
        let mut outbox = Outbox::new();
        for listener in self.spectators_in(&Range::around(position, false), position) {
            let close = self
                .creatures
                .get(listener)
                .map(|creature| creature.position.within(position, 1, 1))
                .unwrap_or(false);
            let heard = if close { text } else { WHISPER_NOISE };
            outbox.push(
                listener,
                MessagePart::CreatureSay {
                    speaker: actor,
                    name: name.clone(),
                    kind: SpeechKind::Whisper,
                    position,
                    text: heard.to_string(),
                },
            );
        }
        outbox.deliver(&self.creatures);
        Ok(())
    }

    /// Shouts `text` in capitals across twice the normal range.
    pub fn yell(&mut self, actor: CreatureId, text: &str) -> GameResult<()> {
        let rules = &self.settings.combat;
        let (exhausted_ms, exhausted_add_ms) = (rules.exhausted_ms, rules.exhausted_add_ms);
        let creature = self.creature_mut(actor)?;
        if creature.is_player() && !creature.is_privileged() {
            if creature.timers.exhausted() {
                creature.timers.exhausted_ms += exhausted_add_ms;
                return Err(GameError::Exhausted);
            }
            creature.timers.exhausted_ms = exhausted_ms;
        }
        let position = creature.position;
        let range = Range::with_extent(
            position,
            2 * VIEW_RANGE_X,
            2 * VIEW_RANGE_X,
            2 * VIEW_RANGE_Y,
            2 * VIEW_RANGE_Y,
            false,
        );
        self.speak(actor, SpeechKind::Yell, &text.to_uppercase(), &range);
        Ok(())
    }

    fn speak(&self, actor: CreatureId, kind: SpeechKind, text: &str, range: &Range) {
        let Some(speaker) = self.creatures.get(actor) else {
            return;
        };
        let part = MessagePart::CreatureSay {
            speaker: actor,
            name: speaker.name.clone(),
            kind,
            position: speaker.position,
            text: text.to_string(),
        };
        let mut outbox = Outbox::new();
        outbox.push_all(&self.map.spectators(range), &part);
        outbox.deliver(&self.creatures);
    }

    /// Private message to the creature called `receiver`.
    pub fn speak_to(&mut self, actor: CreatureId, receiver: &str, text: &str) -> GameResult<()> {
        let speaker = self.creature(actor)?;
        let listener = self.creatures.by_name(receiver).ok_or(GameError::NotPossible)?;
        let mut outbox = Outbox::new();
        outbox.push(
            listener.id,
            MessagePart::CreatureSay {
                speaker: actor,
                name: speaker.name.clone(),
                kind: SpeechKind::Private,
                position: speaker.position,
                text: text.to_string(),
            },
        );
        outbox.deliver(&self.creatures);
        Ok(())
    }

    /// Tells every online player. Privileged speakers only.
    pub fn broadcast(&mut self, actor: CreatureId, text: &str) -> GameResult<()> {
        let speaker = self.creature(actor)?;
        if !speaker.is_privileged() {
            return Err(GameError::Rejected);
        }
        let part = MessagePart::CreatureSay {
            speaker: actor,
            name: speaker.name.clone(),
            kind: SpeechKind::Broadcast,
            position: speaker.position,
            text: text.to_string(),
        };
        let players: Vec<CreatureId> = self.creatures.players().map(|player| player.id).collect();
        let mut outbox = Outbox::new();
        outbox.push_all(&players, &part);
        outbox.deliver(&self.creatures);
        tracing::info!(speaker = %speaker.name, text, "broadcast");
        Ok(())
    }

    pub fn join_channel(&mut self, actor: CreatureId, channel: u16) -> GameResult<()> {
        self.creature(actor)?;
        self.channels.entry(channel).or_default().insert(actor);
        Ok(())
    }

    pub fn leave_channel(&mut self, actor: CreatureId, channel: u16) -> GameResult<()> {
        let members = self.channels.get_mut(&channel).ok_or(GameError::NotPossible)?;
        if !members.remove(&actor) {
            return Err(GameError::NotPossible);
        }
        if members.is_empty() {
            self.channels.remove(&channel);
        }
        Ok(())
    }

    pub fn channel_say(&mut self, actor: CreatureId, channel: u16, text: &str) -> GameResult<()> {
        let speaker = self.creature(actor)?.name.clone();
        let members = self.channels.get(&channel).ok_or(GameError::Rejected)?;
        if !members.contains(&actor) {
            return Err(GameError::Rejected);
        }
        let recipients: Vec<CreatureId> = members.iter().copied().collect();
        let mut outbox = Outbox::new();
        outbox.push_all(
            &recipients,
            &MessagePart::ChannelMessage {
                channel,
                speaker,
                text: text.to_string(),
            },
        );
        outbox.deliver(&self.creatures);
        Ok(())
    }

    /// Privileged `/x argument` commands.
    fn run_command(&mut self, actor: CreatureId, text: &str) -> GameResult<()> {
        let (command, argument) = match text.split_once(' ') {
            Some((command, argument)) => (command, argument.trim()),
            None => (text, ""),
        };
        tracing::info!(actor = actor.0, command, argument, "privileged command");
        match command {
            "/s" => {
                let speaker = self.creature(actor)?;
                let front = speaker
                    .position
                    .step(speaker.direction)
                    .ok_or(GameError::Rejected)?;
                self.place_creature(Creature::npc(argument, front)).map(|_| ())
            }
            "/b" => self.smite(actor, argument, MASK_EXACT),
            "/r" => self.smite(actor, argument, MASK_RANGE),
            "/t" => {
                let temple = self.creature(actor)?.master_position;
                self.teleport(actor, temple).map(|_| ())
            }
            "/c" => {
                let target = self.named(argument)?;
                let destination = self.creature(actor)?.position;
                self.teleport(target, destination).map(|_| ())
            }
            _ => Err(GameError::Rejected),
        }
    }

    fn named(&self, name: &str) -> GameResult<CreatureId> {
        self.creatures
            .by_name(name)
            .map(|creature| creature.id)
            .ok_or(GameError::NotPossible)
    }

    /// Kills `name` outright and bans its address under `mask`.
    fn smite(&mut self, actor: CreatureId, name: &str, mask: u32) -> GameResult<()> {
        let id = self.named(name)?;
        let target = self.creature(id)?;
        if target.access >= self.creature(actor)?.access {
            return Err(GameError::TargetPrivileged);
        }
        let damage = target.stats.health.saturating_add(target.stats.mana);
        let ip = target.player_data().map(|player| player.ip).unwrap_or(0);
        let effect = MagicEffect::fixed(damage, ME_MAGIC_BLOOD, TEXT_COLOR_PHYSICAL);
        self.hit_from_world(Some(actor), id, &effect)?;
        if ip != 0 {
            self.bans.ban(ip, mask);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::skills::Vocation;
    use crate::game::testing::{floor, world_with_map};
    use crate::net::session::RecordingSink;
    use crate::world::position::Position;

    fn at(x: u16, y: u16) -> Position {
        Position::new(x, y, 7)
    }

    #[test]
    fn whisper_is_noise_from_afar() {
        let (mut world, _clock) = world_with_map(floor());
        let near = RecordingSink::new();
        let far = RecordingSink::new();
        let speaker = Creature::player("Speaker", at(105, 105), Vocation::None);
        let id = speaker.id;
        world.place_creature(speaker).expect("speaker");
        world
            .place_creature(Creature::player("Near", at(106, 105), Vocation::None).with_session(near.session()))
            .expect("near");
        world
            .place_creature(Creature::player("Far", at(109, 105), Vocation::None).with_session(far.session()))
            .expect("far");
        near.clear();
        far.clear();

        world.whisper(id, "secret").expect("whispered");
        assert!(matches!(&near.parts()[0], MessagePart::CreatureSay { text, .. } if text == "secret"));
        assert!(matches!(&far.parts()[0], MessagePart::CreatureSay { text, .. } if text == WHISPER_NOISE));
    }

    #[test]
    fn yelling_twice_in_a_row_exhausts() {
        let (mut world, _clock) = world_with_map(floor());
        let hero = Creature::player("Hero", at(105, 105), Vocation::None);
        let id = hero.id;
        world.place_creature(hero).expect("placed");
        world.yell(id, "hey").expect("first");
        assert_eq!(world.yell(id, "hey"), Err(GameError::Exhausted));
        assert_eq!(world.creature(id).expect("hero").timers.exhausted_ms, 3000);
    }

    #[test]
    fn ban_command_kills_and_bans() {
        let (mut world, _clock) = world_with_map(floor());
        let gm = Creature::player("Gm", at(105, 105), Vocation::None).with_access(3);
        let gm_id = gm.id;
        let mut cheat = Creature::player("Cheat", at(120, 120), Vocation::None);
        if let Some(player) = cheat.player_data_mut() {
            player.ip = 0x0700_000A;
        }
        let cheat_id = cheat.id;
        world.place_creature(gm).expect("gm");
        world.place_creature(cheat).expect("cheat");

        assert_eq!(world.say(gm_id, "/b cheat"), Ok(SpeechOutcome::Command));
        assert!(!world.creatures.contains(cheat_id));
        assert!(world.bans.is_banned(0x0700_000A));
        assert!(!world.bans.is_banned(0x0800_000A));
    }

    #[test]
    fn channel_members_only() {
        let (mut world, _clock) = world_with_map(floor());
        let sink = RecordingSink::new();
        let hero = Creature::player("Hero", at(105, 105), Vocation::None).with_session(sink.session());
        let id = hero.id;
        world.place_creature(hero).expect("placed");
        assert_eq!(world.channel_say(id, 4, "hi"), Err(GameError::Rejected));
        world.join_channel(id, 4).expect("joined");
        sink.clear();
        world.channel_say(id, 4, "hi").expect("said");
        assert!(matches!(&sink.parts()[0], MessagePart::ChannelMessage { text, .. } if text == "hi"));
        world.leave_channel(id, 4).expect("left");
        assert_eq!(world.channel_say(id, 4, "hi"), Err(GameError::Rejected));
    }
}
