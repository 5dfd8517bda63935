use super::notify::Outbox;
use super::World;
use crate::combat::magic::MagicEffect;
use crate::entities::creature::{CreatureId, CreatureKind};
use crate::entities::item::ItemId;
use crate::error::GameResult;
use crate::net::message::{MessagePart, OutboundMessage, TextKind};
use crate::scheduler::task::GameTask;
use crate::world::position::{Position, Range};

impl World {
    /// The creature heartbeat. Re-arms itself while the creature stays placed.
    pub(crate) fn check_creature(&mut self, id: CreatureId, placement: u32) -> GameResult<()> {
        let Some(creature) = self.placed(id, placement) else {
            return Ok(());
        };
        if creature.is_player() {
            self.player_heartbeat(id);
        } else {
            self.creature_heartbeat(id);
        }
        if let Some(creature) = self.creatures.get(id) {
            let interval = if creature.is_player() {
                self.settings.heartbeat.player_ms
            } else {
                self.settings.heartbeat.creature_ms
            };
            self.schedule(interval, GameTask::CheckCreature(id, placement));
        }
        Ok(())
    }

    fn player_heartbeat(&mut self, id: CreatureId) {
        let elapsed = self.settings.heartbeat.player_ms as i64;
        let regen = self.settings.regen.clone();
        let Some(creature) = self.creatures.get_mut(id) else {
            return;
        };
        let mut parts = Vec::new();
        let mut changed = false;

        if creature.is_alive() {
            changed |= creature.stats.regenerate_mana(regen.mana) > 0;
            changed |= creature.stats.heal(regen.health) > 0;
        }

        let experience = creature.experience;
        let privileged = creature.is_privileged();
        let mut leveled = false;
        if let Some(player) = creature.player.as_deref_mut() {
            while let Some((advance, gain)) = player.try_level_up(experience) {
                let stats = &mut creature.stats;
                stats.max_health = stats.max_health.saturating_add(gain.health);
                stats.health = stats.health.saturating_add(gain.health);
                stats.max_mana = stats.max_mana.saturating_add(gain.mana);
                stats.mana = stats.mana.saturating_add(gain.mana);
                stats.capacity = stats.capacity.saturating_add(gain.capacity);
                parts.push(OutboundMessage::text(
                    TextKind::Advance,
                    format!("You advanced from level {} to level {}.", advance.from, advance.to),
                ));
                tracing::info!(player = %creature.name, level = advance.to, "level advanced");
                leveled = true;
            }
            if !privileged {
                while let Some(advance) = player.try_magic_level_up() {
                    parts.push(OutboundMessage::text(
                        TextKind::Advance,
                        format!(
                            "You advanced from magic level {} to magic level {}.",
                            advance.from, advance.to
                        ),
                    ));
                    tracing::info!(player = %creature.name, magic_level = advance.to, "magic level advanced");
                    changed = true;
                }
            }
        }

        let mut speed_changed = false;
        if leveled {
            changed = true;
            let bonus = creature.speed.saturating_sub(creature.base_speed);
            creature.base_speed = creature.normal_speed();
            creature.speed = creature.base_speed.saturating_add(bonus);
            speed_changed = true;
        }

        let icons_before = creature.icons();
        let expiry = creature.timers.tick(elapsed);
        if expiry.haste_ended {
            creature.speed = creature.base_speed;
            speed_changed = true;
        }
        let ticks = creature.conditions.advance(elapsed);
        let (position, speed) = (creature.position, creature.speed);

        let mut outbox = Outbox::new();
        if speed_changed {
            outbox.push_all(
                &self.spectators_of(position),
                &MessagePart::CreatureSpeed { creature: id, speed },
            );
        }
        outbox.extend(id, parts);
        if let Some(creature) = self.creatures.get(id) {
            if creature.icons() != icons_before {
                outbox.push(id, MessagePart::Icons(creature.icons()));
            }
        }
        if changed {
            if let Some(stats) = self.stats_of(id) {
                outbox.push(id, stats);
            }
        }
        outbox.deliver(&self.creatures);

        self.apply_condition_ticks(id, ticks);
    }

    fn creature_heartbeat(&mut self, id: CreatureId) {
        self.think(id);
        let elapsed = self.settings.heartbeat.creature_ms as i64;
        let Some(creature) = self.creatures.get_mut(id) else {
            return;
        };
        let expiry = creature.timers.tick_simple(elapsed);
        let ticks = creature.conditions.advance(elapsed);
        if expiry.haste_ended {
            creature.speed = creature.base_speed;
            let (position, speed) = (creature.position, creature.speed);
            let mut outbox = Outbox::new();
            outbox.push_all(
                &self.spectators_of(position),
                &MessagePart::CreatureSpeed { creature: id, speed },
            );
            outbox.deliver(&self.creatures);
        }
        self.apply_condition_ticks(id, ticks);
    }

    /// Monster targeting: keep a live target, otherwise pick the closest
    /// ordinary player in engagement range standing outside a protection zone.
    fn think(&mut self, id: CreatureId) {
        let Some(creature) = self.creatures.get(id) else {
            return;
        };
        if creature.kind != CreatureKind::Monster || !creature.is_alive() {
            return;
        }
        if creature
            .attack_target
            .is_some_and(|target| self.creatures.contains(target))
        {
            return;
        }
        let position = creature.position;
        let rules = &self.settings.combat;
        let (range_x, range_y) = (rules.engagement_range_x, rules.engagement_range_y);
        let range = Range::with_extent(position, range_x, range_x, range_y, range_y, false);
        let target = self
            .map
            .spectators(&range)
            .into_iter()
            .filter_map(|other| self.creatures.get(other))
            .filter(|other| other.is_player() && !other.is_privileged() && other.is_alive())
            .filter(|other| !self.map.is_protection_zone(other.position))
            .min_by_key(|other| (position.distance(other.position), other.id))
            .map(|other| other.id);
        if let Some(creature) = self.creatures.get_mut(id) {
            if creature.attack_target != target {
                tracing::debug!(monster = id.0, target = ?target.map(|t| t.0), "target chosen");
            }
            creature.attack_target = target;
        }
    }

    /// Deals each fired damage-over-time tick through the combat engine.
    fn apply_condition_ticks(&mut self, id: CreatureId, ticks: Vec<crate::combat::conditions::ConditionTick>) {
        for tick in ticks {
            if !self.creatures.contains(id) {
                break;
            }
            let owner = tick.owner.filter(|owner| self.creatures.contains(*owner));
            let effect = MagicEffect::condition_tick(tick.kind, tick.damage);
            if let Err(error) = self.hit_from_world(owner, id, &effect) {
                tracing::debug!(creature = id.0, %error, "condition tick had no effect");
            }
        }
    }

    /// Advances or removes a decaying item. Stale commands are ignored.
    pub(crate) fn decay_item(&mut self, position: Position, item: ItemId) -> GameResult<()> {
        let Some(tile) = self.map.tile_mut(position) else {
            return Ok(());
        };
        let part = if tile.field.as_ref().map(|field| field.id) == Some(item) {
            let stackpos = tile.field_stackpos();
            let Some(field) = tile.field.as_mut() else {
                return Ok(());
            };
            if field.advance_field_stage() {
                let stage_ms = field.as_field().map(|data| data.stage_ms).unwrap_or(0);
                self.schedule(stage_ms, GameTask::DecayItem { position, item });
                return Ok(());
            }
            tile.field = None;
            stackpos.map(|stackpos| MessagePart::RemoveThing { position, stackpos })
        } else {
            let Some(stackpos) = tile.item_stackpos(item) else {
                return Ok(());
            };
            let Some(type_id) = tile.item_at(stackpos).map(|found| found.type_id) else {
                return Ok(());
            };
            match self.items.decay(type_id) {
                Some((Some(next), _)) => {
                    let Some(decaying) = tile.item_mut(item) else {
                        return Ok(());
                    };
                    decaying.type_id = next;
                    let snapshot = decaying.snapshot();
                    if let Some((_, delay_ms)) = self.items.decay(next) {
                        self.schedule(delay_ms, GameTask::DecayItem { position, item });
                    }
                    Some(MessagePart::RefreshThing {
                        position,
                        stackpos,
                        item: snapshot,
                    })
                }
                _ => tile
                    .remove_item(item)
                    .map(|(stackpos, _)| MessagePart::RemoveThing { position, stackpos }),
            }
        };
        if let Some(part) = part {
            let mut outbox = Outbox::new();
            outbox.push_all(&self.spectators_of(position), &part);
            outbox.deliver(&self.creatures);
        }
        Ok(())
    }

    /// Dries or removes a splash unless it was refreshed after this command
    /// was scheduled.
    pub(crate) fn decay_splash(&mut self, position: Position, item: ItemId) -> GameResult<()> {
        let now = self.now_ms();
        let Some(tile) = self.map.tile_mut(position) else {
            return Ok(());
        };
        if tile.splash.as_ref().map(|splash| splash.id) != Some(item) || tile.decay_splash_after > now {
            return Ok(());
        }
        let Some(stackpos) = tile.splash_stackpos() else {
            return Ok(());
        };
        let Some(type_id) = tile.splash.as_ref().map(|splash| splash.type_id) else {
            return Ok(());
        };
        let part = match self.items.decay(type_id) {
            Some((Some(next), delay_ms)) => {
                let Some(splash) = tile.splash.as_mut() else {
                    return Ok(());
                };
                splash.type_id = next;
                let snapshot = splash.snapshot();
                let next_delay = self.items.decay(next).map(|(_, ms)| ms).unwrap_or(delay_ms);
                tile.decay_splash_after = now.saturating_add(next_delay);
                self.schedule(next_delay, GameTask::DecaySplash { position, item });
                MessagePart::RefreshThing {
                    position,
                    stackpos,
                    item: snapshot,
                }
            }
            _ => {
                tile.splash = None;
                MessagePart::RemoveThing { position, stackpos }
            }
        };
        let mut outbox = Outbox::new();
        outbox.push_all(&self.spectators_of(position), &part);
        outbox.deliver(&self.creatures);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::conditions::{ConditionKind, DamageTicks};
    use crate::entities::creature::Creature;
    use crate::entities::item::{Item, ItemTypeId};
    use crate::entities::skills::Vocation;
    use crate::game::map_state::MapState;
    use crate::game::testing::{floor, world_with_map};
    use crate::net::session::RecordingSink;

    fn at(x: u16, y: u16) -> Position {
        Position::new(x, y, 7)
    }

    #[test]
    fn heartbeat_levels_up_and_tells_the_player() {
        let (mut world, _clock) = world_with_map(floor());
        let sink = RecordingSink::new();
        let mut hero = Creature::player("Hero", at(105, 105), Vocation::Knight).with_session(sink.session());
        hero.experience = 100;
        let id = hero.id;
        world.place_creature(hero).expect("placed");
        sink.clear();

        world.check_creature(id, 1).expect("heartbeat");

        let hero = world.creature(id).expect("hero");
        assert_eq!(hero.player_data().expect("player").level, 2);
        assert_eq!(hero.stats.max_health, 165);
        assert!(sink.parts().iter().any(|part| matches!(
            part,
            MessagePart::TextMessage { text, .. } if text == "You advanced from level 1 to level 2."
        )));
    }

    #[test]
    fn monsters_pick_the_closest_player_outside_protection() {
        let mut map = floor();
        map.tile_mut(at(106, 105)).expect("tile").protection_zone = true;
        let (mut world, _clock) = world_with_map(map);
        let safe = Creature::player("Safe", at(106, 105), Vocation::None);
        let exposed = Creature::player("Exposed", at(108, 105), Vocation::None);
        let exposed_id = exposed.id;
        let rat = Creature::monster("Rat", at(105, 105), 20, 5);
        let rat_id = rat.id;
        let npc = Creature::npc("Sam", at(107, 106));
        let npc_id = npc.id;
        for creature in [safe, exposed, rat, npc] {
            world.place_creature(creature).expect("placed");
        }

        world.check_creature(rat_id, 1).expect("rat heartbeat");
        world.check_creature(npc_id, 1).expect("npc heartbeat");
        assert_eq!(world.creature(rat_id).expect("rat").attack_target, Some(exposed_id));
        assert_eq!(world.creature(npc_id).expect("npc").attack_target, None);
    }

    #[test]
    fn privileged_players_never_gain_magic_levels() {
        let (mut world, _clock) = world_with_map(floor());
        let gm = Creature::player("Gm", at(105, 105), Vocation::Sorcerer).with_access(2);
        let id = gm.id;
        world.place_creature(gm).expect("placed");
        world.player_mut(id).expect("player").mana_spent = 10_000;
        world.check_creature(id, 1).expect("heartbeat");
        assert_eq!(world.player(id).expect("player").magic_level, 0);
    }

    #[test]
    fn poison_ticks_hurt_through_the_combat_engine() {
        let (mut world, _clock) = world_with_map(floor());
        let rat = Creature::monster("Rat", at(105, 105), 30, 5);
        let id = rat.id;
        world.place_creature(rat).expect("placed");
        world.creature_mut(id).expect("rat").conditions.add(
            ConditionKind::Poison,
            DamageTicks {
                damage: 5,
                remaining: 2,
                interval_ms: 300,
                owner: None,
            },
        );

        world.check_creature(id, 1).expect("first");
        world.check_creature(id, 1).expect("second");
        world.check_creature(id, 1).expect("third");

        let rat = world.creature(id).expect("rat");
        assert_eq!(rat.stats.health, 20);
        assert!(!rat.conditions.is_active(ConditionKind::Poison));
    }

    #[test]
    fn refreshed_splash_ignores_the_older_decay_command() {
        let (mut world, clock) = world_with_map(floor());
        let position = at(105, 105);
        let mut state = MapState::new();
        world.bleed(position, &mut state);
        let splash_id = world.map.tile(position).and_then(|tile| tile.splash.as_ref()).expect("splash").id;

        clock.advance(5_000);
        world.bleed(position, &mut state);
        clock.advance(5_000);
        world.decay_splash(position, splash_id).expect("stale");
        let splash = world.map.tile(position).and_then(|tile| tile.splash.as_ref()).expect("splash");
        assert_eq!(splash.type_id, ItemTypeId(2019));

        clock.advance(5_000);
        world.decay_splash(position, splash_id).expect("due");
        let splash = world.map.tile(position).and_then(|tile| tile.splash.as_ref()).expect("splash");
        assert_eq!(splash.type_id, ItemTypeId(2020));

        clock.advance(20_000);
        world.decay_splash(position, splash_id).expect("gone");
        assert!(world.map.tile(position).expect("tile").splash.is_none());
    }

    #[test]
    fn corpses_rot_along_their_decay_chain() {
        let (mut world, _clock) = world_with_map(floor());
        let position = at(105, 105);
        let corpse = Item::new(ItemTypeId(3073), 1);
        let id = corpse.id;
        world.map.tile_mut(position).expect("tile").add_item(corpse);

        world.decay_item(position, id).expect("rot");
        let tile = world.map.tile(position).expect("tile");
        assert_eq!(tile.items().next().map(|item| item.type_id), Some(ItemTypeId(3060)));

        world.decay_item(position, id).expect("vanish");
        assert_eq!(world.map.tile(position).expect("tile").items().count(), 0);
    }
}
