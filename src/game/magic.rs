use super::combat::HitReport;
use super::movement::ItemLocation;
use super::notify::Outbox;
use super::World;
use crate::combat::magic::{MagicEffect, SelfBuff, TEXT_COLOR_HEAL};
use crate::entities::creature::CreatureId;
use crate::entities::item::ItemTypeId;
use crate::error::{GameError, GameResult};
use crate::net::message::MessagePart;
use crate::scheduler::task::GameTask;
use crate::world::position::{Direction, Position};

impl World {
    /// Casts `effect` at `center`. Without a caster the world itself is the
    /// source and nothing is charged.
    pub fn make_magic(&mut self, caster: Option<CreatureId>, center: Position, effect: &MagicEffect) -> GameResult<()> {
        let origin = match caster {
            Some(id) => {
                self.prepare_cast(id, center, effect)?;
                self.creature(id)?.position
            }
            None => center,
        };
        self.resolve_area(caster, origin, center, effect, None)
    }

    /// A hit on `victim` alone from a field or a damage-over-time tick,
    /// credited to `owner`. Nobody is charged for it.
    pub(crate) fn hit_from_world(
        &mut self,
        owner: Option<CreatureId>,
        victim: CreatureId,
        effect: &MagicEffect,
    ) -> GameResult<()> {
        let center = self.creature(victim)?.position;
        self.resolve_area(owner, center, center, effect, Some(victim))
    }

    /// Checks an ordinary caster may cast at all. Nothing is changed here.
    fn prepare_cast(&self, caster: CreatureId, center: Position, effect: &MagicEffect) -> GameResult<()> {
        let creature = self.creature(caster)?;
        if creature.is_privileged() {
            return Ok(());
        }
        if self.map.is_protection_zone(creature.position) || self.map.is_protection_zone(center) {
            return Err(GameError::ProtectionZoneViolation);
        }
        if creature.timers.exhausted() && effect.causes_exhaustion(true) {
            return Err(GameError::Exhausted);
        }
        if creature.stats.mana < effect.mana_cost {
            return Err(GameError::InsufficientMana);
        }
        Ok(())
    }

    /// Resolves an area effect as one transaction: every tile is decided
    /// before deaths are processed and before anyone is told.
    ///
    /// A cast (`only` unset) is charged to the caster; a world hit on `only`
    /// skips every caster rule.
    fn resolve_area(
        &mut self,
        caster: Option<CreatureId>,
        origin: Position,
        center: Position,
        effect: &MagicEffect,
        only: Option<CreatureId>,
    ) -> GameResult<()> {
        let charge = only.is_none() && caster.is_some();
        let source = caster.and_then(|id| self.creatures.get(id));
        let caster_access = source.map(|creature| creature.access).unwrap_or(0);
        let caster_name = source.map(|creature| creature.name.clone());
        let facing = source.map(|creature| creature.direction).unwrap_or(Direction::South);

        let mut tiles: Vec<Position> = Vec::new();
        for position in effect.shape.positions(center, facing) {
            if tiles.contains(&position) {
                continue;
            }
            let Some(tile) = self.map.tile(position) else {
                continue;
            };
            if charge {
                if caster_access == 0 && tile.protection_zone {
                    continue;
                }
                if !self.map.can_throw_item_to(origin, position, false, true) {
                    continue;
                }
            }
            tiles.push(position);
        }
        if tiles.is_empty() {
            return Err(GameError::NotPossible);
        }
        let center_occupied = self
            .map
            .tile(center)
            .map(|tile| tile.has_creatures())
            .unwrap_or(false);
        if charge && !effect.can_cast(self.map.is_blocking(center), center_occupied) {
            return Err(GameError::NotPossible);
        }

        if let (true, Some(id)) = (charge, caster) {
            let creature = self.creature_mut(id)?;
            if !creature.is_privileged() && effect.mana_cost > 0 {
                creature.stats.drain_mana(effect.mana_cost);
                if let Some(player) = creature.player_data_mut() {
                    player.mana_spent = player.mana_spent.saturating_add(effect.mana_cost as u64);
                }
            }
        }

        let color = if effect.is_healing() {
            TEXT_COLOR_HEAL
        } else {
            effect.animation_color
        };
        let mut report = HitReport {
            attacker: caster,
            attacker_name: caster_name,
            area: tiles.clone(),
            ..HitReport::default()
        };
        if charge && origin != center {
            report.shot = effect.distance_effect.map(|shot| (origin, center, shot));
        }

        for position in &tiles {
            let occupants: Vec<CreatureId> = self
                .map
                .tile(*position)
                .map(|tile| tile.creatures().collect())
                .unwrap_or_default();
            if occupants.is_empty() {
                if let Some(area_effect) = effect.area_effect {
                    report.tile_effects.push((*position, area_effect));
                }
            }
            for target in occupants {
                if only.is_some_and(|victim| victim != target) {
                    continue;
                }
                let target_access = self.creatures.get(target).map(|creature| creature.access).unwrap_or(0);
                let damage = effect.roll_damage(&mut self.rng, caster_access, target_access);
                let Some(hit) = self.strike(target, damage, effect.damage_effect, color) else {
                    continue;
                };
                if !hit.died && target_access <= caster_access {
                    if let Some((kind, ticks)) = effect.condition_ticks(caster) {
                        if let Some(creature) = self.creatures.get_mut(target) {
                            creature.conditions.add(kind, ticks);
                        }
                    }
                }
                report.hits.push(hit);
            }

            let Some(tile) = self.map.tile(*position) else {
                continue;
            };
            let blocking = tile.is_blocking(&self.items);
            let Some(field) = effect.field_item(caster, tile.protection_zone, blocking) else {
                continue;
            };
            if let Some((field, true)) = report.state.set_field(&mut self.map, *position, field) {
                if let Some(data) = field.as_field() {
                    self.schedule(
                        data.stage_ms,
                        GameTask::DecayItem {
                            position: *position,
                            item: field.id,
                        },
                    );
                }
            }
        }

        if effect.physical {
            let bleeding: Vec<Position> = report
                .hits
                .iter()
                .filter(|hit| hit.outcome.health > 0)
                .map(|hit| hit.position)
                .collect();
            for position in bleeding {
                self.bleed(position, &mut report.state);
            }
        }

        let fight_ms = self.settings.combat.fight_ms;
        let pz_lock_ms = self.settings.combat.pz_lock_ms;
        let victims: Vec<CreatureId> = report
            .hits
            .iter()
            .filter(|hit| hit.is_player && hit.outcome.health > 0 && Some(hit.target) != caster)
            .map(|hit| hit.target)
            .collect();
        for victim in &victims {
            if let Some(creature) = self.creatures.get_mut(*victim) {
                if !creature.is_privileged() {
                    creature.timers.start_fight(fight_ms);
                }
            }
        }

        let mut outbox = Outbox::new();
        let dead: Vec<_> = report.hits.iter().filter(|hit| hit.died).cloned().collect();
        for hit in &dead {
            self.bury(hit, caster, &mut report, &mut outbox);
        }

        if let (true, Some(id)) = (charge, caster) {
            let had_tiles = !tiles.is_empty();
            let exhausted_ms = self.settings.combat.exhausted_ms;
            if let Some(creature) = self.creatures.get_mut(id) {
                let mut speed_changed = false;
                match effect.self_buff {
                    Some(SelfBuff::ManaShield { duration_ms }) => {
                        creature.timers.mana_shield_ms = duration_ms;
                    }
                    Some(SelfBuff::Haste {
                        duration_ms,
                        speed_bonus,
                    }) => {
                        creature.timers.haste_ms = duration_ms;
                        creature.speed = creature.base_speed.saturating_add(speed_bonus);
                        speed_changed = true;
                    }
                    None => {}
                }
                if !creature.is_privileged() {
                    if effect.causes_exhaustion(had_tiles) {
                        creature.timers.exhausted_ms = exhausted_ms;
                    }
                    if effect.offensive && had_tiles && creature.is_player() {
                        if victims.is_empty() {
                            creature.timers.start_fight(fight_ms);
                        } else {
                            creature.timers.lock_protection_zone(pz_lock_ms);
                        }
                    }
                }
                let (position, speed) = (creature.position, creature.speed);
                report.refresh.push(id);
                if speed_changed {
                    outbox.push_all(
                        &self.spectators_of(position),
                        &MessagePart::CreatureSpeed { creature: id, speed },
                    );
                }
            }
        }

        tracing::trace!(
            caster = ?caster.map(|id| id.0),
            ?center,
            tiles = tiles.len(),
            hits = report.hits.len(),
            "area effect resolved"
        );
        self.publish_hits(&report, outbox);
        Ok(())
    }

    /// Casts the instant spell `words` if `actor` knows it. Returns whether
    /// the words were a spell.
    pub fn say_spell(&mut self, actor: CreatureId, words: &str) -> GameResult<bool> {
        let creature = self.creature(actor)?;
        let Some(spell) = self.spells.spell(words) else {
            return Ok(false);
        };
        let allowed = match creature.player_data() {
            Some(player) if !creature.is_privileged() => {
                spell.vocations.contains(&player.vocation) && player.magic_level >= spell.magic_level
            }
            _ => true,
        };
        if !allowed {
            return Ok(false);
        }
        let effect = spell.effect.clone();
        let center = creature.position;
        tracing::debug!(actor = actor.0, words, "spell cast");
        self.make_magic(Some(actor), center, &effect)?;
        Ok(true)
    }

    /// Throws a rune of type `rune` at `target`.
    pub fn throw_rune(&mut self, actor: CreatureId, rune: ItemTypeId, target: Position) -> GameResult<()> {
        let creature = self.creature(actor)?;
        let rune = self.spells.rune(rune).ok_or(GameError::Rejected)?;
        if creature.position.z != target.z {
            return Err(GameError::NotReachable);
        }
        if !self.map.can_throw_item_to(creature.position, target, false, true) {
            return Err(GameError::NoPath);
        }
        if !creature.is_privileged() {
            let magic_level = creature.player_data().map(|player| player.magic_level).unwrap_or(0);
            if magic_level < rune.magic_level {
                return Err(GameError::Rejected);
            }
        }
        let effect = rune.effect.clone();
        self.make_magic(Some(actor), target, &effect)
    }

    /// Uses the item at `location`: runes are cast at `target` (the user by
    /// default) and containers are opened.
    pub fn use_item(&mut self, actor: CreatureId, location: ItemLocation, target: Option<Position>) -> GameResult<()> {
        let actor_position = self.creature(actor)?.position;
        if let ItemLocation::Ground { position, .. } = location {
            if !actor_position.within(position, 1, 1) {
                return Err(GameError::TooFar);
            }
        }
        let item = self.item_at(actor, location)?;
        let type_id = item.type_id;
        if self.spells.rune(type_id).is_some() {
            return self.throw_rune(actor, type_id, target.unwrap_or(actor_position));
        }
        if item.is_container() {
            return self.open_container(actor, location).map(|_| ());
        }
        Err(GameError::Rejected)
    }
}
