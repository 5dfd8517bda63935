use super::map_state::MapState;
use super::notify::Outbox;
use super::World;
use crate::combat::damage::{apply_damage, DamageOutcome};
use crate::combat::magic::{
    ANI_ENERGY, ANI_POWERBOLT, ME_BLOCK_HIT, ME_DRAW_BLOOD, ME_LOSE_ENERGY, ME_PUFF, TEXT_COLOR_EXPERIENCE,
    TEXT_COLOR_MANA, TEXT_COLOR_PHYSICAL,
};
use crate::entities::creature::{CreatureId, FightType};
use crate::entities::item::Item;
use crate::error::{GameError, GameResult};
use crate::net::message::{MessagePart, OutboundMessage, TextKind};
use crate::scheduler::task::GameTask;
use crate::world::position::{Position, Range};
use crate::world::viewport::Viewport;

/// What one creature took from one hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TargetHit {
    pub target: CreatureId,
    pub position: Position,
    pub outcome: DamageOutcome,
    pub damage_effect: u8,
    pub color: u8,
    pub died: bool,
    pub is_player: bool,
}

/// Experience a killer earned, shown above the killer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Kill {
    pub killer_position: Position,
    pub experience: u64,
}

/// Everything one resolved attack shows to its observers.
#[derive(Debug, Default)]
pub(crate) struct HitReport {
    pub attacker: Option<CreatureId>,
    pub attacker_name: Option<String>,
    pub shot: Option<(Position, Position, u8)>,
    /// Tiles an area effect resolved over, occupied or not.
    pub area: Vec<Position>,
    /// Effects on tiles that held nobody (area effects, puffs).
    pub tile_effects: Vec<(Position, u8)>,
    pub hits: Vec<TargetHit>,
    pub kills: Vec<Kill>,
    pub state: MapState,
    /// Creatures whose stats panel changed besides the ones that were hit.
    pub refresh: Vec<CreatureId>,
}

impl HitReport {
    fn bounds(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.area.clone();
        positions.extend(self.hits.iter().map(|hit| hit.position));
        positions.extend(self.tile_effects.iter().map(|(position, _)| *position));
        positions.extend(self.state.changes().iter().map(|change| change.position()));
        if let Some((from, to, _)) = self.shot {
            positions.push(from);
            positions.push(to);
        }
        positions
    }
}

/// Event text a player reads after losing health.
pub(crate) fn damage_text(amount: i32, attacker: Option<&str>) -> String {
    let noun = if amount == 1 { "hitpoint" } else { "hitpoints" };
    match attacker {
        Some(name) => format!("You lose {amount} {noun} due to an attack by {name}."),
        None => format!("You lose {amount} {noun}."),
    }
}

pub(crate) fn mana_text(amount: i32, attacker: Option<&str>) -> String {
    match attacker {
        Some(name) => format!("You lose {amount} mana blocking an attack by {name}."),
        None => format!("You lose {amount} mana."),
    }
}

/// The visible part of a hit for anyone watching its tile.
fn hit_parts(hit: &TargetHit) -> Vec<MessagePart> {
    let mut parts = Vec::new();
    let outcome = hit.outcome;
    if outcome.health != 0 {
        parts.push(MessagePart::MagicEffect {
            position: hit.position,
            effect: hit.damage_effect,
        });
        if outcome.health > 0 {
            parts.push(MessagePart::AnimatedText {
                position: hit.position,
                color: hit.color,
                text: outcome.health.to_string(),
            });
        }
    }
    if outcome.mana > 0 {
        parts.push(MessagePart::MagicEffect {
            position: hit.position,
            effect: ME_LOSE_ENERGY,
        });
        parts.push(MessagePart::AnimatedText {
            position: hit.position,
            color: TEXT_COLOR_MANA,
            text: outcome.mana.to_string(),
        });
    }
    parts
}

impl World {
    /// Applies `damage` to `target` through its mana shield.
    pub(crate) fn strike(&mut self, target: CreatureId, damage: i32, damage_effect: u8, color: u8) -> Option<TargetHit> {
        let creature = self.creatures.get_mut(target)?;
        let outcome = apply_damage(&mut creature.stats, creature.timers.mana_shield(), damage);
        Some(TargetHit {
            target,
            position: creature.position,
            outcome,
            damage_effect,
            color,
            died: !creature.is_alive(),
            is_player: creature.is_player(),
        })
    }

    /// Lays a fresh blood splash and arms its decay.
    pub(crate) fn bleed(&mut self, position: Position, state: &mut MapState) {
        let splash_type = self.settings.combat.splash_type;
        let splash = Item::new(splash_type, 2);
        let Some(splash) = state.set_splash(&mut self.map, position, splash) else {
            return;
        };
        let Some((_, decay_ms)) = self.items.decay(splash_type) else {
            return;
        };
        let due = self.now_ms().saturating_add(decay_ms);
        if let Some(tile) = self.map.tile_mut(position) {
            tile.decay_splash_after = due;
        }
        self.schedule(
            decay_ms,
            GameTask::DecaySplash {
                position,
                item: splash.id,
            },
        );
    }

    /// Takes a dead creature out of the world and leaves its corpse behind.
    pub(crate) fn bury(
        &mut self,
        hit: &TargetHit,
        killer: Option<CreatureId>,
        report: &mut HitReport,
        outbox: &mut Outbox,
    ) {
        let position = hit.position;
        if report.state.remove_creature(&mut self.map, hit.target, position).is_none() {
            debug_assert!(false, "dead creature missing from its tile");
        }
        let Some(victim) = self.creatures.remove(hit.target) else {
            return;
        };
        for members in self.channels.values_mut() {
            members.remove(&hit.target);
        }
        if let Some(session) = victim.session() {
            outbox.keep_session(victim.id, session.clone());
        }

        let experience = self.settings.combat.experience_for_kill(victim.experience);
        if let Some(killer) = killer.and_then(|id| self.creatures.get_mut(id)) {
            killer.experience = killer.experience.saturating_add(experience);
            if experience > 0 {
                report.kills.push(Kill {
                    killer_position: killer.position,
                    experience,
                });
                report.refresh.push(killer.id);
            }
        }

        let corpse = self.items.instantiate(victim.corpse_type, 1);
        let corpse_id = corpse.id;
        if report.state.add_item(&mut self.map, position, corpse).is_some() {
            if let Some((_, decay_ms)) = self.items.decay(victim.corpse_type) {
                self.schedule(
                    decay_ms,
                    GameTask::DecayItem {
                        position,
                        item: corpse_id,
                    },
                );
            }
        }
        tracing::info!(
            victim = %victim.name,
            killer = ?killer.map(|id| id.0),
            ?position,
            experience,
            "creature died"
        );
    }

    /// Sends every observer of `report` one message describing it.
    pub(crate) fn publish_hits(&self, report: &HitReport, mut outbox: Outbox) {
        let mut viewers: Vec<(CreatureId, Position)> = Vec::new();
        if let Some(range) = view_box(&report.bounds()) {
            viewers.extend(
                self.map
                    .spectators(&range)
                    .into_iter()
                    .filter_map(|id| self.creatures.get(id).map(|creature| (id, creature.position))),
            );
        }
        for hit in report.hits.iter().filter(|hit| hit.died && hit.is_player) {
            viewers.push((hit.target, hit.position));
        }
        viewers.sort();
        viewers.dedup_by_key(|(id, _)| *id);

        for (viewer, at) in viewers {
            let view = Viewport::around(at);
            let mut parts = Vec::new();
            if let Some((from, to, effect)) = report.shot {
                if view.can_see(from) || view.can_see(to) {
                    parts.push(MessagePart::DistanceShoot { from, to, effect });
                }
            }
            for (position, effect) in &report.tile_effects {
                if view.can_see(*position) {
                    parts.push(MessagePart::MagicEffect {
                        position: *position,
                        effect: *effect,
                    });
                }
            }
            for hit in report.hits.iter().filter(|hit| view.can_see(hit.position)) {
                parts.extend(hit_parts(hit));
            }
            parts.extend(report.state.parts_for(at));
            for hit in report.hits.iter().filter(|hit| !hit.died && view.can_see(hit.position)) {
                if let Some(creature) = self.creatures.get(hit.target) {
                    parts.push(MessagePart::CreatureHealth {
                        creature: hit.target,
                        percent: creature.stats.health_percent(),
                    });
                }
            }
            for kill in report.kills.iter().filter(|kill| view.can_see(kill.killer_position)) {
                parts.push(MessagePart::AnimatedText {
                    position: kill.killer_position,
                    color: TEXT_COLOR_EXPERIENCE,
                    text: kill.experience.to_string(),
                });
            }

            let own_hit = report.hits.iter().find(|hit| hit.target == viewer);
            if let Some(hit) = own_hit.filter(|hit| hit.is_player) {
                let attacker = report.attacker_name.as_deref();
                if hit.outcome.health > 0 {
                    parts.push(OutboundMessage::text(
                        TextKind::Event,
                        damage_text(hit.outcome.health, attacker),
                    ));
                }
                if hit.outcome.mana > 0 {
                    parts.push(OutboundMessage::text(TextKind::Event, mana_text(hit.outcome.mana, attacker)));
                }
            }
            let refreshed = own_hit.is_some() || report.refresh.contains(&viewer);
            if refreshed {
                if let Some(creature) = self.creatures.get(viewer) {
                    if let Some(stats) = super::player_stats(creature) {
                        parts.push(stats);
                        parts.push(MessagePart::Icons(creature.icons()));
                    }
                }
            }
            outbox.extend(viewer, parts);
        }
        outbox.deliver(&self.creatures);
    }

    /// Fails when either side of an attack stands in a protection zone.
    fn check_attack_zone(&self, attacker: CreatureId, target: CreatureId) -> GameResult<()> {
        let attacker = self.creature(attacker)?;
        let target = self.creature(target)?;
        if attacker.is_privileged() {
            return Ok(());
        }
        if self.map.is_protection_zone(attacker.position) || self.map.is_protection_zone(target.position) {
            return Err(GameError::ProtectionZoneViolation);
        }
        Ok(())
    }

    /// Picks (or drops, with `None`) the creature `actor` keeps attacking.
    pub fn set_attack_target(&mut self, actor: CreatureId, target: Option<CreatureId>) -> GameResult<()> {
        let Some(target) = target else {
            self.creature_mut(actor)?.attack_target = None;
            return Ok(());
        };
        if target == actor {
            return Err(GameError::Rejected);
        }
        let result = self.check_attack_zone(actor, target).and_then(|()| {
            if self.creature(target)?.is_privileged() {
                Err(GameError::TargetPrivileged)
            } else {
                Ok(())
            }
        });
        let creature = self.creature_mut(actor)?;
        match result {
            Ok(()) => {
                creature.attack_target = Some(target);
                tracing::debug!(actor = actor.0, target = target.0, "attack target set");
                Ok(())
            }
            Err(error) => {
                creature.attack_target = None;
                Err(error)
            }
        }
    }

    /// One single-target hit with the attacker's weapon.
    pub fn make_damage(&mut self, attacker: CreatureId, target: CreatureId) -> GameResult<()> {
        self.check_attack_zone(attacker, target)?;
        let victim = self.creature(target)?;
        if victim.is_privileged() {
            return Err(GameError::TargetPrivileged);
        }
        let victim_position = victim.position;
        let victim_is_player = victim.is_player();
        let striker = self.creature(attacker)?;
        let rules = &self.settings.combat;
        let in_reach = match striker.fight_type {
            FightType::Melee => striker.position.within(victim_position, rules.melee_range, rules.melee_range),
            FightType::Distance | FightType::MagicDistance => {
                striker
                    .position
                    .within(victim_position, rules.distance_range_x, rules.distance_range_y)
            }
        };
        if !in_reach {
            return Err(GameError::NotReachable);
        }
        let origin = striker.position;
        let fight_type = striker.fight_type;
        let privileged = striker.is_privileged();
        let name = striker.name.clone();
        let (min_attack, max_attack) = (striker.min_attack, striker.max_attack);
        let (fight_ms, pz_lock_ms) = (rules.fight_ms, rules.pz_lock_ms);

        let mut damage = self.rng.roll_range(min_attack, max_attack);
        if privileged {
            damage = damage.saturating_add(1337);
        }

        let striker = self.creature_mut(attacker)?;
        if striker.is_player() && !privileged {
            if victim_is_player {
                striker.timers.lock_protection_zone(pz_lock_ms);
            } else {
                striker.timers.start_fight(fight_ms);
            }
        }
        if let Some(player) = striker.player_data_mut() {
            player.skill_tries = player.skill_tries.saturating_add(1);
        }
        if victim_is_player {
            self.creature_mut(target)?.timers.start_fight(fight_ms);
        }

        let mut report = HitReport {
            attacker: Some(attacker),
            attacker_name: Some(name),
            refresh: vec![attacker],
            ..HitReport::default()
        };
        report.shot = match fight_type {
            FightType::Melee => None,
            FightType::Distance => Some((origin, victim_position, ANI_POWERBOLT)),
            FightType::MagicDistance => Some((origin, victim_position, ANI_ENERGY)),
        };
        let (effect, color) = match damage {
            0 => (ME_PUFF, TEXT_COLOR_PHYSICAL),
            d if d < 0 => (ME_BLOCK_HIT, TEXT_COLOR_PHYSICAL),
            _ => (ME_DRAW_BLOOD, TEXT_COLOR_PHYSICAL),
        };
        if damage <= 0 {
            report.tile_effects.push((victim_position, effect));
        } else {
            let hit = self.strike(target, damage, effect, color).ok_or(GameError::UnknownCreature(target))?;
            if hit.outcome.health > 0 {
                self.bleed(hit.position, &mut report.state);
            }
            report.hits.push(hit);
        }

        let mut outbox = Outbox::new();
        let dead: Vec<TargetHit> = report.hits.iter().filter(|hit| hit.died).cloned().collect();
        for hit in &dead {
            self.bury(hit, Some(attacker), &mut report, &mut outbox);
        }
        if !dead.is_empty() {
            if let Some(creature) = self.creatures.get_mut(attacker) {
                if creature.attack_target == Some(target) {
                    creature.attack_target = None;
                }
            }
        }
        self.publish_hits(&report, outbox);
        Ok(())
    }

    /// The attack heartbeat: hits the current target and re-arms itself.
    pub(crate) fn check_attack(&mut self, id: CreatureId, placement: u32) -> GameResult<()> {
        let Some(creature) = self.placed(id, placement) else {
            return Ok(());
        };
        if !creature.is_alive() {
            return Ok(());
        }
        if let Some(target) = creature.attack_target {
            let dropped = match self.make_damage(id, target) {
                Ok(()) => false,
                Err(GameError::NotReachable) => false,
                Err(error) => {
                    tracing::debug!(attacker = id.0, target = target.0, %error, "attack dropped");
                    true
                }
            };
            if dropped {
                if let Some(creature) = self.creatures.get_mut(id) {
                    creature.attack_target = None;
                    if let Some(session) = creature.session() {
                        session.send(OutboundMessage::single(MessagePart::CancelAttack));
                    }
                }
            }
        }
        if self.creatures.contains(id) {
            self.schedule(self.settings.heartbeat.attack_ms, GameTask::CheckAttack(id, placement));
        }
        Ok(())
    }
}

/// Spectator box of an action: the tight bounding box of every position it
/// touched, widened by the view range on each side.
fn view_box(positions: &[Position]) -> Option<Range> {
    let (first, rest) = positions.split_first()?;
    let (mut low, mut high) = (*first, *first);
    for position in rest {
        low.x = low.x.min(position.x);
        low.y = low.y.min(position.y);
        low.z = low.z.min(position.z);
        high.x = high.x.max(position.x);
        high.y = high.y.max(position.y);
        high.z = high.z.max(position.z);
    }
    let (near, far) = (Range::around(low, true), Range::around(high, true));
    Some(Range {
        min_x: near.min_x,
        max_x: far.max_x,
        min_y: near.min_y,
        max_y: far.max_y,
        min_z: near.min_z.min(far.min_z),
        max_z: near.max_z.max(far.max_z),
    })
}
