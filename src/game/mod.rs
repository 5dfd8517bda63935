pub mod appearance;
pub mod bans;
pub mod combat;
pub mod magic;
pub mod maintenance;
pub mod map_state;
pub mod movement;
pub mod notify;
pub mod speech;
#[cfg(test)]
pub(crate) mod testing;

use crate::combat::damage::CombatRng;
use crate::combat::magic::{MagicEffect, SpellBook};
use crate::combat::rules::CombatRules;
use crate::entities::creature::{Creature, CreatureId, Outfit};
use crate::entities::inventory::InventorySlot;
use crate::entities::item::ItemTypeId;
use crate::error::{GameError, GameResult};
use crate::net::message::{MessagePart, OutboundMessage, PlayerStats};
use crate::scheduler::clock::Clock;
use crate::scheduler::task::GameTask;
use crate::scheduler::Scheduler;
use crate::world::item_types::ItemTypeIndex;
use crate::world::map::Map;
use crate::world::position::{Direction, Position, Range};
use crate::world::registry::CreatureRegistry;
use crate::world::viewport::Viewport;
use bans::BanList;
use movement::{ItemLocation, ItemTarget};
use notify::Outbox;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread::JoinHandle;

pub use speech::SpeechOutcome;

/// Intervals of the self-rescheduling creature callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HeartbeatSettings {
    pub player_ms: u64,
    /// Heartbeat of non-player creatures.
    pub creature_ms: u64,
    pub attack_ms: u64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            player_ms: 1000,
            creature_ms: 300,
            attack_ms: 2000,
        }
    }
}

/// Points restored on every player heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegenSettings {
    pub mana: i32,
    pub health: i32,
}

impl Default for RegenSettings {
    fn default() -> Self {
        Self { mana: 10, health: 1 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldSettings {
    /// Ordinary players allowed online at once.
    pub max_players: usize,
    pub combat: CombatRules,
    pub heartbeat: HeartbeatSettings,
    pub regen: RegenSettings,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            max_players: 100,
            combat: CombatRules::default(),
            heartbeat: HeartbeatSettings::default(),
            regen: RegenSettings::default(),
        }
    }
}

/// All mutable world state. Only reachable through the lock held by [`Game`],
/// so every method here runs with the world already locked.
pub struct World {
    pub map: Map,
    pub creatures: CreatureRegistry,
    pub spells: SpellBook,
    pub bans: BanList,
    pub settings: WorldSettings,
    items: Arc<ItemTypeIndex>,
    channels: BTreeMap<u16, BTreeSet<CreatureId>>,
    rng: CombatRng,
    scheduler: Arc<Scheduler>,
}

impl World {
    pub fn new(map: Map, settings: WorldSettings, scheduler: Arc<Scheduler>) -> Self {
        let items = map.shared_item_types();
        Self {
            map,
            creatures: CreatureRegistry::new(),
            spells: SpellBook::standard(),
            bans: BanList::default(),
            settings,
            items,
            channels: BTreeMap::new(),
            rng: CombatRng::from_time(),
            scheduler,
        }
    }

    pub fn set_rng_seed(&mut self, seed: u64) {
        self.rng = CombatRng::from_seed(seed);
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn schedule(&self, delay_ms: u64, task: GameTask) {
        self.scheduler.schedule(delay_ms, task);
    }

    pub fn item_types(&self) -> &ItemTypeIndex {
        &self.items
    }

    pub fn creature(&self, id: CreatureId) -> GameResult<&Creature> {
        self.creatures
            .get(id)
            .ok_or(GameError::UnknownCreature(id))
    }

    /// The creature, if it is still in the placement `placement` refers to.
    pub(crate) fn placed(&self, id: CreatureId, placement: u32) -> Option<&Creature> {
        self.creatures
            .get(id)
            .filter(|creature| creature.placement == placement)
    }

    pub fn creature_mut(&mut self, id: CreatureId) -> GameResult<&mut Creature> {
        self.creatures
            .get_mut(id)
            .ok_or(GameError::UnknownCreature(id))
    }

    /// Whether `viewer`'s client renders `position`.
    pub fn sees(&self, viewer: CreatureId, position: Position) -> bool {
        self.creatures
            .get(viewer)
            .map(|creature| Viewport::around(creature.position).can_see(position))
            .unwrap_or(false)
    }

    /// Creatures whose view covers `position`.
    pub fn spectators_of(&self, position: Position) -> Vec<CreatureId> {
        self.spectators_in(&Range::around(position, true), position)
    }

    /// Creatures inside `range` whose view covers `position`.
    pub fn spectators_in(&self, range: &Range, position: Position) -> Vec<CreatureId> {
        self.map
            .spectators(range)
            .into_iter()
            .filter(|id| self.sees(*id, position))
            .collect()
    }

    pub fn dispatch(&mut self, task: GameTask) -> GameResult<()> {
        match task {
            GameTask::CheckCreature(id, placement) => self.check_creature(id, placement),
            GameTask::CheckAttack(id, placement) => self.check_attack(id, placement),
            GameTask::DecayItem { position, item } => self.decay_item(position, item),
            GameTask::DecaySplash { position, item } => self.decay_splash(position, item),
            GameTask::ChangeOutfit {
                creature,
                look_type,
            } => self.restore_outfit(creature, look_type),
        }
    }

    /// Puts a creature into the world at or near its position.
    pub fn place_creature(&mut self, mut creature: Creature) -> GameResult<Position> {
        if creature.is_player() && !creature.is_privileged() {
            if self.creatures.player_count() >= self.settings.max_players {
                return Err(GameError::WorldFull);
            }
            let ip = creature.player_data().map(|player| player.ip).unwrap_or(0);
            if self.bans.is_banned(ip) {
                return Err(GameError::Rejected);
            }
        }
        if self.creatures.contains(creature.id) {
            return Err(GameError::Rejected);
        }

        let id = creature.id;
        let (position, stackpos) = self
            .map
            .place_creature(id, creature.position)
            .ok_or(GameError::Rejected)?;
        creature.position = position;
        creature.placement = creature.placement.wrapping_add(1);
        let placement = creature.placement;
        let heartbeat = if creature.is_player() {
            self.settings.heartbeat.player_ms
        } else {
            self.settings.heartbeat.creature_ms
        };
        tracing::info!(creature = %creature.name, id = id.0, ?position, "creature placed");
        let appear = MessagePart::CreatureAppear {
            position,
            stackpos,
            creature: creature.snapshot(),
        };
        let stats = player_stats(&creature);
        self.creatures.insert(creature);

        self.schedule(heartbeat, GameTask::CheckCreature(id, placement));
        self.schedule(self.settings.heartbeat.attack_ms, GameTask::CheckAttack(id, placement));

        let mut outbox = Outbox::new();
        outbox.push_all(&self.spectators_of(position), &appear);
        if let Some(stats) = stats {
            outbox.push(id, stats);
        }
        outbox.deliver(&self.creatures);
        Ok(position)
    }

    /// Takes a creature out of the world and hands it back to the caller.
    pub fn remove_creature(&mut self, id: CreatureId) -> GameResult<Creature> {
        let position = self.creature(id)?.position;
        let spectators = self.spectators_of(position);
        let stackpos = self.map.remove_creature(id, position);
        debug_assert!(stackpos.is_some(), "registered creature missing from its tile");
        let creature = self
            .creatures
            .remove(id)
            .ok_or(GameError::UnknownCreature(id))?;
        for members in self.channels.values_mut() {
            members.remove(&id);
        }
        tracing::info!(creature = %creature.name, id = id.0, ?position, "creature removed");

        if let Some(stackpos) = stackpos {
            let mut outbox = Outbox::new();
            let part = MessagePart::CreatureDisappear {
                creature: id,
                position,
                stackpos,
            };
            let others: Vec<CreatureId> = spectators.into_iter().filter(|other| *other != id).collect();
            outbox.push_all(&others, &part);
            outbox.deliver(&self.creatures);
        }
        Ok(creature)
    }

    /// Tells `actor` why its action was refused.
    pub(crate) fn report(&self, actor: CreatureId, error: GameError) {
        tracing::debug!(actor = actor.0, %error, "action refused");
        if let Some(session) = self.creatures.get(actor).and_then(Creature::session) {
            session.send(OutboundMessage::single(MessagePart::Cancel {
                text: error.cancel_text().to_string(),
            }));
        }
    }

    /// Like [`World::report`], and the client also drops its attack target.
    pub(crate) fn report_attack(&self, actor: CreatureId, error: GameError) {
        tracing::debug!(actor = actor.0, %error, "attack refused");
        if let Some(session) = self.creatures.get(actor).and_then(Creature::session) {
            let mut message = OutboundMessage::new();
            message.push(MessagePart::Cancel {
                text: error.cancel_text().to_string(),
            });
            message.push(MessagePart::CancelAttack);
            session.send(message);
        }
    }

    pub(crate) fn stats_of(&self, id: CreatureId) -> Option<MessagePart> {
        self.creatures.get(id).and_then(player_stats)
    }
}

/// Stats panel contents of a player; `None` for other creatures.
pub(crate) fn player_stats(creature: &Creature) -> Option<MessagePart> {
    let player = creature.player_data()?;
    Some(MessagePart::PlayerStats(PlayerStats {
        health: creature.stats.health,
        max_health: creature.stats.max_health,
        mana: creature.stats.mana,
        max_mana: creature.stats.max_mana,
        capacity: creature.stats.capacity,
        experience: creature.experience,
        level: player.level,
        magic_level: player.magic_level,
    }))
}

/// The world behind its lock, plus the scheduler that feeds it.
///
/// Every public operation takes the lock once and runs to completion; the
/// `World` methods it calls assume the lock is held.
#[derive(Clone)]
pub struct Game {
    world: Arc<Mutex<World>>,
    scheduler: Arc<Scheduler>,
}

impl Game {
    pub fn new(map: Map, settings: WorldSettings, clock: Arc<dyn Clock>) -> Self {
        let scheduler = Arc::new(Scheduler::new(clock));
        let world = World::new(map, settings, scheduler.clone());
        Self {
            world: Arc::new(Mutex::new(world)),
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Spawns the scheduler thread.
    pub fn start(&self) -> std::io::Result<JoinHandle<()>> {
        let world = self.world.clone();
        let scheduler = self.scheduler.clone();
        std::thread::Builder::new()
            .name("scheduler".to_string())
            .spawn(move || scheduler.run(|task| world.lock().dispatch(task)))
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /// Fires every task that is due, on the calling thread.
    pub fn run_due_tasks(&self) -> usize {
        let mut fired = 0;
        while let Some(entry) = self.scheduler.pop_due() {
            fired += 1;
            let result = self.world.lock().dispatch(entry.task);
            if let Err(error) = result {
                tracing::error!(task = entry.task.kind(), %error, "scheduled task failed");
            }
        }
        fired
    }

    pub fn with_world<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.world.lock())
    }

    fn act<T>(&self, actor: CreatureId, op: impl FnOnce(&mut World) -> GameResult<T>) -> GameResult<T> {
        let mut world = self.world.lock();
        let result = op(&mut world);
        if let Err(error) = result.as_ref() {
            world.report(actor, *error);
        }
        result
    }

    fn act_attack(&self, actor: CreatureId, op: impl FnOnce(&mut World) -> GameResult<()>) -> GameResult<()> {
        let mut world = self.world.lock();
        let result = op(&mut world);
        if let Err(error) = result.as_ref() {
            world.report_attack(actor, *error);
        }
        result
    }

    pub fn place_creature(&self, creature: Creature) -> GameResult<(CreatureId, Position)> {
        let id = creature.id;
        let position = self.world.lock().place_creature(creature)?;
        Ok((id, position))
    }

    pub fn remove_creature(&self, id: CreatureId) -> GameResult<Creature> {
        self.world.lock().remove_creature(id)
    }

    /// One step of the creature's own walk; refusals cancel the client walk.
    pub fn walk(&self, actor: CreatureId, direction: Direction) -> GameResult<Position> {
        self.world.lock().walk(actor, direction)
    }

    pub fn move_creature(&self, actor: CreatureId, creature: CreatureId, to: Position) -> GameResult<Position> {
        self.act(actor, |world| world.move_creature(actor, creature, to))
    }

    /// Moves whatever sits at `from`/`stackpos` on the map to another tile.
    pub fn move_ground_thing(
        &self,
        actor: CreatureId,
        from: Position,
        stackpos: usize,
        to: Position,
    ) -> GameResult<()> {
        self.act(actor, |world| world.move_ground_thing(actor, from, stackpos, to))
    }

    pub fn move_item(&self, actor: CreatureId, source: ItemLocation, target: ItemTarget) -> GameResult<()> {
        self.act(actor, |world| world.move_item(actor, source, target))
    }

    pub fn move_container_item(
        &self,
        actor: CreatureId,
        from_cid: u8,
        index: usize,
        to_cid: u8,
    ) -> GameResult<()> {
        self.move_item(
            actor,
            ItemLocation::Container { cid: from_cid, index },
            ItemTarget::Container(to_cid),
        )
    }

    pub fn move_container_item_to_ground(
        &self,
        actor: CreatureId,
        cid: u8,
        index: usize,
        to: Position,
    ) -> GameResult<()> {
        self.move_item(actor, ItemLocation::Container { cid, index }, ItemTarget::Ground(to))
    }

    pub fn move_ground_item_to_container(
        &self,
        actor: CreatureId,
        from: Position,
        stackpos: usize,
        cid: u8,
    ) -> GameResult<()> {
        self.move_item(
            actor,
            ItemLocation::Ground {
                position: from,
                stackpos,
            },
            ItemTarget::Container(cid),
        )
    }

    pub fn equip_from_ground(
        &self,
        actor: CreatureId,
        from: Position,
        stackpos: usize,
        slot: InventorySlot,
    ) -> GameResult<()> {
        self.move_item(
            actor,
            ItemLocation::Ground {
                position: from,
                stackpos,
            },
            ItemTarget::Slot(slot),
        )
    }

    pub fn unequip_to_ground(&self, actor: CreatureId, slot: InventorySlot, to: Position) -> GameResult<()> {
        self.move_item(actor, ItemLocation::Slot(slot), ItemTarget::Ground(to))
    }

    pub fn open_container(&self, actor: CreatureId, location: ItemLocation) -> GameResult<u8> {
        self.act(actor, |world| world.open_container(actor, location))
    }

    pub fn close_container(&self, actor: CreatureId, cid: u8) -> GameResult<()> {
        self.act(actor, |world| world.close_container(actor, cid))
    }

    pub fn turn(&self, actor: CreatureId, direction: Direction) -> GameResult<()> {
        self.act(actor, |world| world.turn(actor, direction))
    }

    pub fn teleport(&self, creature: CreatureId, to: Position) -> GameResult<Position> {
        self.world.lock().teleport(creature, to)
    }

    pub fn change_outfit(&self, actor: CreatureId, outfit: Outfit) -> GameResult<()> {
        self.act(actor, |world| world.change_outfit(actor, outfit))
    }

    /// Shows `look_type` now and restores the current outfit after `delay_ms`.
    pub fn change_outfit_after(&self, actor: CreatureId, look_type: u16, delay_ms: u64) -> GameResult<()> {
        self.act(actor, |world| world.change_outfit_after(actor, look_type, delay_ms))
    }

    pub fn change_speed(&self, actor: CreatureId, speed: u16) -> GameResult<()> {
        self.act(actor, |world| world.change_speed(actor, speed))
    }

    pub fn say(&self, actor: CreatureId, text: &str) -> GameResult<SpeechOutcome> {
        self.act(actor, |world| world.say(actor, text))
    }

    pub fn whisper(&self, actor: CreatureId, text: &str) -> GameResult<()> {
        self.act(actor, |world| world.whisper(actor, text))
    }

    pub fn yell(&self, actor: CreatureId, text: &str) -> GameResult<()> {
        self.act(actor, |world| world.yell(actor, text))
    }

    pub fn speak_to(&self, actor: CreatureId, receiver: &str, text: &str) -> GameResult<()> {
        self.act(actor, |world| world.speak_to(actor, receiver, text))
    }

    pub fn broadcast(&self, actor: CreatureId, text: &str) -> GameResult<()> {
        self.act(actor, |world| world.broadcast(actor, text))
    }

    pub fn join_channel(&self, actor: CreatureId, channel: u16) -> GameResult<()> {
        self.act(actor, |world| world.join_channel(actor, channel))
    }

    pub fn leave_channel(&self, actor: CreatureId, channel: u16) -> GameResult<()> {
        self.act(actor, |world| world.leave_channel(actor, channel))
    }

    pub fn channel_say(&self, actor: CreatureId, channel: u16, text: &str) -> GameResult<()> {
        self.act(actor, |world| world.channel_say(actor, channel, text))
    }

    pub fn say_spell(&self, actor: CreatureId, words: &str) -> GameResult<bool> {
        self.act(actor, |world| world.say_spell(actor, words))
    }

    pub fn use_item(&self, actor: CreatureId, location: ItemLocation, target: Option<Position>) -> GameResult<()> {
        self.act(actor, |world| world.use_item(actor, location, target))
    }

    pub fn throw_rune(&self, actor: CreatureId, rune: ItemTypeId, target: Position) -> GameResult<()> {
        self.act(actor, |world| world.throw_rune(actor, rune, target))
    }

    /// Resolves an area effect centered on `center`. A missing caster means
    /// the world itself is the source.
    pub fn make_magic(&self, caster: Option<CreatureId>, center: Position, effect: &MagicEffect) -> GameResult<()> {
        let mut world = self.world.lock();
        let result = world.make_magic(caster, center, effect);
        if let (Err(error), Some(caster)) = (result.as_ref(), caster) {
            world.report(caster, *error);
        }
        result
    }

    pub fn attack(&self, actor: CreatureId, target: Option<CreatureId>) -> GameResult<()> {
        self.act_attack(actor, |world| world.set_attack_target(actor, target))
    }

    /// One single-target hit of `attacker` against its current target.
    pub fn make_damage(&self, attacker: CreatureId, target: CreatureId) -> GameResult<()> {
        self.act_attack(attacker, |world| world.make_damage(attacker, target))
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
