use super::notify::Outbox;
use super::World;
use crate::combat::magic::MagicEffect;
use crate::entities::creature::{Creature, CreatureId};
use crate::entities::inventory::InventorySlot;
use crate::entities::item::{Item, ItemId};
use crate::entities::player::{ContainerRoot, OpenContainer, PlayerData};
use crate::error::{GameError, GameResult};
use crate::net::message::{MessagePart, ThingSnapshot};
use crate::world::map::{FloorChange, StackSlot, TileThing};
use crate::world::position::{Direction, Position, PositionDelta};
use std::collections::BTreeSet;

/// Where an item is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLocation {
    Ground { position: Position, stackpos: usize },
    /// Slot `index` of one of the actor's open container windows.
    Container { cid: u8, index: usize },
    Slot(InventorySlot),
}

/// Where a moved item is put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTarget {
    Ground(Position),
    Container(u8),
    Slot(InventorySlot),
}

/// Floor-change offsets ordered NE, NW, SE, SW, N, S, E, W.
type FloorTable = [(i16, i16, i8); 8];

/// Walking off a ledge onto the ramp one floor down.
const LEDGE_DOWN: FloorTable = [
    (-2, 2, 1),
    (2, 2, 1),
    (-2, -2, 1),
    (2, -2, 1),
    (0, 2, 1),
    (0, -2, 1),
    (-2, 0, 1),
    (2, 0, 1),
];

/// Stepping into a hole above a ramp.
const HOLE_DOWN: FloorTable = [
    (-1, 1, 1),
    (1, 1, 1),
    (-1, -1, 1),
    (1, -1, 1),
    (0, 1, 1),
    (0, -1, 1),
    (-1, 0, 1),
    (1, 0, 1),
];

/// Stepping onto stairs or a ramp leading up.
const RAMP_UP: FloorTable = [
    (1, -1, -1),
    (-1, -1, -1),
    (1, 1, -1),
    (-1, 1, -1),
    (0, -1, -1),
    (0, 1, -1),
    (1, 0, -1),
    (-1, 0, -1),
];

/// Offset for a tile's floor-change flags. Diagonal combinations win over
/// single directions.
fn floor_offset(flags: FloorChange, table: &FloorTable) -> Option<PositionDelta> {
    let index = if flags.north && flags.east {
        0
    } else if flags.north && flags.west {
        1
    } else if flags.south && flags.east {
        2
    } else if flags.south && flags.west {
        3
    } else if flags.north {
        4
    } else if flags.south {
        5
    } else if flags.east {
        6
    } else if flags.west {
        7
    } else {
        return None;
    };
    let (dx, dy, dz) = table[index];
    Some(PositionDelta { dx, dy, dz })
}

const STRAIGHT_DOWN: PositionDelta = PositionDelta { dx: 0, dy: 0, dz: 1 };

impl World {
    pub(crate) fn player(&self, id: CreatureId) -> GameResult<&PlayerData> {
        self.creature(id)?.player_data().ok_or(GameError::Rejected)
    }

    pub(crate) fn player_mut(&mut self, id: CreatureId) -> GameResult<&mut PlayerData> {
        self.creature_mut(id)?
            .player_data_mut()
            .ok_or(GameError::Rejected)
    }

    /// One step of a creature's own walk. A refusal cancels the client's walk.
    pub fn walk(&mut self, actor: CreatureId, direction: Direction) -> GameResult<Position> {
        let result = self.try_walk(actor, direction);
        if let Err(error) = result {
            tracing::debug!(actor = actor.0, %error, "walk refused");
            if let Some(creature) = self.creatures.get(actor) {
                if let Some(session) = creature.session() {
                    session.send(crate::net::message::OutboundMessage::single(
                        MessagePart::CancelWalk {
                            text: error.cancel_text().to_string(),
                            direction: creature.direction,
                        },
                    ));
                }
            }
        }
        result
    }

    fn try_walk(&mut self, actor: CreatureId, direction: Direction) -> GameResult<Position> {
        let from = self.creature(actor)?.position;
        let to = from.step(direction).ok_or(GameError::Rejected)?;
        if !self.map.has_tile(to) {
            return self.walk_off_ledge(actor, to);
        }
        self.move_creature(actor, actor, to)
    }

    fn walk_off_ledge(&mut self, actor: CreatureId, to: Position) -> GameResult<Position> {
        let creature = self.creature(actor)?;
        if !creature.is_player() {
            return Err(GameError::Rejected);
        }
        let below = to.offset(STRAIGHT_DOWN).ok_or(GameError::Rejected)?;
        let flags = self
            .map
            .tile(below)
            .map(|tile| tile.floor_change)
            .ok_or(GameError::Rejected)?;
        let delta = floor_offset(flags, &LEDGE_DOWN).ok_or(GameError::Rejected)?;
        let destination = creature
            .position
            .offset(delta)
            .ok_or(GameError::Rejected)?;
        self.teleport(actor, destination)
    }

    /// Moves `target` one tile to `to`, on behalf of `actor`.
    ///
    /// Returns where the creature ended up, which differs from `to` when the
    /// destination changes floors.
    pub fn move_creature(
        &mut self,
        actor: CreatureId,
        target: CreatureId,
        to: Position,
    ) -> GameResult<Position> {
        let mover = self.creature(actor)?;
        let moved = self.creature(target)?;
        let from = moved.position;
        let pushing = actor != target;

        if pushing && !mover.position.within(from, 1, 1) {
            return Err(GameError::TooFar);
        }
        if !from.within(to, 1, 1) {
            return Err(GameError::TooFar);
        }
        if from == to {
            return Ok(from);
        }
        let to_tile = self.map.tile(to).ok_or(GameError::Rejected)?;
        if !to_tile.accepts_creature(self.item_types()) {
            return Err(GameError::Rejected);
        }
        if pushing && moved.access > mover.access {
            return Err(GameError::TargetPrivileged);
        }
        if moved.is_player() {
            if moved.timers.pz_locked && to_tile.protection_zone {
                return Err(GameError::ProtectionZoneViolation);
            }
            if pushing && self.map.is_protection_zone(from) && !to_tile.protection_zone {
                return Err(GameError::ProtectionZoneViolation);
            }
        }

        self.apply_creature_move(target, from, to)?;
        let position = match self.floor_change_after_move(target, to) {
            Some(position) => position,
            None => {
                self.step_into_field(target, to);
                to
            }
        };
        Ok(position)
    }

    fn apply_creature_move(&mut self, id: CreatureId, from: Position, to: Position) -> GameResult<()> {
        let from_stackpos = self
            .map
            .remove_creature(id, from)
            .ok_or(GameError::NotPossible)?;
        let Some(tile) = self.map.tile_mut(to) else {
            debug_assert!(false, "validated destination tile vanished");
            return Err(GameError::NotPossible);
        };
        let to_stackpos = tile.add_creature(id);
        let creature = self.creature_mut(id)?;
        creature.position = to;
        creature.direction = Direction::facing_after_move(from, to, creature.direction);
        let snapshot = creature.snapshot();

        let mut spectators = self.spectators_of(from);
        spectators.extend(self.spectators_of(to));
        spectators.sort();
        spectators.dedup();

        let mut outbox = Outbox::new();
        for spectator in spectators {
            if spectator == id {
                outbox.push(
                    spectator,
                    MessagePart::CreatureMove {
                        creature: id,
                        from,
                        from_stackpos,
                        to,
                    },
                );
                continue;
            }
            let sees_from = self.sees(spectator, from);
            let sees_to = self.sees(spectator, to);
            let part = match (sees_from, sees_to) {
                (true, true) => MessagePart::CreatureMove {
                    creature: id,
                    from,
                    from_stackpos,
                    to,
                },
                (true, false) => MessagePart::CreatureDisappear {
                    creature: id,
                    position: from,
                    stackpos: from_stackpos,
                },
                (false, true) => MessagePart::CreatureAppear {
                    position: to,
                    stackpos: to_stackpos,
                    creature: snapshot.clone(),
                },
                (false, false) => continue,
            };
            outbox.push(spectator, part);
        }

        let crowded = self
            .map
            .tile(from)
            .map(|tile| tile.thing_count() > self.settings.combat.max_stack)
            .unwrap_or(false);
        if crowded {
            let part = MessagePart::TileUpdated { position: from };
            outbox.push_all(&self.spectators_of(from), &part);
        }

        self.check_engagement(id, &mut outbox);
        self.close_distant_containers(id, &mut outbox);
        outbox.deliver(&self.creatures);
        Ok(())
    }

    /// Drops attacks that `moved` is part of once the two sides are too far apart.
    pub(crate) fn check_engagement(&mut self, moved: CreatureId, outbox: &mut Outbox) {
        let range_x = self.settings.combat.engagement_range_x;
        let range_y = self.settings.combat.engagement_range_y;
        let dropped: Vec<CreatureId> = self
            .creatures
            .iter()
            .filter_map(|creature| {
                let target = creature.attack_target?;
                if creature.id != moved && target != moved {
                    return None;
                }
                let in_range = self
                    .creatures
                    .get(target)
                    .map(|target| creature.position.within(target.position, range_x, range_y))
                    .unwrap_or(false);
                (!in_range).then_some(creature.id)
            })
            .collect();
        for id in dropped {
            if let Some(creature) = self.creatures.get_mut(id) {
                creature.attack_target = None;
            }
            outbox.push(id, MessagePart::CancelAttack);
        }
    }

    /// Closes the player's windows on ground containers it walked away from.
    fn close_distant_containers(&mut self, id: CreatureId, outbox: &mut Outbox) {
        let Some(creature) = self.creatures.get_mut(id) else {
            return;
        };
        let position = creature.position;
        let Some(player) = creature.player_data_mut() else {
            return;
        };
        let distant: Vec<u8> = player
            .open_containers
            .iter()
            .filter(|(_, open)| match open.root {
                ContainerRoot::Ground(root) => !position.within(root, 1, 1),
                ContainerRoot::Slot(_) => false,
            })
            .map(|(cid, _)| *cid)
            .collect();
        for cid in distant {
            player.open_containers.remove(&cid);
            outbox.push(id, MessagePart::ContainerClosed { cid });
        }
    }

    /// Sends a player that stepped on stairs, a ramp or a hole to the next floor.
    fn floor_change_after_move(&mut self, id: CreatureId, at: Position) -> Option<Position> {
        if !self.creatures.get(id)?.is_player() {
            return None;
        }
        let tile = self.map.tile(at)?;
        let delta = if tile.leads_down {
            let below = at.offset(STRAIGHT_DOWN)?;
            let flags = self.map.tile(below)?.floor_change;
            floor_offset(flags, &HOLE_DOWN).unwrap_or(STRAIGHT_DOWN)
        } else {
            floor_offset(tile.floor_change, &RAMP_UP)?
        };
        let destination = at.offset(delta)?;
        match self.teleport(id, destination) {
            Ok(position) => Some(position),
            Err(error) => {
                tracing::warn!(creature = id.0, ?destination, %error, "floor change failed");
                None
            }
        }
    }

    /// Applies the field lying at `position` to a creature that entered it.
    fn step_into_field(&mut self, id: CreatureId, position: Position) {
        let Some(field) = self
            .map
            .tile(position)
            .and_then(|tile| tile.field.as_ref())
            .and_then(Item::as_field)
            .cloned()
        else {
            return;
        };
        if !self.creatures.contains(id) {
            return;
        }
        let owner = field.owner.filter(|owner| self.creatures.contains(*owner));
        let effect = MagicEffect::field_step(&field.damage);
        if let Err(error) = self.hit_from_world(owner, id, &effect) {
            tracing::debug!(creature = id.0, ?position, %error, "field had no effect");
        }
    }

    /// Moves a creature to `to` (or the nearest free tile) without walking.
    pub fn teleport(&mut self, id: CreatureId, to: Position) -> GameResult<Position> {
        let from = self.creature(id)?.position;
        if from == to {
            return Ok(from);
        }
        let destination = self.map.find_free_tile(to).ok_or(GameError::Rejected)?;
        let old_spectators = self.spectators_of(from);
        let from_stackpos = self
            .map
            .remove_creature(id, from)
            .ok_or(GameError::NotPossible)?;
        let Some(tile) = self.map.tile_mut(destination) else {
            return Err(GameError::NotPossible);
        };
        tile.add_creature(id);
        self.creature_mut(id)?.position = destination;

        let mut outbox = Outbox::new();
        outbox.push_all(&old_spectators, &MessagePart::TileUpdated { position: from });
        outbox.push_all(
            &self.spectators_of(destination),
            &MessagePart::Teleport {
                creature: id,
                from,
                from_stackpos,
                to: destination,
            },
        );
        self.check_engagement(id, &mut outbox);
        self.close_distant_containers(id, &mut outbox);
        outbox.deliver(&self.creatures);
        tracing::debug!(creature = id.0, ?from, to = ?destination, "teleported");
        Ok(destination)
    }

    pub fn turn(&mut self, actor: CreatureId, direction: Direction) -> GameResult<()> {
        let creature = self.creature_mut(actor)?;
        if creature.direction == direction {
            return Ok(());
        }
        creature.direction = direction;
        let position = creature.position;
        let stackpos = self
            .map
            .tile(position)
            .and_then(|tile| tile.creature_stackpos(actor))
            .ok_or(GameError::NotPossible)?;
        let mut outbox = Outbox::new();
        outbox.push_all(
            &self.spectators_of(position),
            &MessagePart::CreatureTurn {
                creature: actor,
                stackpos,
                direction,
            },
        );
        outbox.deliver(&self.creatures);
        Ok(())
    }

    /// Moves whatever occupies `stackpos` at `from` to the tile `to`.
    pub fn move_ground_thing(
        &mut self,
        actor: CreatureId,
        from: Position,
        stackpos: usize,
        to: Position,
    ) -> GameResult<()> {
        let creature = match self
            .map
            .tile(from)
            .ok_or(GameError::NotPossible)?
            .thing_at(stackpos)
        {
            Some(TileThing::Creature(id)) => Some(*id),
            _ => None,
        };
        match creature {
            Some(id) => self.move_creature(actor, id, to).map(|_| ()),
            None => self.move_item(
                actor,
                ItemLocation::Ground {
                    position: from,
                    stackpos,
                },
                ItemTarget::Ground(to),
            ),
        }
    }

    pub(crate) fn open_window(&self, actor: CreatureId, cid: u8) -> GameResult<OpenContainer> {
        self.player(actor)?
            .open_containers
            .get(&cid)
            .copied()
            .ok_or(GameError::NotPossible)
    }

    fn container_item(&self, actor: CreatureId, open: OpenContainer) -> GameResult<&Item> {
        let found = match open.root {
            ContainerRoot::Slot(slot) => self
                .player(actor)?
                .inventory
                .slot(slot)
                .and_then(|root| root.find(open.item)),
            ContainerRoot::Ground(position) => self
                .map
                .tile(position)
                .and_then(|tile| tile.find_item(open.item)),
        };
        found.ok_or(GameError::NotPossible)
    }

    fn container_item_mut(&mut self, actor: CreatureId, open: OpenContainer) -> GameResult<&mut Item> {
        let found = match open.root {
            ContainerRoot::Slot(slot) => self
                .creatures
                .get_mut(actor)
                .and_then(Creature::player_data_mut)
                .and_then(|player| player.inventory.slot_mut(slot))
                .and_then(|root| root.find_mut(open.item)),
            ContainerRoot::Ground(position) => self
                .map
                .tile_mut(position)
                .and_then(|tile| tile.find_item_mut(open.item)),
        };
        found.ok_or(GameError::NotPossible)
    }

    /// The item at `location`, as seen by `actor`.
    pub(crate) fn item_at(&self, actor: CreatureId, location: ItemLocation) -> GameResult<&Item> {
        match location {
            ItemLocation::Ground { position, stackpos } => self
                .map
                .tile(position)
                .and_then(|tile| tile.item_at(stackpos))
                .ok_or(GameError::NotPossible),
            ItemLocation::Container { cid, index } => {
                let open = self.open_window(actor, cid)?;
                self.container_item(actor, open)?
                    .as_container()
                    .and_then(|data| data.items.get(index))
                    .ok_or(GameError::NotPossible)
            }
            ItemLocation::Slot(slot) => self
                .player(actor)?
                .inventory
                .slot(slot)
                .ok_or(GameError::NotPossible),
        }
    }

    /// Moves an item between the map, open containers and equipment slots.
    ///
    /// Every check runs before anything is touched; a refused move changes
    /// nothing.
    pub fn move_item(&mut self, actor: CreatureId, source: ItemLocation, target: ItemTarget) -> GameResult<()> {
        let actor_position = self.creature(actor)?.position;
        let item = self.item_at(actor, source)?;
        let (item_id, type_id) = (item.id, item.type_id);

        let origin = match source {
            ItemLocation::Ground { position, stackpos } => {
                if !actor_position.within(position, 1, 1) {
                    return Err(GameError::TooFar);
                }
                let slot = self.map.tile(position).and_then(|tile| tile.resolve(stackpos));
                if !matches!(slot, Some(StackSlot::Thing(_))) {
                    return Err(GameError::Immovable);
                }
                position
            }
            ItemLocation::Container { .. } | ItemLocation::Slot(_) => actor_position,
        };
        if !self.item_types().is_movable(type_id) {
            return Err(GameError::Immovable);
        }

        match target {
            ItemTarget::Ground(to) => {
                let range = self.item_types().throw_range(type_id).max(1);
                if !origin.within(to, range, range) {
                    return Err(GameError::TooFar);
                }
                if !self.map.can_throw_item_to(origin, to, false, true) {
                    return Err(GameError::NoPath);
                }
                let tile = self.map.tile(to).ok_or(GameError::Rejected)?;
                if !tile.accepts_item(self.item_types()) {
                    return Err(GameError::Rejected);
                }
                if matches!(source, ItemLocation::Ground { position, .. } if position == to) {
                    return Ok(());
                }
            }
            ItemTarget::Container(cid) => {
                if !self.item_types().is_pickupable(type_id) {
                    return Err(GameError::Rejected);
                }
                let open = self.open_window(actor, cid)?;
                if let ContainerRoot::Ground(root) = open.root {
                    if !actor_position.within(root, 1, 1) {
                        return Err(GameError::TooFar);
                    }
                }
                let container = self.container_item(actor, open)?;
                let data = container.as_container().ok_or(GameError::Rejected)?;
                if container.id == item_id || item.holds(container.id) {
                    return Err(GameError::Rejected);
                }
                if let ItemLocation::Container { cid: from_cid, .. } = source {
                    if self.open_window(actor, from_cid)?.item == container.id {
                        return Ok(());
                    }
                }
                if !data.has_room() {
                    return Err(GameError::Rejected);
                }
            }
            ItemTarget::Slot(slot) => {
                if source == ItemLocation::Slot(slot) {
                    return Ok(());
                }
                if !self.item_types().is_pickupable(type_id) {
                    return Err(GameError::Rejected);
                }
                if !self.player(actor)?.inventory.is_empty_slot(slot) {
                    return Err(GameError::Rejected);
                }
            }
        }

        let mut outbox = Outbox::new();
        let item = self.take_item(actor, source, &mut outbox)?;
        self.close_windows_into(&item, &mut outbox);
        if let Err(item) = self.put_item(actor, target, item, &mut outbox) {
            tracing::error!(actor = actor.0, item = item.id.0, "validated move lost its target");
            if let Some(tile) = self.map.tile_mut(actor_position) {
                tile.add_item(item);
            }
        }
        if let ItemLocation::Ground { position, .. } = source {
            let crowded = self
                .map
                .tile(position)
                .map(|tile| tile.thing_count() > self.settings.combat.max_stack)
                .unwrap_or(false);
            if crowded {
                outbox.push_all(
                    &self.spectators_of(position),
                    &MessagePart::TileUpdated { position },
                );
            }
        }
        outbox.deliver(&self.creatures);
        tracing::trace!(actor = actor.0, item = item_id.0, ?source, ?target, "item moved");
        Ok(())
    }

    fn take_item(&mut self, actor: CreatureId, source: ItemLocation, outbox: &mut Outbox) -> GameResult<Item> {
        match source {
            ItemLocation::Ground { position, stackpos } => {
                let tile = self.map.tile_mut(position).ok_or(GameError::NotPossible)?;
                let id = tile.item_at(stackpos).ok_or(GameError::NotPossible)?.id;
                let (stackpos, item) = tile.remove_item(id).ok_or(GameError::NotPossible)?;
                outbox.push_all(
                    &self.spectators_of(position),
                    &MessagePart::RemoveThing { position, stackpos },
                );
                Ok(item)
            }
            ItemLocation::Container { cid, index } => {
                let open = self.open_window(actor, cid)?;
                let item = self
                    .container_item_mut(actor, open)?
                    .as_container_mut()
                    .and_then(|data| data.remove(index))
                    .ok_or(GameError::NotPossible)?;
                self.notify_watchers(open.item, |cid| MessagePart::ContainerRemove { cid, index }, outbox);
                Ok(item)
            }
            ItemLocation::Slot(slot) => {
                let item = self
                    .player_mut(actor)?
                    .inventory
                    .take(slot)
                    .ok_or(GameError::NotPossible)?;
                outbox.push(actor, MessagePart::InventorySlot { slot, item: None });
                Ok(item)
            }
        }
    }

    fn put_item(
        &mut self,
        actor: CreatureId,
        target: ItemTarget,
        item: Item,
        outbox: &mut Outbox,
    ) -> Result<(), Item> {
        let snapshot = item.snapshot();
        match target {
            ItemTarget::Ground(position) => {
                let Some(tile) = self.map.tile_mut(position) else {
                    return Err(item);
                };
                tile.add_item(item);
                outbox.push_all(
                    &self.spectators_of(position),
                    &MessagePart::AddThing {
                        position,
                        thing: ThingSnapshot::Item(snapshot),
                    },
                );
            }
            ItemTarget::Container(cid) => {
                let Ok(open) = self.open_window(actor, cid) else {
                    return Err(item);
                };
                let Some(data) = self
                    .container_item_mut(actor, open)
                    .ok()
                    .and_then(Item::as_container_mut)
                else {
                    return Err(item);
                };
                data.insert(item);
                self.notify_watchers(open.item, |cid| MessagePart::ContainerAdd { cid, item: snapshot }, outbox);
            }
            ItemTarget::Slot(slot) => {
                let Ok(player) = self.player_mut(actor) else {
                    return Err(item);
                };
                player.inventory.put(slot, item)?;
                outbox.push(
                    actor,
                    MessagePart::InventorySlot {
                        slot,
                        item: Some(snapshot),
                    },
                );
            }
        }
        Ok(())
    }

    /// Queues `part` for every window that shows `container`.
    fn notify_watchers(&self, container: ItemId, part: impl Fn(u8) -> MessagePart, outbox: &mut Outbox) {
        for creature in self.creatures.players() {
            let Some(player) = creature.player_data() else {
                continue;
            };
            for cid in player.windows_showing(container) {
                outbox.push(creature.id, part(cid));
            }
        }
    }

    /// Closes every window showing `item` or a container inside it.
    fn close_windows_into(&mut self, item: &Item, outbox: &mut Outbox) {
        let mut inside = BTreeSet::new();
        item.walk(&mut |nested| {
            if nested.is_container() {
                inside.insert(nested.id);
            }
        });
        if inside.is_empty() {
            return;
        }
        let watchers: Vec<CreatureId> = self.creatures.players().map(|creature| creature.id).collect();
        for id in watchers {
            let Some(player) = self.creatures.get_mut(id).and_then(Creature::player_data_mut) else {
                continue;
            };
            let closing: Vec<u8> = player
                .open_containers
                .iter()
                .filter(|(_, open)| inside.contains(&open.item))
                .map(|(cid, _)| *cid)
                .collect();
            for cid in closing {
                player.open_containers.remove(&cid);
                outbox.push(id, MessagePart::ContainerClosed { cid });
            }
        }
    }

    /// Opens a container window; a container already open keeps its window.
    pub fn open_container(&mut self, actor: CreatureId, location: ItemLocation) -> GameResult<u8> {
        let actor_position = self.creature(actor)?.position;
        if let ItemLocation::Ground { position, .. } = location {
            if !actor_position.within(position, 1, 1) {
                return Err(GameError::TooFar);
            }
        }
        let item = self.item_at(actor, location)?;
        let data = item.as_container().ok_or(GameError::Rejected)?;
        let opened = |cid| MessagePart::ContainerOpened {
            cid,
            container: item.snapshot(),
            capacity: data.capacity,
            items: data.items.iter().map(Item::snapshot).collect(),
        };
        let item_id = item.id;
        let root = match location {
            ItemLocation::Ground { position, .. } => ContainerRoot::Ground(position),
            ItemLocation::Slot(slot) => ContainerRoot::Slot(slot),
            ItemLocation::Container { cid, .. } => self.open_window(actor, cid)?.root,
        };
        let player = self.player(actor)?;
        let cid = match player.container_window(item_id) {
            Some(cid) => cid,
            None => player.free_container_slot().ok_or(GameError::Rejected)?,
        };
        let part = opened(cid);

        self.player_mut(actor)?
            .open_containers
            .insert(cid, OpenContainer { item: item_id, root });
        let mut outbox = Outbox::new();
        outbox.push(actor, part);
        outbox.deliver(&self.creatures);
        Ok(cid)
    }

    pub fn close_container(&mut self, actor: CreatureId, cid: u8) -> GameResult<()> {
        self.player_mut(actor)?
            .open_containers
            .remove(&cid)
            .ok_or(GameError::NotPossible)?;
        let mut outbox = Outbox::new();
        outbox.push(actor, MessagePart::ContainerClosed { cid });
        outbox.deliver(&self.creatures);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::item::ItemTypeId;
    use crate::entities::skills::Vocation;
    use crate::game::testing::{floor, world_with_map};
    use crate::net::session::RecordingSink;

    fn at(x: u16, y: u16) -> Position {
        Position::new(x, y, 7)
    }

    #[test]
    fn diagonal_ramp_flags_pick_the_diagonal_offset() {
        let flags = FloorChange {
            north: true,
            east: true,
            ..FloorChange::default()
        };
        assert_eq!(
            floor_offset(flags, &RAMP_UP),
            Some(PositionDelta { dx: 1, dy: -1, dz: -1 })
        );
        let north = FloorChange {
            north: true,
            ..FloorChange::default()
        };
        assert_eq!(
            floor_offset(north, &RAMP_UP),
            Some(PositionDelta { dx: 0, dy: -1, dz: -1 })
        );
        assert_eq!(floor_offset(FloorChange::default(), &LEDGE_DOWN), None);
    }

    #[test]
    fn walking_updates_facing_and_notifies_both_sides() {
        let (mut world, _clock) = world_with_map(floor());
        let sink = RecordingSink::new();
        let walker = Creature::player("Walker", at(105, 105), Vocation::Knight).with_session(sink.session());
        let id = walker.id;
        world.place_creature(walker).expect("placed");
        sink.clear();

        let position = world.walk(id, Direction::Northeast).expect("walked");
        assert_eq!(position, at(106, 104));
        let creature = world.creature(id).expect("creature");
        assert_eq!(creature.direction, Direction::East);
        assert!(sink
            .parts()
            .iter()
            .any(|part| matches!(part, MessagePart::CreatureMove { to, .. } if *to == at(106, 104))));
    }

    #[test]
    fn walking_into_a_wall_cancels_the_walk() {
        let mut map = floor();
        map.tile_mut(at(105, 104)).expect("tile").blocking = true;
        let (mut world, _clock) = world_with_map(map);
        let sink = RecordingSink::new();
        let hero = Creature::player("Hero", at(105, 105), Vocation::None).with_session(sink.session());
        let id = hero.id;
        world.place_creature(hero).expect("placed");
        sink.clear();

        assert_eq!(world.walk(id, Direction::North), Err(GameError::Rejected));
        assert_eq!(world.creature(id).expect("hero").position, at(105, 105));
        assert!(matches!(sink.parts()[0], MessagePart::CancelWalk { .. }));
    }

    #[test]
    fn container_cannot_swallow_itself() {
        let (mut world, _clock) = world_with_map(floor());
        let hero = Creature::player("Hero", at(105, 105), Vocation::None);
        let id = hero.id;
        world.place_creature(hero).expect("placed");
        let bag = world.item_types().instantiate(ItemTypeId(1987), 1);
        world
            .player_mut(id)
            .expect("player")
            .inventory
            .put(InventorySlot::Backpack, bag)
            .expect("equipped");
        let cid = world
            .open_container(id, ItemLocation::Slot(InventorySlot::Backpack))
            .expect("opened");

        let result = world.move_item(id, ItemLocation::Slot(InventorySlot::Backpack), ItemTarget::Container(cid));
        assert_eq!(result, Err(GameError::Rejected));
        assert!(!world
            .player(id)
            .expect("player")
            .inventory
            .is_empty_slot(InventorySlot::Backpack));
    }

    #[test]
    fn full_container_rejects_more_items() {
        let (mut world, _clock) = world_with_map(floor());
        let hero = Creature::player("Hero", at(105, 105), Vocation::None);
        let id = hero.id;
        world.place_creature(hero).expect("placed");
        let mut bag = Item::container(ItemTypeId(1987), 1);
        bag.as_container_mut()
            .expect("container")
            .insert(Item::new(ItemTypeId(3003), 1));
        world
            .player_mut(id)
            .expect("player")
            .inventory
            .put(InventorySlot::Backpack, bag)
            .expect("equipped");
        let cid = world
            .open_container(id, ItemLocation::Slot(InventorySlot::Backpack))
            .expect("opened");
        world
            .map
            .tile_mut(at(105, 106))
            .expect("tile")
            .add_item(Item::new(ItemTypeId(3264), 1));

        let result = world.move_item(
            id,
            ItemLocation::Ground {
                position: at(105, 106),
                stackpos: 1,
            },
            ItemTarget::Container(cid),
        );
        assert_eq!(result, Err(GameError::Rejected));
        assert_eq!(world.map.tile(at(105, 106)).expect("tile").items().count(), 1);
    }

    #[test]
    fn items_can_only_be_thrown_within_range() {
        let (mut world, _clock) = world_with_map(floor());
        let hero = Creature::player("Hero", at(105, 105), Vocation::None);
        let id = hero.id;
        world.place_creature(hero).expect("placed");
        world
            .map
            .tile_mut(at(105, 106))
            .expect("tile")
            .add_item(Item::new(ItemTypeId(3031), 10));
        let coins = ItemLocation::Ground {
            position: at(105, 106),
            stackpos: 1,
        };

        assert_eq!(
            world.move_item(id, coins, ItemTarget::Ground(at(105, 110))),
            Err(GameError::TooFar)
        );
        world
            .move_item(id, coins, ItemTarget::Ground(at(105, 108)))
            .expect("thrown");
        assert_eq!(world.map.tile(at(105, 108)).expect("tile").items().count(), 1);
    }

    #[test]
    fn ground_containers_close_when_walking_away() {
        let (mut world, _clock) = world_with_map(floor());
        let hero = Creature::player("Hero", at(105, 105), Vocation::None);
        let id = hero.id;
        world.place_creature(hero).expect("placed");
        let bag = world.item_types().instantiate(ItemTypeId(1987), 1);
        let stackpos = world.map.tile_mut(at(105, 106)).expect("tile").add_item(bag);
        world
            .open_container(
                id,
                ItemLocation::Ground {
                    position: at(105, 106),
                    stackpos,
                },
            )
            .expect("opened");

        world.walk(id, Direction::North).expect("walked");
        assert!(world.player(id).expect("player").open_containers.contains_key(&0));
        world.walk(id, Direction::North).expect("walked");
        assert!(world.player(id).expect("player").open_containers.is_empty());
    }
}
