use crate::entities::creature::CreatureId;
use crate::entities::item::{Item, ItemId, ItemTypeId};
use crate::world::item_types::ItemTypeIndex;
use crate::world::position::{Position, PositionDelta, Range};
use std::collections::HashMap;
use std::sync::Arc;

/// How far `place_creature` looks for a free tile around the wanted spot.
const PLACEMENT_RADIUS: i16 = 3;

/// Directions in which stepping onto a tile changes the floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloorChange {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl FloorChange {
    pub fn any(&self) -> bool {
        self.north || self.south || self.east || self.west
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileThing {
    Creature(CreatureId),
    Item(Item),
}

/// A resolved stack position on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSlot {
    Ground,
    Splash,
    Field,
    Thing(usize),
}

/// One map cell. Stack order is ground, splash, field, then creatures and
/// items with the most recently added on top of its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub position: Position,
    pub ground: ItemTypeId,
    pub splash: Option<Item>,
    pub field: Option<Item>,
    things: Vec<TileThing>,
    pub protection_zone: bool,
    /// Walls and other ground that nothing may enter.
    pub blocking: bool,
    /// Ground that drops whoever steps on it to the floor below.
    pub leads_down: bool,
    pub floor_change: FloorChange,
    /// Clock time before which a splash decay command is ignored.
    pub decay_splash_after: u64,
}

impl Tile {
    pub fn new(position: Position, ground: ItemTypeId) -> Self {
        Self {
            position,
            ground,
            splash: None,
            field: None,
            things: Vec::new(),
            protection_zone: false,
            blocking: false,
            leads_down: false,
            floor_change: FloorChange::default(),
            decay_splash_after: 0,
        }
    }

    fn offset(&self) -> usize {
        1 + usize::from(self.splash.is_some()) + usize::from(self.field.is_some())
    }

    pub fn thing_count(&self) -> usize {
        self.offset() + self.things.len()
    }

    pub fn things(&self) -> &[TileThing] {
        &self.things
    }

    pub fn creatures(&self) -> impl Iterator<Item = CreatureId> + '_ {
        self.things.iter().filter_map(|thing| match thing {
            TileThing::Creature(id) => Some(*id),
            TileThing::Item(_) => None,
        })
    }

    pub fn has_creatures(&self) -> bool {
        self.creatures().next().is_some()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.things.iter().filter_map(|thing| match thing {
            TileThing::Item(item) => Some(item),
            TileThing::Creature(_) => None,
        })
    }

    pub fn splash_stackpos(&self) -> Option<usize> {
        self.splash.as_ref().map(|_| 1)
    }

    pub fn field_stackpos(&self) -> Option<usize> {
        self.field
            .as_ref()
            .map(|_| 1 + usize::from(self.splash.is_some()))
    }

    pub fn resolve(&self, stackpos: usize) -> Option<StackSlot> {
        if stackpos == 0 {
            return Some(StackSlot::Ground);
        }
        if Some(stackpos) == self.splash_stackpos() {
            return Some(StackSlot::Splash);
        }
        if Some(stackpos) == self.field_stackpos() {
            return Some(StackSlot::Field);
        }
        let index = stackpos.checked_sub(self.offset())?;
        (index < self.things.len()).then_some(StackSlot::Thing(index))
    }

    pub fn thing_at(&self, stackpos: usize) -> Option<&TileThing> {
        match self.resolve(stackpos)? {
            StackSlot::Thing(index) => self.things.get(index),
            _ => None,
        }
    }

    /// Item at `stackpos`, including the splash and field slots.
    pub fn item_at(&self, stackpos: usize) -> Option<&Item> {
        match self.resolve(stackpos)? {
            StackSlot::Ground => None,
            StackSlot::Splash => self.splash.as_ref(),
            StackSlot::Field => self.field.as_ref(),
            StackSlot::Thing(index) => match self.things.get(index)? {
                TileThing::Item(item) => Some(item),
                TileThing::Creature(_) => None,
            },
        }
    }

    pub fn creature_stackpos(&self, id: CreatureId) -> Option<usize> {
        self.things
            .iter()
            .position(|thing| matches!(thing, TileThing::Creature(creature) if *creature == id))
            .map(|index| index + self.offset())
    }

    pub fn item_stackpos(&self, id: ItemId) -> Option<usize> {
        if self.splash.as_ref().map(|item| item.id) == Some(id) {
            return self.splash_stackpos();
        }
        if self.field.as_ref().map(|item| item.id) == Some(id) {
            return self.field_stackpos();
        }
        self.things
            .iter()
            .position(|thing| matches!(thing, TileThing::Item(item) if item.id == id))
            .map(|index| index + self.offset())
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.things.iter_mut().find_map(|thing| match thing {
            TileThing::Item(item) if item.id == id => Some(item),
            _ => None,
        })
    }

    /// Any item on the tile or inside a container lying on it.
    pub fn find_item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.things.iter_mut().find_map(|thing| match thing {
            TileThing::Item(item) => item.find_mut(id),
            TileThing::Creature(_) => None,
        })
    }

    pub fn find_item(&self, id: ItemId) -> Option<&Item> {
        self.items().find_map(|item| item.find(id))
    }

    /// Puts a creature on top of the creatures already here.
    pub fn add_creature(&mut self, id: CreatureId) -> usize {
        self.things.insert(0, TileThing::Creature(id));
        self.offset()
    }

    /// Puts an item on top of the items already here, below every creature.
    pub fn add_item(&mut self, mut item: Item) -> usize {
        item.position = Some(self.position);
        let index = self.creatures().count();
        self.things.insert(index, TileThing::Item(item));
        index + self.offset()
    }

    pub fn remove_creature(&mut self, id: CreatureId) -> Option<usize> {
        let stackpos = self.creature_stackpos(id)?;
        self.things.remove(stackpos - self.offset());
        Some(stackpos)
    }

    /// Removes a stacked item (not the splash or field).
    pub fn remove_item(&mut self, id: ItemId) -> Option<(usize, Item)> {
        let index = self
            .things
            .iter()
            .position(|thing| matches!(thing, TileThing::Item(item) if item.id == id))?;
        let stackpos = index + self.offset();
        match self.things.remove(index) {
            TileThing::Item(mut item) => {
                item.position = None;
                Some((stackpos, item))
            }
            TileThing::Creature(creature) => {
                self.things.insert(index, TileThing::Creature(creature));
                None
            }
        }
    }

    pub fn is_blocking(&self, items: &ItemTypeIndex) -> bool {
        self.blocking || self.items().any(|item| items.is_blocking(item.type_id))
    }

    /// Whether a creature may stand here.
    pub fn accepts_creature(&self, items: &ItemTypeIndex) -> bool {
        !self.is_blocking(items) && !self.has_creatures()
    }

    pub fn accepts_item(&self, items: &ItemTypeIndex) -> bool {
        !self.is_blocking(items)
    }
}

/// In-memory spatial store: tiles by position.
#[derive(Debug, Clone)]
pub struct Map {
    pub name: String,
    tiles: HashMap<Position, Tile>,
    items: Arc<ItemTypeIndex>,
}

impl Map {
    pub fn new(name: &str, items: Arc<ItemTypeIndex>) -> Self {
        Self {
            name: name.to_string(),
            tiles: HashMap::new(),
            items,
        }
    }

    /// A rectangular floor of plain ground tiles.
    pub fn flat(
        name: &str,
        items: Arc<ItemTypeIndex>,
        origin: Position,
        width: u16,
        height: u16,
        ground: ItemTypeId,
    ) -> Self {
        let mut map = Self::new(name, items);
        for y in origin.y..origin.y.saturating_add(height) {
            for x in origin.x..origin.x.saturating_add(width) {
                map.insert_tile(Tile::new(Position::new(x, y, origin.z), ground));
            }
        }
        map
    }

    pub fn item_types(&self) -> &ItemTypeIndex {
        &self.items
    }

    pub fn shared_item_types(&self) -> Arc<ItemTypeIndex> {
        self.items.clone()
    }

    pub fn insert_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.position, tile);
    }

    pub fn remove_tile(&mut self, position: Position) -> Option<Tile> {
        self.tiles.remove(&position)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn has_tile(&self, position: Position) -> bool {
        self.tiles.contains_key(&position)
    }

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    pub fn tile_mut(&mut self, position: Position) -> Option<&mut Tile> {
        self.tiles.get_mut(&position)
    }

    pub fn is_protection_zone(&self, position: Position) -> bool {
        self.tile(position)
            .map(|tile| tile.protection_zone)
            .unwrap_or(false)
    }

    pub fn is_blocking(&self, position: Position) -> bool {
        self.tile(position)
            .map(|tile| tile.is_blocking(&self.items))
            .unwrap_or(true)
    }

    /// `wanted` or the closest tile on the same floor a creature may stand on.
    ///
    /// Rings are searched outwards, row by row, so the choice is deterministic.
    pub fn find_free_tile(&self, wanted: Position) -> Option<Position> {
        for radius in 0..=PLACEMENT_RADIUS {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let Some(candidate) = wanted.offset(PositionDelta { dx, dy, dz: 0 }) else {
                        continue;
                    };
                    let free = self
                        .tile(candidate)
                        .map(|tile| tile.accepts_creature(&self.items))
                        .unwrap_or(false);
                    if free {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Puts `id` on `wanted` or the closest free tile on the same floor.
    pub fn place_creature(&mut self, id: CreatureId, wanted: Position) -> Option<(Position, usize)> {
        let position = self.find_free_tile(wanted)?;
        let stackpos = self.tile_mut(position)?.add_creature(id);
        Some((position, stackpos))
    }

    pub fn remove_creature(&mut self, id: CreatureId, position: Position) -> Option<usize> {
        self.tile_mut(position)?.remove_creature(id)
    }

    /// Creatures standing inside `range`, ordered by floor, row, column and stack.
    pub fn spectators(&self, range: &Range) -> Vec<CreatureId> {
        let mut found = Vec::new();
        for z in range.min_z..=range.max_z {
            for y in range.min_y..=range.max_y {
                for x in range.min_x..=range.max_x {
                    if let Some(tile) = self.tile(Position::new(x, y, z)) {
                        found.extend(tile.creatures());
                    }
                }
            }
        }
        found
    }

    /// Whether a thing can travel in a straight line from `from` to `to`.
    ///
    /// Every tile on the way must exist and be open; creatures only obstruct
    /// when `creatures_block` is set. A projectile may land on a blocking tile.
    pub fn can_throw_item_to(
        &self,
        from: Position,
        to: Position,
        creatures_block: bool,
        projectile: bool,
    ) -> bool {
        if from.z != to.z {
            return false;
        }
        let Some(target) = self.tile(to) else {
            return false;
        };
        if !projectile && target.is_blocking(&self.items) {
            return false;
        }
        line_between(from, to)
            .into_iter()
            .filter(|position| *position != from && *position != to)
            .all(|position| match self.tile(position) {
                Some(tile) => {
                    !tile.is_blocking(&self.items) && !(creatures_block && tile.has_creatures())
                }
                None => false,
            })
    }
}

/// Tiles on the Bresenham line from `from` to `to`, both ends included.
fn line_between(from: Position, to: Position) -> Vec<Position> {
    let (mut x, mut y) = (i32::from(from.x), i32::from(from.y));
    let (x1, y1) = (i32::from(to.x), i32::from(to.y));
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut line = Vec::new();
    loop {
        line.push(Position::new(x as u16, y as u16, from.z));
        if x == x1 && y == y1 {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> Map {
        Map::flat(
            "test",
            Arc::new(ItemTypeIndex::standard()),
            Position::new(100, 100, 7),
            10,
            10,
            ItemTypeId(100),
        )
    }

    #[test]
    fn stack_positions_follow_ground_splash_field_order() {
        let mut map = map();
        let tile = map.tile_mut(Position::new(101, 101, 7)).expect("tile");
        let coin = Item::new(ItemTypeId(3031), 1);
        let coin_id = coin.id;
        assert_eq!(tile.add_item(coin), 1);
        assert_eq!(tile.add_creature(CreatureId(9)), 1);
        assert_eq!(tile.item_stackpos(coin_id), Some(2));

        tile.splash = Some(Item::new(ItemTypeId(2019), 2));
        assert_eq!(tile.creature_stackpos(CreatureId(9)), Some(2));
        assert_eq!(tile.item_stackpos(coin_id), Some(3));
        assert_eq!(tile.resolve(1), Some(StackSlot::Splash));
        assert_eq!(tile.thing_count(), 4);

        let (stackpos, removed) = tile.remove_item(coin_id).expect("removed");
        assert_eq!(stackpos, 3);
        assert_eq!(removed.position, None);
    }

    #[test]
    fn placement_skips_occupied_tiles() {
        let mut map = map();
        let wanted = Position::new(105, 105, 7);
        let (first, _) = map.place_creature(CreatureId(1), wanted).expect("placed");
        assert_eq!(first, wanted);
        let (second, _) = map.place_creature(CreatureId(2), wanted).expect("placed");
        assert_eq!(second.distance(wanted), 1);
        assert_eq!(map.spectators(&Range::around(wanted, false)).len(), 2);
    }

    #[test]
    fn walls_block_throwing_but_not_projectiles_landing_on_them() {
        let mut map = map();
        let wall = Position::new(103, 100, 7);
        map.tile_mut(wall).expect("tile").blocking = true;
        let from = Position::new(101, 100, 7);
        assert!(!map.can_throw_item_to(from, Position::new(105, 100, 7), false, false));
        assert!(!map.can_throw_item_to(from, wall, false, false));
        assert!(map.can_throw_item_to(from, wall, false, true));
        assert!(map.can_throw_item_to(from, Position::new(101, 105, 7), false, false));
        assert!(!map.can_throw_item_to(from, Position::new(101, 100, 6), false, false));
    }

    #[test]
    fn creatures_only_block_when_asked() {
        let mut map = map();
        map.place_creature(CreatureId(3), Position::new(102, 102, 7));
        let from = Position::new(101, 101, 7);
        let to = Position::new(103, 103, 7);
        assert!(map.can_throw_item_to(from, to, false, true));
        assert!(!map.can_throw_item_to(from, to, true, true));
    }

    #[test]
    fn spectators_are_listed_in_stable_order() {
        let mut map = map();
        map.place_creature(CreatureId(7), Position::new(104, 101, 7));
        map.place_creature(CreatureId(5), Position::new(101, 103, 7));
        map.place_creature(CreatureId(6), Position::new(102, 101, 7));
        let range = Range::around(Position::new(103, 102, 7), false);
        assert_eq!(
            map.spectators(&range),
            vec![CreatureId(6), CreatureId(7), CreatureId(5)]
        );
    }
}
