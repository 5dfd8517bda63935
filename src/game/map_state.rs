use crate::entities::creature::CreatureId;
use crate::entities::item::{Item, ItemSnapshot};
use crate::net::message::{MessagePart, ThingSnapshot};
use crate::world::map::Map;
use crate::world::position::Position;
use crate::world::viewport::Viewport;

/// One tile change made while resolving an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileChange {
    Add {
        position: Position,
        thing: ThingSnapshot,
    },
    Remove {
        position: Position,
        stackpos: usize,
    },
    Refresh {
        position: Position,
        stackpos: usize,
        item: ItemSnapshot,
    },
}

impl TileChange {
    pub fn position(&self) -> Position {
        match self {
            TileChange::Add { position, .. }
            | TileChange::Remove { position, .. }
            | TileChange::Refresh { position, .. } => *position,
        }
    }

    fn to_part(&self) -> MessagePart {
        match self {
            TileChange::Add { position, thing } => MessagePart::AddThing {
                position: *position,
                thing: thing.clone(),
            },
            TileChange::Remove { position, stackpos } => MessagePart::RemoveThing {
                position: *position,
                stackpos: *stackpos,
            },
            TileChange::Refresh {
                position,
                stackpos,
                item,
            } => MessagePart::RefreshThing {
                position: *position,
                stackpos: *stackpos,
                item: *item,
            },
        }
    }
}

/// Tile changes of one action, recorded in the order they were made and
/// replayed to each spectator once the action has been fully decided.
#[derive(Debug, Default)]
pub struct MapState {
    changes: Vec<TileChange>,
}

impl MapState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> &[TileChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn record(&mut self, change: TileChange) {
        self.changes.push(change);
    }

    /// Stacks `item` on the tile. Returns `None` (dropping the item) when the
    /// tile does not exist.
    pub fn add_item(&mut self, map: &mut Map, position: Position, item: Item) -> Option<usize> {
        let snapshot = item.snapshot();
        let stackpos = map.tile_mut(position)?.add_item(item);
        self.record(TileChange::Add {
            position,
            thing: ThingSnapshot::Item(snapshot),
        });
        Some(stackpos)
    }

    pub fn remove_creature(
        &mut self,
        map: &mut Map,
        id: CreatureId,
        position: Position,
    ) -> Option<usize> {
        let stackpos = map.remove_creature(id, position)?;
        self.record(TileChange::Remove { position, stackpos });
        Some(stackpos)
    }

    /// Lays `splash` on the tile, refreshing an existing one in place.
    pub fn set_splash(&mut self, map: &mut Map, position: Position, splash: Item) -> Option<Item> {
        let tile = map.tile_mut(position)?;
        match tile.splash.as_mut() {
            Some(existing) => {
                existing.transform_into(&splash);
                let item = existing.snapshot();
                let stored = existing.clone();
                let stackpos = tile.splash_stackpos()?;
                self.record(TileChange::Refresh {
                    position,
                    stackpos,
                    item,
                });
                Some(stored)
            }
            None => {
                let mut splash = splash;
                splash.position = Some(position);
                let snapshot = splash.snapshot();
                tile.splash = Some(splash.clone());
                self.record(TileChange::Add {
                    position,
                    thing: ThingSnapshot::Item(snapshot),
                });
                Some(splash)
            }
        }
    }

    /// Puts `field` on the tile. An existing field takes over the new state
    /// and keeps its identity; the returned flag tells whether it was new.
    pub fn set_field(&mut self, map: &mut Map, position: Position, field: Item) -> Option<(Item, bool)> {
        let tile = map.tile_mut(position)?;
        match tile.field.as_mut() {
            Some(existing) => {
                existing.transform_into(&field);
                let stored = existing.clone();
                let stackpos = tile.field_stackpos()?;
                self.record(TileChange::Refresh {
                    position,
                    stackpos,
                    item: stored.snapshot(),
                });
                Some((stored, false))
            }
            None => {
                let mut field = field;
                field.position = Some(position);
                tile.field = Some(field.clone());
                self.record(TileChange::Add {
                    position,
                    thing: ThingSnapshot::Item(field.snapshot()),
                });
                Some((field, true))
            }
        }
    }

    /// The recorded changes a client centered at `viewer` can see.
    pub fn parts_for(&self, viewer: Position) -> Vec<MessagePart> {
        let viewport = Viewport::around(viewer);
        self.changes
            .iter()
            .filter(|change| viewport.can_see(change.position()))
            .map(TileChange::to_part)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::item::ItemTypeId;
    use crate::world::item_types::ItemTypeIndex;
    use std::sync::Arc;

    fn map() -> Map {
        Map::flat(
            "state",
            Arc::new(ItemTypeIndex::standard()),
            Position::new(100, 100, 7),
            40,
            10,
            ItemTypeId(100),
        )
    }

    #[test]
    fn second_splash_refreshes_the_first() {
        let mut map = map();
        let mut state = MapState::new();
        let at = Position::new(101, 101, 7);
        let first = state
            .set_splash(&mut map, at, Item::new(ItemTypeId(2019), 2))
            .expect("tile");
        let second = state
            .set_splash(&mut map, at, Item::new(ItemTypeId(2019), 2))
            .expect("tile");
        assert_eq!(first.id, second.id);
        assert!(matches!(state.changes()[0], TileChange::Add { .. }));
        assert!(matches!(
            state.changes()[1],
            TileChange::Refresh { stackpos: 1, .. }
        ));
    }

    #[test]
    fn spectators_only_see_changes_in_their_view() {
        let mut map = map();
        let mut state = MapState::new();
        state.add_item(&mut map, Position::new(101, 101, 7), Item::new(ItemTypeId(3031), 1));
        state.add_item(&mut map, Position::new(135, 101, 7), Item::new(ItemTypeId(3031), 1));
        assert_eq!(state.parts_for(Position::new(102, 102, 7)).len(), 1);
        assert_eq!(state.parts_for(Position::new(120, 102, 7)).len(), 0);
    }

    #[test]
    fn missing_tiles_record_nothing() {
        let mut map = map();
        let mut state = MapState::new();
        let placed = state.add_item(&mut map, Position::new(5, 5, 7), Item::new(ItemTypeId(3031), 1));
        assert!(placed.is_none());
        assert!(state.is_empty());
    }
}
