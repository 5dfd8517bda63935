//! Fixtures shared by the world unit tests.

use super::{World, WorldSettings};
use crate::entities::item::ItemTypeId;
use crate::scheduler::clock::ManualClock;
use crate::scheduler::Scheduler;
use crate::world::item_types::ItemTypeIndex;
use crate::world::map::Map;
use crate::world::position::Position;
use std::sync::Arc;

/// 30x30 grass floor on z 7, from (100, 100) to (129, 129).
pub(crate) fn floor() -> Map {
    Map::flat(
        "test",
        Arc::new(ItemTypeIndex::standard()),
        Position::new(100, 100, 7),
        30,
        30,
        ItemTypeId(100),
    )
}

/// A world over `map` with a clock starting at zero and a fixed dice seed.
pub(crate) fn world_with_map(map: Map) -> (World, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let scheduler = Scheduler::new(clock.clone());
    let mut world = World::new(map, WorldSettings::default(), Arc::new(scheduler));
    world.set_rng_seed(7);
    (world, clock)
}
