use crate::entities::inventory::{Inventory, InventorySlot};
use crate::entities::item::ItemId;
use crate::entities::skills::{exp_for_level, mana_for_magic_level, LevelGain, Vocation};
use crate::net::session::Session;
use crate::world::position::Position;
use std::collections::BTreeMap;

pub const MAX_OPEN_CONTAINERS: u8 = 16;

/// Where the outermost item of an open container chain lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRoot {
    Slot(InventorySlot),
    Ground(Position),
}

/// A container window the client has open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenContainer {
    pub item: ItemId,
    pub root: ContainerRoot,
}

/// State only players carry.
#[derive(Debug, Clone)]
pub struct PlayerData {
    pub vocation: Vocation,
    pub level: u16,
    pub magic_level: u16,
    pub mana_spent: u64,
    pub inventory: Inventory,
    pub open_containers: BTreeMap<u8, OpenContainer>,
    pub session: Option<Session>,
    pub ip: u32,
    pub skill_tries: u32,
}

/// A level or magic level gained during one heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub from: u16,
    pub to: u16,
}

impl PlayerData {
    pub fn new(vocation: Vocation) -> Self {
        Self {
            vocation,
            level: 1,
            magic_level: 0,
            mana_spent: 0,
            inventory: Inventory::default(),
            open_containers: BTreeMap::new(),
            session: None,
            ip: 0,
            skill_tries: 0,
        }
    }

    /// Raises the level once when `experience` reached the next threshold.
    pub fn try_level_up(&mut self, experience: u64) -> Option<(Advance, LevelGain)> {
        if experience < exp_for_level(self.level.saturating_add(1)) {
            return None;
        }
        let from = self.level;
        self.level = self.level.saturating_add(1);
        Some((
            Advance {
                from,
                to: self.level,
            },
            self.vocation.level_gain(),
        ))
    }

    /// Raises the magic level once when enough mana was spent.
    pub fn try_magic_level_up(&mut self) -> Option<Advance> {
        let required = mana_for_magic_level(self.magic_level.saturating_add(1), self.vocation);
        if self.mana_spent < required {
            return None;
        }
        self.mana_spent -= required;
        let from = self.magic_level;
        self.magic_level = self.magic_level.saturating_add(1);
        Some(Advance {
            from,
            to: self.magic_level,
        })
    }

    /// Lowest free container window id.
    pub fn free_container_slot(&self) -> Option<u8> {
        (0..MAX_OPEN_CONTAINERS).find(|cid| !self.open_containers.contains_key(cid))
    }

    pub fn container_window(&self, item: ItemId) -> Option<u8> {
        self.open_containers
            .iter()
            .find(|(_, open)| open.item == item)
            .map(|(cid, _)| *cid)
    }

    /// Windows currently showing `item`.
    pub fn windows_showing(&self, item: ItemId) -> Vec<u8> {
        self.open_containers
            .iter()
            .filter(|(_, open)| open.item == item)
            .map(|(cid, _)| *cid)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_up_needs_threshold() {
        let mut player = PlayerData::new(Vocation::Knight);
        assert!(player.try_level_up(99).is_none());
        let (advance, gain) = player.try_level_up(100).expect("level up");
        assert_eq!(advance, Advance { from: 1, to: 2 });
        assert_eq!(gain.health, 15);
    }

    #[test]
    fn magic_level_consumes_spent_mana() {
        let mut player = PlayerData::new(Vocation::Sorcerer);
        let required = mana_for_magic_level(1, Vocation::Sorcerer);
        player.mana_spent = required + 7;
        assert_eq!(player.try_magic_level_up(), Some(Advance { from: 0, to: 1 }));
        assert_eq!(player.mana_spent, 7);
        assert!(player.try_magic_level_up().is_none());
    }

    #[test]
    fn container_windows_are_reused_from_the_bottom() {
        let mut player = PlayerData::new(Vocation::None);
        let open = OpenContainer {
            item: ItemId(5),
            root: ContainerRoot::Slot(InventorySlot::Backpack),
        };
        player.open_containers.insert(0, open);
        player.open_containers.insert(2, open);
        assert_eq!(player.free_container_slot(), Some(1));
        assert_eq!(player.windows_showing(ItemId(5)), vec![0, 2]);
        assert_eq!(player.container_window(ItemId(5)), Some(0));
    }
}
