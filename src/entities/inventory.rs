use crate::entities::item::{Item, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InventorySlot {
    Head,
    Necklace,
    Backpack,
    Armor,
    RightHand,
    LeftHand,
    Legs,
    Feet,
    Ring,
    Ammo,
}

impl InventorySlot {
    const COUNT: usize = 10;

    pub fn index(self) -> usize {
        match self {
            InventorySlot::Head => 0,
            InventorySlot::Necklace => 1,
            InventorySlot::Backpack => 2,
            InventorySlot::Armor => 3,
            InventorySlot::RightHand => 4,
            InventorySlot::LeftHand => 5,
            InventorySlot::Legs => 6,
            InventorySlot::Feet => 7,
            InventorySlot::Ring => 8,
            InventorySlot::Ammo => 9,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        INVENTORY_SLOTS.get(index).copied()
    }
}

pub const INVENTORY_SLOTS: [InventorySlot; 10] = [
    InventorySlot::Head,
    InventorySlot::Necklace,
    InventorySlot::Backpack,
    InventorySlot::Armor,
    InventorySlot::RightHand,
    InventorySlot::LeftHand,
    InventorySlot::Legs,
    InventorySlot::Feet,
    InventorySlot::Ring,
    InventorySlot::Ammo,
];

/// Equipment slots; each holds at most one top-level item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    slots: Vec<Option<Item>>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            slots: vec![None; InventorySlot::COUNT],
        }
    }
}

impl Inventory {
    pub fn slot(&self, slot: InventorySlot) -> Option<&Item> {
        self.slots.get(slot.index()).and_then(|entry| entry.as_ref())
    }

    pub fn slot_mut(&mut self, slot: InventorySlot) -> Option<&mut Item> {
        self.slots
            .get_mut(slot.index())
            .and_then(|entry| entry.as_mut())
    }

    pub fn is_empty_slot(&self, slot: InventorySlot) -> bool {
        self.slot(slot).is_none()
    }

    pub fn take(&mut self, slot: InventorySlot) -> Option<Item> {
        self.slots.get_mut(slot.index()).and_then(Option::take)
    }

    /// Places `item` into an empty slot, handing it back when the slot is taken.
    pub fn put(&mut self, slot: InventorySlot, mut item: Item) -> Result<(), Item> {
        match self.slots.get_mut(slot.index()) {
            Some(entry) if entry.is_none() => {
                item.position = None;
                *entry = Some(item);
                Ok(())
            }
            _ => Err(item),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = (InventorySlot, &Item)> {
        INVENTORY_SLOTS
            .iter()
            .filter_map(|slot| self.slot(*slot).map(|item| (*slot, item)))
    }

    /// Slot whose item is, or contains, `id`.
    pub fn slot_holding(&self, id: ItemId) -> Option<InventorySlot> {
        self.items()
            .find(|(_, item)| item.find(id).is_some())
            .map(|(slot, _)| slot)
    }
}
