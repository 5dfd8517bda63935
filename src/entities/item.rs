use crate::combat::conditions::ConditionKind;
use crate::entities::creature::CreatureId;
use crate::world::position::Position;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u32);

static NEXT_ITEM_ID: AtomicU32 = AtomicU32::new(1);

impl ItemId {
    pub fn next() -> Self {
        let id = NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed);
        ItemId(id)
    }

    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemTypeId(pub u16);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerData {
    pub capacity: u16,
    pub items: Vec<Item>,
}

/// Damage a magic field deals to whoever stands in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDamage {
    pub condition: ConditionKind,
    pub initial_damage: i32,
    pub tick_damage: i32,
    pub tick_count: u16,
    pub tick_interval_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldData {
    pub owner: Option<CreatureId>,
    pub damage: FieldDamage,
    pub remaining_stages: u8,
    pub stage_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Plain,
    Container(ContainerData),
    Field(FieldData),
}

/// A concrete item instance. Whoever holds the value owns the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub type_id: ItemTypeId,
    pub count: u16,
    pub kind: ItemKind,
    /// Set only while the item lies on the ground.
    pub position: Option<Position>,
}

/// What observers are told about an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub type_id: ItemTypeId,
    pub count: u16,
}

impl Item {
    pub fn new(type_id: ItemTypeId, count: u16) -> Self {
        Self {
            id: ItemId::next(),
            type_id,
            count,
            kind: ItemKind::Plain,
            position: None,
        }
    }

    pub fn container(type_id: ItemTypeId, capacity: u16) -> Self {
        Self {
            id: ItemId::next(),
            type_id,
            count: 1,
            kind: ItemKind::Container(ContainerData {
                capacity,
                items: Vec::new(),
            }),
            position: None,
        }
    }

    pub fn field(type_id: ItemTypeId, data: FieldData) -> Self {
        Self {
            id: ItemId::next(),
            type_id,
            count: 1,
            kind: ItemKind::Field(data),
            position: None,
        }
    }

    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            id: self.id,
            type_id: self.type_id,
            count: self.count,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, ItemKind::Container(_))
    }

    pub fn as_container(&self) -> Option<&ContainerData> {
        match &self.kind {
            ItemKind::Container(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut ContainerData> {
        match &mut self.kind {
            ItemKind::Container(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldData> {
        match &self.kind {
            ItemKind::Field(data) => Some(data),
            _ => None,
        }
    }

    /// Finds `id` in this item or anywhere below it.
    pub fn find(&self, id: ItemId) -> Option<&Item> {
        if self.id == id {
            return Some(self);
        }
        self.as_container()?
            .items
            .iter()
            .find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        if self.id == id {
            return Some(self);
        }
        match &mut self.kind {
            ItemKind::Container(data) => data.items.iter_mut().find_map(|child| child.find_mut(id)),
            _ => None,
        }
    }

    /// True when `id` is nested somewhere inside this item (not the item itself).
    pub fn holds(&self, id: ItemId) -> bool {
        self.as_container()
            .map(|data| data.items.iter().any(|child| child.find(id).is_some()))
            .unwrap_or(false)
    }

    /// Visits this item and everything it contains.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Item)) {
        visit(self);
        if let Some(data) = self.as_container() {
            for child in &data.items {
                child.walk(visit);
            }
        }
    }

    /// Replaces this field's state with `other`, keeping the instance identity.
    pub fn transform_into(&mut self, other: &Item) {
        self.type_id = other.type_id;
        self.count = other.count;
        self.kind = other.kind.clone();
    }

    /// Advances a field one decay stage; false once the field is spent.
    pub fn advance_field_stage(&mut self) -> bool {
        match &mut self.kind {
            ItemKind::Field(data) => {
                data.remaining_stages = data.remaining_stages.saturating_sub(1);
                data.remaining_stages > 0
            }
            _ => false,
        }
    }
}

impl ContainerData {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_room(&self) -> bool {
        self.items.len() < usize::from(self.capacity)
    }

    /// New items go to the front, matching how clients render containers.
    pub fn insert(&mut self, mut item: Item) {
        item.position = None;
        self.items.insert(0, item);
    }

    pub fn remove(&mut self, index: usize) -> Option<Item> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }
}
