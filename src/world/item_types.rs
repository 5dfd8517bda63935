use crate::entities::item::{Item, ItemTypeId};
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

fn default_true() -> bool {
    true
}

fn default_throw_range() -> u16 {
    1
}

/// Static properties shared by every item of one type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemType {
    pub id: ItemTypeId,
    pub name: String,
    #[serde(default = "default_true")]
    pub movable: bool,
    #[serde(default = "default_true")]
    pub pickupable: bool,
    #[serde(default)]
    pub blocking: bool,
    #[serde(default)]
    pub container_capacity: Option<u16>,
    #[serde(default)]
    pub decay_to: Option<ItemTypeId>,
    #[serde(default)]
    pub decay_secs: Option<u32>,
    #[serde(default = "default_throw_range")]
    pub throw_range: u16,
}

impl ItemType {
    fn new(id: u16, name: &str) -> Self {
        Self {
            id: ItemTypeId(id),
            name: name.to_string(),
            movable: true,
            pickupable: true,
            blocking: false,
            container_capacity: None,
            decay_to: None,
            decay_secs: None,
            throw_range: 1,
        }
    }

    fn fixed(mut self) -> Self {
        self.movable = false;
        self.pickupable = false;
        self
    }

    fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    fn container(mut self, capacity: u16) -> Self {
        self.container_capacity = Some(capacity);
        self
    }

    fn decays(mut self, to: Option<u16>, secs: u32) -> Self {
        self.decay_to = to.map(ItemTypeId);
        self.decay_secs = Some(secs);
        self
    }

    fn throwable(mut self, range: u16) -> Self {
        self.throw_range = range;
        self
    }

    pub fn decay_ms(&self) -> Option<u64> {
        self.decay_secs.map(|secs| u64::from(secs) * 1000)
    }
}

/// Read-only item catalog.
#[derive(Debug, Default, Clone)]
pub struct ItemTypeIndex {
    types: HashMap<ItemTypeId, ItemType>,
}

impl ItemTypeIndex {
    pub fn get(&self, id: ItemTypeId) -> Option<&ItemType> {
        self.types.get(&id)
    }

    pub fn insert(&mut self, item: ItemType) -> Result<(), String> {
        if self.types.contains_key(&item.id) {
            return Err(format!("item type {:?} already exists", item.id));
        }
        self.types.insert(item.id, item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_movable(&self, id: ItemTypeId) -> bool {
        self.get(id).map(|item| item.movable).unwrap_or(true)
    }

    pub fn is_pickupable(&self, id: ItemTypeId) -> bool {
        self.get(id).map(|item| item.pickupable).unwrap_or(true)
    }

    pub fn is_blocking(&self, id: ItemTypeId) -> bool {
        self.get(id).map(|item| item.blocking).unwrap_or(false)
    }

    pub fn throw_range(&self, id: ItemTypeId) -> u16 {
        self.get(id).map(|item| item.throw_range).unwrap_or(1)
    }

    /// Decay target and delay; `None` when the type never decays.
    pub fn decay(&self, id: ItemTypeId) -> Option<(Option<ItemTypeId>, u64)> {
        let item = self.get(id)?;
        Some((item.decay_to, item.decay_ms()?))
    }

    /// A new instance of `id`, built as a container when the type is one.
    pub fn instantiate(&self, id: ItemTypeId, count: u16) -> Item {
        match self.get(id).and_then(|item| item.container_capacity) {
            Some(capacity) => Item::container(id, capacity),
            None => Item::new(id, count),
        }
    }

    pub fn from_yaml_str(source: &str, origin: &str) -> Result<Self, ConfigError> {
        let entries: Vec<ItemType> =
            serde_yaml::from_str(source).map_err(|source| ConfigError::Yaml {
                path: origin.to_string(),
                source,
            })?;
        let mut index = Self::default();
        for entry in entries {
            index.insert(entry).map_err(ConfigError::Invalid)?;
        }
        Ok(index)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&source, &path.display().to_string())
    }

    /// The built-in catalog used when no item file is configured.
    pub fn standard() -> Self {
        let mut index = Self::default();
        let entries = [
            ItemType::new(100, "grass").fixed(),
            ItemType::new(1026, "stone wall").fixed().blocking(),
            ItemType::new(1987, "bag").container(8),
            ItemType::new(2854, "backpack").container(20),
            ItemType::new(2019, "blood").fixed().decays(Some(2020), 10),
            ItemType::new(2020, "dried blood").fixed().decays(None, 20),
            ItemType::new(3031, "gold coin").throwable(2),
            ItemType::new(3003, "rope"),
            ItemType::new(3264, "sword"),
            ItemType::new(3274, "axe"),
            ItemType::new(3058, "dead human").decays(Some(3059), 300).fixed(),
            ItemType::new(3059, "slain human").decays(Some(3060), 300).fixed(),
            ItemType::new(3060, "bones").decays(None, 300),
            ItemType::new(3065, "dead player").decays(Some(3060), 300).fixed(),
            ItemType::new(3073, "dead rat").decays(Some(3060), 60).fixed(),
            ItemType::new(1492, "fire field").fixed(),
            ItemType::new(1495, "energy field").fixed(),
            ItemType::new(1496, "poison gas").fixed(),
            ItemType::new(2268, "sudden death rune"),
            ItemType::new(2273, "ultimate healing rune"),
            ItemType::new(2277, "energy field rune"),
            ItemType::new(2285, "poison field rune"),
            ItemType::new(2301, "fire field rune"),
            ItemType::new(2304, "great fireball rune"),
            ItemType::new(2313, "explosion rune"),
        ];
        for entry in entries {
            index.types.insert(entry.id, entry);
        }
        index
    }
}
