use crate::combat::rules::CombatRules;
use crate::entities::item::ItemTypeId;
use crate::error::ConfigError;
use crate::game::{HeartbeatSettings, RegenSettings, WorldSettings};
use crate::world::item_types::ItemTypeIndex;
use crate::world::map::Map;
use crate::world::position::Position;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub struct AppConfig {
    /// Where the game configuration came from; `None` means built-in defaults.
    pub config_path: Option<PathBuf>,
    pub game: GameConfig,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() > 2 {
            return Err("usage: tibia-core [config.yaml]".to_string());
        }
        let config_path = args.get(1).map(PathBuf::from);
        let mut game = match config_path.as_deref() {
            Some(path) => GameConfig::load(path).map_err(|err| err.to_string())?,
            None => GameConfig::default(),
        };
        game.apply_env_overrides(|key| std::env::var(key).ok())
            .map_err(|err| err.to_string())?;
        Ok(Self { config_path, game })
    }
}

/// Everything the world needs at start-up.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub max_players: usize,
    pub combat: CombatRules,
    pub regen: RegenSettings,
    pub heartbeat: HeartbeatSettings,
    pub map: MapConfig,
    /// Item catalog file; the built-in catalog when absent.
    pub items: Option<PathBuf>,
    pub log: LogSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: WorldSettings::default().max_players,
            combat: CombatRules::default(),
            regen: RegenSettings::default(),
            heartbeat: HeartbeatSettings::default(),
            map: MapConfig::default(),
            items: None,
            log: LogSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("log"),
            level: "info".to_string(),
        }
    }
}

/// The flat demo floor the binary starts with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub name: String,
    pub origin_x: u16,
    pub origin_y: u16,
    pub z: u8,
    pub width: u16,
    pub height: u16,
    pub ground: u16,
    pub protection_zones: Vec<ZoneConfig>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            name: "demo".to_string(),
            origin_x: 100,
            origin_y: 100,
            z: 7,
            width: 64,
            height: 64,
            ground: 100,
            protection_zones: Vec::new(),
        }
    }
}

/// Inclusive rectangle of protection-zone tiles on the demo floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ZoneConfig {
    pub from_x: u16,
    pub from_y: u16,
    pub to_x: u16,
    pub to_y: u16,
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&source, &path.display().to_string())
    }

    pub fn from_yaml_str(source: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source).map_err(|source| ConfigError::Yaml {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// `TIBIA_MAX_PLAYERS` and `TIBIA_LOG_LEVEL` win over the file.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let non_empty = |key: &str| {
            lookup(key).and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };
        if let Some(value) = non_empty("TIBIA_MAX_PLAYERS") {
            self.max_players = value
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("TIBIA_MAX_PLAYERS={value} is not a number")))?;
        }
        if let Some(value) = non_empty("TIBIA_LOG_LEVEL") {
            self.log.level = value;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.map.width == 0 || self.map.height == 0 {
            return Err(ConfigError::Invalid("map must be at least one tile wide".to_string()));
        }
        if self.combat.experience_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "experience_percent {} exceeds 100",
                self.combat.experience_percent
            )));
        }
        if self.heartbeat.player_ms == 0 || self.heartbeat.creature_ms == 0 || self.heartbeat.attack_ms == 0 {
            return Err(ConfigError::Invalid("heartbeat intervals must be positive".to_string()));
        }
        Ok(())
    }

    pub fn world_settings(&self) -> WorldSettings {
        WorldSettings {
            max_players: self.max_players,
            combat: self.combat.clone(),
            heartbeat: self.heartbeat.clone(),
            regen: self.regen.clone(),
        }
    }

    pub fn item_types(&self) -> Result<ItemTypeIndex, ConfigError> {
        match self.items.as_deref() {
            Some(path) => ItemTypeIndex::load(path),
            None => Ok(ItemTypeIndex::standard()),
        }
    }

    /// Builds the demo floor and marks its protection zones.
    pub fn build_map(&self) -> Result<Map, ConfigError> {
        let items = Arc::new(self.item_types()?);
        let map_config = &self.map;
        let origin = Position::new(map_config.origin_x, map_config.origin_y, map_config.z);
        let mut map = Map::flat(
            &map_config.name,
            items,
            origin,
            map_config.width,
            map_config.height,
            ItemTypeId(map_config.ground),
        );
        for zone in &map_config.protection_zones {
            for y in zone.from_y..=zone.to_y {
                for x in zone.from_x..=zone.to_x {
                    if let Some(tile) = map.tile_mut(Position::new(x, y, map_config.z)) {
                        tile.protection_zone = true;
                    }
                }
            }
        }
        Ok(map)
    }
}
