use crate::combat::conditions::{ConditionKind, Conditions};
use crate::entities::effects::{
    StatusTimers, ICON_BURNING, ICON_ENERGIZED, ICON_HASTE, ICON_IN_FIGHT, ICON_MANA_SHIELD,
    ICON_POISONED,
};
use crate::entities::item::ItemTypeId;
use crate::entities::player::PlayerData;
use crate::entities::skills::Vocation;
use crate::entities::stats::Stats;
use crate::net::session::Session;
use crate::world::position::{Direction, Position};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatureId(pub u32);

static NEXT_CREATURE_ID: AtomicU32 = AtomicU32::new(0x1000_0000);

impl CreatureId {
    pub fn next() -> Self {
        CreatureId(NEXT_CREATURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatureKind {
    Player,
    Npc,
    Monster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FightType {
    #[default]
    Melee,
    Distance,
    MagicDistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outfit {
    pub look_type: u16,
    pub head: u8,
    pub body: u8,
    pub legs: u8,
    pub feet: u8,
}

pub const DEFAULT_OUTFIT: Outfit = Outfit {
    look_type: 128,
    head: 40,
    body: 40,
    legs: 40,
    feet: 40,
};

impl Default for Outfit {
    fn default() -> Self {
        DEFAULT_OUTFIT
    }
}

pub const DEFAULT_CORPSE: ItemTypeId = ItemTypeId(3058);

/// A placed or placeable creature. Player-only state lives in `player`.
#[derive(Debug, Clone)]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    pub kind: CreatureKind,
    pub position: Position,
    pub direction: Direction,
    /// Privilege level; 0 is an ordinary creature.
    pub access: u8,
    pub stats: Stats,
    pub speed: u16,
    pub base_speed: u16,
    pub outfit: Outfit,
    pub corpse_type: ItemTypeId,
    pub experience: u64,
    pub timers: StatusTimers,
    pub conditions: Conditions,
    pub attack_target: Option<CreatureId>,
    pub fight_type: FightType,
    pub min_attack: i32,
    pub max_attack: i32,
    /// Where `/t` sends the creature.
    pub master_position: Position,
    /// Bumped on every placement. Heartbeats armed for an earlier one lapse.
    pub placement: u32,
    pub player: Option<Box<PlayerData>>,
}

/// What observers learn about a creature when it comes into view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatureSnapshot {
    pub id: CreatureId,
    pub name: String,
    pub outfit: Outfit,
    pub direction: Direction,
    pub health_percent: u8,
    pub speed: u16,
}

impl Creature {
    fn base(name: &str, kind: CreatureKind, position: Position, stats: Stats) -> Self {
        Self {
            id: CreatureId::next(),
            name: name.to_string(),
            kind,
            position,
            direction: Direction::South,
            access: 0,
            stats,
            speed: 220,
            base_speed: 220,
            outfit: Outfit::default(),
            corpse_type: DEFAULT_CORPSE,
            experience: 0,
            timers: StatusTimers::default(),
            conditions: Conditions::default(),
            attack_target: None,
            fight_type: FightType::Melee,
            min_attack: 0,
            max_attack: 5,
            master_position: position,
            placement: 0,
            player: None,
        }
    }

    pub fn player(name: &str, position: Position, vocation: Vocation) -> Self {
        let mut creature = Self::base(name, CreatureKind::Player, position, Stats::new(150, 50));
        creature.corpse_type = ItemTypeId(3065);
        creature.player = Some(Box::new(PlayerData::new(vocation)));
        creature.apply_normal_speed();
        creature
    }

    pub fn npc(name: &str, position: Position) -> Self {
        let mut creature = Self::base(name, CreatureKind::Npc, position, Stats::new(150, 0));
        creature.outfit.look_type = 130;
        creature
    }

    pub fn monster(name: &str, position: Position, health: i32, experience: u64) -> Self {
        let mut creature = Self::base(name, CreatureKind::Monster, position, Stats::new(health, 0));
        creature.experience = experience;
        creature
    }

    pub fn with_access(mut self, access: u8) -> Self {
        self.access = access;
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        if let Some(player) = self.player.as_mut() {
            player.session = Some(session);
        }
        self
    }

    pub fn is_player(&self) -> bool {
        self.kind == CreatureKind::Player
    }

    pub fn is_privileged(&self) -> bool {
        self.access > 0
    }

    pub fn is_alive(&self) -> bool {
        self.stats.is_alive()
    }

    pub fn player_data(&self) -> Option<&PlayerData> {
        self.player.as_deref()
    }

    pub fn player_data_mut(&mut self) -> Option<&mut PlayerData> {
        self.player.as_deref_mut()
    }

    pub fn session(&self) -> Option<&Session> {
        self.player.as_ref().and_then(|player| player.session.as_ref())
    }

    /// Walking speed derived from level; non-players keep their base speed.
    pub fn normal_speed(&self) -> u16 {
        match self.player_data() {
            Some(player) => 220u16.saturating_add(2 * player.level.saturating_sub(1)),
            None => self.base_speed,
        }
    }

    pub fn apply_normal_speed(&mut self) {
        self.base_speed = self.normal_speed();
        self.speed = self.base_speed;
    }

    pub fn weapon_damage(&self, rng: &mut crate::combat::damage::CombatRng) -> i32 {
        rng.roll_range(self.min_attack, self.max_attack)
    }

    pub fn icons(&self) -> u8 {
        let mut icons = 0;
        if self.timers.in_fight() {
            icons |= ICON_IN_FIGHT;
        }
        if self.timers.mana_shield() {
            icons |= ICON_MANA_SHIELD;
        }
        if self.timers.hasted() {
            icons |= ICON_HASTE;
        }
        if self.conditions.is_active(ConditionKind::Fire) {
            icons |= ICON_BURNING;
        }
        if self.conditions.is_active(ConditionKind::Poison) {
            icons |= ICON_POISONED;
        }
        if self.conditions.is_active(ConditionKind::Energy) {
            icons |= ICON_ENERGIZED;
        }
        icons
    }

    pub fn snapshot(&self) -> CreatureSnapshot {
        CreatureSnapshot {
            id: self.id,
            name: self.name.clone(),
            outfit: self.outfit,
            direction: self.direction,
            health_percent: self.stats.health_percent(),
            speed: self.speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::conditions::DamageTicks;

    #[test]
    fn ids_are_unique() {
        let a = Creature::npc("Sam", Position::new(10, 10, 7));
        let b = Creature::npc("Sam", Position::new(10, 10, 7));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn player_speed_grows_with_level() {
        let mut knight = Creature::player("Gorn", Position::new(10, 10, 7), Vocation::Knight);
        assert_eq!(knight.speed, 220);
        knight.player_data_mut().expect("player").level = 11;
        knight.apply_normal_speed();
        assert_eq!(knight.speed, 240);
    }

    #[test]
    fn icons_follow_timers_and_conditions() {
        let mut creature = Creature::monster("Rat", Position::new(1, 1, 7), 20, 5);
        assert_eq!(creature.icons(), 0);
        creature.timers.start_fight(5000);
        creature.conditions.add(
            ConditionKind::Poison,
            DamageTicks {
                damage: 1,
                remaining: 3,
                interval_ms: 1000,
                owner: None,
            },
        );
        assert_eq!(creature.icons(), ICON_IN_FIGHT | ICON_POISONED);
    }
}
