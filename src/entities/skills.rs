use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vocation {
    #[default]
    None,
    Sorcerer,
    Druid,
    Paladin,
    Knight,
}

/// Per-level pool growth of a vocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelGain {
    pub health: i32,
    pub mana: i32,
    pub capacity: i32,
}

impl Vocation {
    pub fn level_gain(self) -> LevelGain {
        let (health, mana, capacity) = match self {
            Vocation::None => (5, 5, 10),
            Vocation::Sorcerer => (5, 30, 10),
            Vocation::Druid => (5, 30, 10),
            Vocation::Paladin => (10, 15, 20),
            Vocation::Knight => (15, 5, 25),
        };
        LevelGain {
            health,
            mana,
            capacity,
        }
    }

    fn mana_multiplier(self) -> f64 {
        match self {
            Vocation::None => 4.0,
            Vocation::Sorcerer | Vocation::Druid => 1.1,
            Vocation::Paladin => 1.4,
            Vocation::Knight => 3.0,
        }
    }
}

/// Total experience needed to reach `level`.
pub fn exp_for_level(level: u16) -> u64 {
    let lv = i64::from(level.max(1)) - 1;
    let exp = (50 * lv * lv * lv - 150 * lv * lv + 400 * lv) / 3;
    exp.max(0) as u64
}

/// Mana that must be spent to advance to `magic_level`, before rounding.
pub fn raw_mana_for_magic_level(magic_level: u16, vocation: Vocation) -> u64 {
    let exponent = i32::from(magic_level.max(1)) - 1;
    (400.0 * vocation.mana_multiplier().powi(exponent)) as u64
}

/// Snaps a magic-level mana requirement to a multiple of 20: down when the
/// remainder is below 10, up otherwise.
pub fn round_mana_requirement(required: u64) -> u64 {
    let remainder = required % 20;
    if remainder < 10 {
        required - remainder
    } else {
        required - remainder + 20
    }
}

pub fn mana_for_magic_level(magic_level: u16, vocation: Vocation) -> u64 {
    round_mana_requirement(raw_mana_for_magic_level(magic_level, vocation))
}
