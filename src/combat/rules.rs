use crate::entities::item::ItemTypeId;
use serde::Deserialize;

/// Tunables of the combat engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    /// Fight timer set on an attacker that hits another player.
    pub pz_lock_ms: i64,
    /// Fight timer set on both sides of any other hit.
    pub fight_ms: i64,
    pub exhausted_ms: i64,
    /// Extra exhaustion added when acting while already exhausted.
    pub exhausted_add_ms: i64,
    pub melee_range: u16,
    pub distance_range_x: u16,
    pub distance_range_y: u16,
    /// An attack is dropped once the target walks farther than this.
    pub engagement_range_x: u16,
    pub engagement_range_y: u16,
    pub splash_type: ItemTypeId,
    /// Share of a victim's experience handed to the killer.
    pub experience_percent: u32,
    /// Things a tile may hold before the oldest are pushed off.
    pub max_stack: usize,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            pz_lock_ms: 60_000,
            fight_ms: 10_000,
            exhausted_ms: 1_000,
            exhausted_add_ms: 2_000,
            melee_range: 1,
            distance_range_x: 8,
            distance_range_y: 5,
            engagement_range_x: 8,
            engagement_range_y: 5,
            splash_type: ItemTypeId(2019),
            experience_percent: 10,
            max_stack: 8,
        }
    }
}

impl CombatRules {
    pub fn experience_for_kill(&self, victim_experience: u64) -> u64 {
        victim_experience * u64::from(self.experience_percent) / 100
    }
}
