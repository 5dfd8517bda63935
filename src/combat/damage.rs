use crate::entities::stats::Stats;

/// How a single hit was split between the target's pools.
///
/// `health` is negative when the hit healed the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    pub health: i32,
    pub mana: i32,
}

impl DamageOutcome {
    pub fn is_heal(&self) -> bool {
        self.health < 0
    }

    pub fn is_empty(&self) -> bool {
        self.health == 0 && self.mana == 0
    }
}

/// Applies `damage` to `stats`. Negative damage heals.
///
/// With an active mana shield the hit drains mana first and only the
/// remainder reaches health. Reported health damage never exceeds what the
/// target had left.
pub fn apply_damage(stats: &mut Stats, mana_shield: bool, damage: i32) -> DamageOutcome {
    if damage < 0 {
        let healed = stats.heal(damage.saturating_neg());
        return DamageOutcome {
            health: -healed,
            mana: 0,
        };
    }

    let mut remaining = damage;
    let mut mana = 0;
    if mana_shield && stats.mana > 0 {
        mana = remaining.min(stats.mana);
        stats.drain_mana(mana);
        remaining -= mana;
    }

    let health = remaining.min(stats.health.max(0));
    stats.drain_health(remaining);
    DamageOutcome { health, mana }
}

/// Linear congruential generator used for damage rolls.
#[derive(Debug, Clone)]
pub struct CombatRng {
    state: u64,
}

impl CombatRng {
    pub fn from_seed(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn from_time() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0x5eed);
        Self::from_seed(seed)
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.state >> 33) as u32
    }

    /// Uniform value in `min..=max`; the bounds may be given in either order.
    pub fn roll_range(&mut self, min: i32, max: i32) -> i32 {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        let span = (i64::from(high) - i64::from(low) + 1) as u64;
        let offset = u64::from(self.next_u32()) % span;
        (i64::from(low) + offset as i64) as i32
    }

    /// True with a probability of `percent` in a hundred.
    pub fn chance(&mut self, percent: u32) -> bool {
        self.next_u32() % 100 < percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mana_shield_absorbs_before_health() {
        let mut stats = Stats::new(100, 100);
        stats.health = 50;
        stats.mana = 30;
        let outcome = apply_damage(&mut stats, true, 50);
        assert_eq!(outcome, DamageOutcome { health: 20, mana: 30 });
        assert_eq!(stats.mana, 0);
        assert_eq!(stats.health, 30);
    }

    #[test]
    fn without_shield_mana_is_untouched() {
        let mut stats = Stats::new(100, 100);
        let outcome = apply_damage(&mut stats, false, 40);
        assert_eq!(outcome.mana, 0);
        assert_eq!(stats.mana, 100);
        assert_eq!(stats.health, 60);
    }

    #[test]
    fn reported_damage_is_clamped_to_remaining_health() {
        let mut stats = Stats::new(100, 0);
        stats.health = 5;
        let outcome = apply_damage(&mut stats, false, 100);
        assert_eq!(outcome.health, 5);
        assert!(stats.health <= 0);
    }

    #[test]
    fn healing_stops_at_max_health() {
        let mut stats = Stats::new(100, 0);
        stats.health = 90;
        let outcome = apply_damage(&mut stats, false, -50);
        assert_eq!(outcome.health, -10);
        assert!(outcome.is_heal());
        assert_eq!(stats.health, 100);
    }

    #[test]
    fn rolls_stay_within_bounds() {
        let mut rng = CombatRng::from_seed(42);
        for _ in 0..200 {
            let value = rng.roll_range(-30, -10);
            assert!((-30..=-10).contains(&value));
        }
        assert_eq!(rng.roll_range(7, 7), 7);
    }
}
