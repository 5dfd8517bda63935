/// Health and mana pools. Health may drop to zero or below on death.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub capacity: i32,
}

impl Stats {
    pub fn new(max_health: i32, max_mana: i32) -> Self {
        Self {
            health: max_health,
            max_health,
            mana: max_mana,
            max_mana,
            capacity: 400,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn drain_health(&mut self, amount: i32) {
        self.health = self.health.saturating_sub(amount.max(0));
    }

    pub fn drain_mana(&mut self, amount: i32) {
        self.mana = (self.mana - amount.max(0)).max(0);
    }

    /// Restores health up to the maximum and returns the amount gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = before.saturating_add(amount.max(0)).min(self.max_health).max(before);
        self.health - before
    }

    pub fn regenerate_mana(&mut self, amount: i32) -> i32 {
        let gained = amount.max(0).min((self.max_mana - self.mana).max(0));
        self.mana += gained;
        gained
    }

    /// Health in percent of the maximum, as shown above creatures.
    pub fn health_percent(&self) -> u8 {
        if self.max_health <= 0 || self.health <= 0 {
            return 0;
        }
        ((i64::from(self.health) * 100 / i64::from(self.max_health)).clamp(0, 100)) as u8
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(150, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heal_never_exceeds_maximum() {
        let mut stats = Stats::new(100, 0);
        stats.drain_health(30);
        assert_eq!(stats.heal(50), 30);
        assert_eq!(stats.health, 100);
    }

    #[test]
    fn drain_can_push_health_below_zero() {
        let mut stats = Stats::new(5, 0);
        stats.drain_health(100);
        assert!(stats.health <= 0);
        assert!(!stats.is_alive());
        assert_eq!(stats.health_percent(), 0);
    }

    #[test]
    fn mana_regeneration_caps_at_max() {
        let mut stats = Stats::new(100, 50);
        stats.drain_mana(5);
        assert_eq!(stats.regenerate_mana(10), 5);
        assert_eq!(stats.mana, 50);
    }
}
