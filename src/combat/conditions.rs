use crate::entities::creature::CreatureId;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConditionKind {
    Fire,
    Poison,
    Energy,
}

pub const CONDITION_KINDS: [ConditionKind; 3] =
    [ConditionKind::Fire, ConditionKind::Poison, ConditionKind::Energy];

/// A batch of identical damage ticks queued by one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageTicks {
    pub damage: i32,
    pub remaining: u16,
    pub interval_ms: u32,
    /// Whoever caused the damage; it may have left the world by the time a tick fires.
    pub owner: Option<CreatureId>,
}

/// A tick that came due and must be applied through the combat engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionTick {
    pub kind: ConditionKind,
    pub damage: i32,
    pub owner: Option<CreatureId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ConditionTrack {
    countdown_ms: i64,
    pending: VecDeque<DamageTicks>,
}

impl ConditionTrack {
    fn push(&mut self, ticks: DamageTicks) {
        if ticks.remaining == 0 {
            return;
        }
        if self.pending.is_empty() {
            self.countdown_ms = i64::from(ticks.interval_ms.max(1));
        }
        self.pending.push_back(ticks);
    }

    fn advance(&mut self, kind: ConditionKind, elapsed_ms: i64) -> Option<ConditionTick> {
        if self.countdown_ms <= 0 {
            self.countdown_ms = 0;
            return None;
        }
        let Some(front) = self.pending.front_mut() else {
            self.countdown_ms = 0;
            return None;
        };
        self.countdown_ms -= elapsed_ms;
        if self.countdown_ms > 0 {
            return None;
        }
        let fired = ConditionTick {
            kind,
            damage: front.damage,
            owner: front.owner,
        };
        front.remaining = front.remaining.saturating_sub(1);
        if front.remaining == 0 {
            self.pending.pop_front();
        }
        self.countdown_ms = self
            .pending
            .front()
            .map(|next| i64::from(next.interval_ms.max(1)))
            .unwrap_or(0);
        Some(fired)
    }
}

/// Damage-over-time state of one creature: one queue per condition kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    burning: ConditionTrack,
    poisoned: ConditionTrack,
    energized: ConditionTrack,
}

impl Conditions {
    fn track(&self, kind: ConditionKind) -> &ConditionTrack {
        match kind {
            ConditionKind::Fire => &self.burning,
            ConditionKind::Poison => &self.poisoned,
            ConditionKind::Energy => &self.energized,
        }
    }

    fn track_mut(&mut self, kind: ConditionKind) -> &mut ConditionTrack {
        match kind {
            ConditionKind::Fire => &mut self.burning,
            ConditionKind::Poison => &mut self.poisoned,
            ConditionKind::Energy => &mut self.energized,
        }
    }

    pub fn add(&mut self, kind: ConditionKind, ticks: DamageTicks) {
        self.track_mut(kind).push(ticks);
    }

    pub fn is_active(&self, kind: ConditionKind) -> bool {
        !self.track(kind).pending.is_empty()
    }

    pub fn pending_ticks(&self, kind: ConditionKind) -> u32 {
        self.track(kind)
            .pending
            .iter()
            .map(|ticks| u32::from(ticks.remaining))
            .sum()
    }

    /// Runs every condition forward by `elapsed_ms`, returning the ticks that fired.
    pub fn advance(&mut self, elapsed_ms: i64) -> Vec<ConditionTick> {
        CONDITION_KINDS
            .iter()
            .filter_map(|kind| self.track_mut(*kind).advance(*kind, elapsed_ms))
            .collect()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire(damage: i32, remaining: u16, interval_ms: u32) -> DamageTicks {
        DamageTicks {
            damage,
            remaining,
            interval_ms,
            owner: Some(CreatureId(7)),
        }
    }

    #[test]
    fn ticks_fire_once_per_interval() {
        let mut conditions = Conditions::default();
        conditions.add(ConditionKind::Fire, fire(10, 2, 2000));

        assert!(conditions.advance(1000).is_empty());
        let fired = conditions.advance(1000);
        assert_eq!(
            fired,
            vec![ConditionTick {
                kind: ConditionKind::Fire,
                damage: 10,
                owner: Some(CreatureId(7)),
            }]
        );
        assert_eq!(conditions.pending_ticks(ConditionKind::Fire), 1);
        assert!(conditions.advance(1000).is_empty());
        assert_eq!(conditions.advance(1000).len(), 1);
        assert!(!conditions.is_active(ConditionKind::Fire));
    }

    #[test]
    fn queued_batches_run_in_order() {
        let mut conditions = Conditions::default();
        conditions.add(ConditionKind::Poison, fire(5, 1, 1000));
        conditions.add(ConditionKind::Poison, fire(3, 1, 1000));

        assert_eq!(conditions.advance(1000)[0].damage, 5);
        assert_eq!(conditions.advance(1000)[0].damage, 3);
        assert!(conditions.advance(1000).is_empty());
    }

    #[test]
    fn kinds_tick_independently() {
        let mut conditions = Conditions::default();
        conditions.add(ConditionKind::Fire, fire(10, 1, 1000));
        conditions.add(ConditionKind::Energy, fire(25, 1, 1000));
        let fired = conditions.advance(1000);
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].kind, ConditionKind::Fire);
        assert_eq!(fired[1].kind, ConditionKind::Energy);
    }
}
