/// A timer counts as running while at least this many milliseconds remain.
pub const TIMER_ACTIVE_MS: i64 = 1000;

/// Countdown timers a heartbeat decrements by the elapsed interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTimers {
    pub in_fight_ms: i64,
    pub exhausted_ms: i64,
    pub mana_shield_ms: i64,
    pub haste_ms: i64,
    /// Set by attacking another player; cleared when the fight timer runs out.
    pub pz_locked: bool,
}

/// What changed while ticking the timers down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerExpiry {
    pub fight_ended: bool,
    pub mana_shield_ended: bool,
    pub haste_ended: bool,
}

impl TimerExpiry {
    pub fn icons_changed(&self) -> bool {
        self.fight_ended || self.mana_shield_ended || self.haste_ended
    }
}

impl StatusTimers {
    pub fn in_fight(&self) -> bool {
        self.in_fight_ms >= TIMER_ACTIVE_MS
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted_ms >= TIMER_ACTIVE_MS
    }

    pub fn mana_shield(&self) -> bool {
        self.mana_shield_ms >= TIMER_ACTIVE_MS
    }

    pub fn hasted(&self) -> bool {
        self.haste_ms >= TIMER_ACTIVE_MS
    }

    /// Extends the fight timer; a longer running timer is kept.
    pub fn start_fight(&mut self, duration_ms: i64) {
        self.in_fight_ms = self.in_fight_ms.max(duration_ms);
    }

    pub fn lock_protection_zone(&mut self, duration_ms: i64) {
        self.start_fight(duration_ms);
        self.pz_locked = true;
    }

    /// Full heartbeat: every timer loses `elapsed_ms`.
    pub fn tick(&mut self, elapsed_ms: i64) -> TimerExpiry {
        let mut expiry = TimerExpiry::default();
        if self.in_fight() {
            self.in_fight_ms -= elapsed_ms;
            if !self.in_fight() {
                self.pz_locked = false;
                expiry.fight_ended = true;
            }
        }
        if self.exhausted() {
            self.exhausted_ms -= elapsed_ms;
        }
        expiry.mana_shield_ended = Self::count_down(&mut self.mana_shield_ms, elapsed_ms);
        expiry.haste_ended = Self::count_down(&mut self.haste_ms, elapsed_ms);
        expiry
    }

    /// Reduced heartbeat of simplified creatures: only shield and haste run.
    pub fn tick_simple(&mut self, elapsed_ms: i64) -> TimerExpiry {
        TimerExpiry {
            mana_shield_ended: Self::count_down(&mut self.mana_shield_ms, elapsed_ms),
            haste_ended: Self::count_down(&mut self.haste_ms, elapsed_ms),
            ..TimerExpiry::default()
        }
    }

    fn count_down(timer: &mut i64, elapsed_ms: i64) -> bool {
        if *timer < TIMER_ACTIVE_MS {
            return false;
        }
        *timer -= elapsed_ms;
        *timer < TIMER_ACTIVE_MS
    }
}

pub const ICON_POISONED: u8 = 1;
pub const ICON_BURNING: u8 = 2;
pub const ICON_ENERGIZED: u8 = 4;
pub const ICON_IN_FIGHT: u8 = 8;
pub const ICON_MANA_SHIELD: u8 = 16;
pub const ICON_HASTE: u8 = 32;
