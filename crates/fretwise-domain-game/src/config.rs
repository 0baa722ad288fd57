use crate::mode::GameMode;
use crate::stats::PitchTally;

/// Countdown rules of one timed mode, in whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerRules {
    pub start_secs: u32,
    pub bonus_secs: u32,
    pub penalty_secs: u32,
    pub cap_secs: u32,
}

impl TimerRules {
    pub fn with_bonus(&self, time_left: u32) -> u32 {
        time_left.saturating_add(self.bonus_secs).min(self.cap_secs)
    }

    pub fn with_penalty(&self, time_left: u32) -> u32 {
        time_left.saturating_sub(self.penalty_secs)
    }
}

/// A pitch is weak when it has at least `min_attempts` attempts and
/// wrong / attempts is strictly above `error_num / error_den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeakPitchRule {
    pub min_attempts: u32,
    pub error_num: u32,
    pub error_den: u32,
}

impl WeakPitchRule {
    pub fn is_weak(&self, tally: PitchTally) -> bool {
        let attempts = tally.attempts();
        attempts >= self.min_attempts
            && attempts > 0
            && (tally.wrong as u64) * (self.error_den as u64)
                > (attempts as u64) * (self.error_num as u64)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GameConfig {
    pub survival: TimerRules,
    pub find_all: TimerRules,
    pub chord: TimerRules,
    /// Found positions needed before Find-All moves on.
    pub found_threshold: usize,
    pub mastery_threshold: u32,
    pub initial_strings: u8,
    pub max_strings: u8,
    pub weak_rule: WeakPitchRule,
    /// Pause between a solved target and the next one.
    pub advance_delay_ms: u64,
}

impl GameConfig {
    pub fn timer(&self, mode: GameMode) -> Option<TimerRules> {
        match mode {
            GameMode::Survival => Some(self.survival),
            GameMode::FindAll => Some(self.find_all),
            GameMode::ChordCompletion => Some(self.chord),
            _ => None,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            survival: TimerRules {
                start_secs: 30,
                bonus_secs: 3,
                penalty_secs: 5,
                cap_secs: 60,
            },
            find_all: TimerRules {
                start_secs: 60,
                bonus_secs: 0,
                penalty_secs: 0,
                cap_secs: 60,
            },
            chord: TimerRules {
                start_secs: 60,
                bonus_secs: 10,
                penalty_secs: 3,
                cap_secs: 120,
            },
            found_threshold: 2,
            mastery_threshold: 10,
            initial_strings: 1,
            max_strings: 6,
            weak_rule: WeakPitchRule {
                min_attempts: 5,
                error_num: 3,
                error_den: 10,
            },
            advance_delay_ms: 600,
        }
    }
}
