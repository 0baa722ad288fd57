use crate::config::WeakPitchRule;
use crate::mode::GameMode;
use fretwise_domain_fretboard::PitchClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchTally {
    pub correct: u32,
    pub wrong: u32,
}

impl PitchTally {
    pub fn attempts(self) -> u32 {
        self.correct.saturating_add(self.wrong)
    }

    pub fn accuracy(self) -> Option<f32> {
        let attempts = self.attempts();
        if attempts == 0 {
            None
        } else {
            Some(self.correct as f32 / attempts as f32)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitchAccuracy {
    pub pitch: PitchClass,
    pub correct: u32,
    pub wrong: u32,
    pub accuracy: Option<f32>,
}

/// Lifetime correct/wrong counters per pitch class.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteStats {
    tallies: BTreeMap<PitchClass, PitchTally>,
}

impl NoteStats {
    pub fn record(&mut self, pitch: PitchClass, correct: bool) -> PitchTally {
        let tally = self.tallies.entry(pitch).or_default();
        if correct {
            tally.correct = tally.correct.saturating_add(1);
        } else {
            tally.wrong = tally.wrong.saturating_add(1);
        }
        *tally
    }

    pub fn tally(&self, pitch: PitchClass) -> PitchTally {
        self.tallies.get(&pitch).copied().unwrap_or_default()
    }

    pub fn weak_pitches(&self, rule: &WeakPitchRule) -> Vec<PitchClass> {
        PitchClass::ALL
            .into_iter()
            .filter(|pitch| rule.is_weak(self.tally(*pitch)))
            .collect()
    }

    pub fn summary(&self) -> Vec<PitchAccuracy> {
        PitchClass::ALL
            .into_iter()
            .map(|pitch| {
                let tally = self.tally(pitch);
                PitchAccuracy {
                    pitch,
                    correct: tally.correct,
                    wrong: tally.wrong,
                    accuracy: tally.accuracy(),
                }
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.values().all(|tally| tally.attempts() == 0)
    }

    pub fn clear(&mut self) {
        self.tallies.clear();
    }

    /// Keeps the larger of each counter, so a lagging snapshot never
    /// lowers what has been recorded.
    pub fn merge(&mut self, other: &NoteStats) {
        for (pitch, theirs) in &other.tallies {
            let ours = self.tallies.entry(*pitch).or_default();
            ours.correct = ours.correct.max(theirs.correct);
            ours.wrong = ours.wrong.max(theirs.wrong);
        }
    }
}

/// Everything that survives between sessions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub high_scores: BTreeMap<GameMode, u32>,
    pub note_stats: NoteStats,
    pub unlocked_strings: u8,
}

impl Progress {
    pub fn high_score(&self, mode: GameMode) -> u32 {
        self.high_scores.get(&mode).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &Progress) {
        for (mode, score) in &other.high_scores {
            let ours = self.high_scores.entry(*mode).or_insert(0);
            *ours = (*ours).max(*score);
        }
        self.note_stats.merge(&other.note_stats);
        self.unlocked_strings = self.unlocked_strings.max(other.unlocked_strings);
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            high_scores: BTreeMap::new(),
            note_stats: NoteStats::default(),
            unlocked_strings: 1,
        }
    }
}
