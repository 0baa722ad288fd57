use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Free play: clicking a fret only names the note.
    #[default]
    Explore,
    Quiz,
    /// Quiz against the clock.
    Survival,
    /// Find the target pitch at several positions ("vertical" practice).
    FindAll,
    /// Progressive unlocking, one string at a time.
    StringMaster,
    /// Quiz restricted to historically weak pitches.
    WeakNotes,
    ChordCompletion,
}

impl GameMode {
    pub const ALL: [GameMode; 7] = [
        GameMode::Explore,
        GameMode::Quiz,
        GameMode::Survival,
        GameMode::FindAll,
        GameMode::StringMaster,
        GameMode::WeakNotes,
        GameMode::ChordCompletion,
    ];

    /// Stable identifier used in storage keys.
    pub fn key(self) -> &'static str {
        match self {
            GameMode::Explore => "explore",
            GameMode::Quiz => "quiz",
            GameMode::Survival => "survival",
            GameMode::FindAll => "find_all",
            GameMode::StringMaster => "string_master",
            GameMode::WeakNotes => "weak_notes",
            GameMode::ChordCompletion => "chord_completion",
        }
    }

    pub fn is_timed(self) -> bool {
        matches!(
            self,
            GameMode::Survival | GameMode::FindAll | GameMode::ChordCompletion
        )
    }

    pub fn is_scored(self) -> bool {
        self != GameMode::Explore
    }
}

