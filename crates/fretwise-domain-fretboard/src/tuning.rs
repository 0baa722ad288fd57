use crate::pitch::PitchClass;
use serde::{Deserialize, Serialize};

pub const STRING_COUNT: usize = 6;

/// Open-string MIDI notes, index 0 = highest string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuning {
    pub name: String,
    pub open_notes: [u8; STRING_COUNT],
}

impl Tuning {
    /// E4 B3 G3 D3 A2 E2.
    pub fn standard() -> Self {
        Self {
            name: "Standard".to_string(),
            open_notes: [64, 59, 55, 50, 45, 40],
        }
    }

    pub fn open_pitch(&self, string: usize) -> PitchClass {
        PitchClass::from_midi(self.open_notes[string])
    }

    pub fn string_count(&self) -> usize {
        self.open_notes.len()
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::standard()
    }
}
