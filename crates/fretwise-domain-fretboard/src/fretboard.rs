use crate::pitch::PitchClass;
use crate::tuning::Tuning;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FRET_COUNT: u8 = 12;
pub const MIN_FRET_COUNT: u8 = 5;
pub const MAX_FRET_COUNT: u8 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FretPosition {
    /// 0 = high E in standard tuning.
    pub string: u8,
    pub fret: u8,
}

impl FretPosition {
    pub fn new(string: u8, fret: u8) -> Self {
        Self { string, fret }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fretboard {
    tuning: Tuning,
    fret_count: u8,
}

impl Fretboard {
    pub fn new(tuning: Tuning, fret_count: u8) -> Self {
        Self {
            tuning,
            fret_count: fret_count.clamp(MIN_FRET_COUNT, MAX_FRET_COUNT),
        }
    }

    pub fn standard() -> Self {
        Self::new(Tuning::standard(), DEFAULT_FRET_COUNT)
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Highest playable fret, inclusive.
    pub fn fret_count(&self) -> u8 {
        self.fret_count
    }

    pub fn string_count(&self) -> usize {
        self.tuning.string_count()
    }

    pub fn contains(&self, position: FretPosition) -> bool {
        (position.string as usize) < self.string_count() && position.fret <= self.fret_count
    }

    /// Pitch class sounding at `position`. The fret may lie beyond
    /// `fret_count`; only the string index must be valid.
    ///
    /// # Panics
    /// Panics if `position.string` is not a string of this tuning.
    pub fn pitch_at(&self, position: FretPosition) -> PitchClass {
        self.tuning
            .open_pitch(position.string as usize)
            .transpose(position.fret as u32)
    }

    /// # Panics
    /// Panics if `position.string` is not a string of this tuning.
    pub fn midi_note(&self, position: FretPosition) -> u8 {
        self.tuning.open_notes[position.string as usize].saturating_add(position.fret)
    }

    pub fn positions(&self) -> impl Iterator<Item = FretPosition> + '_ {
        let frets = self.fret_count;
        (0..self.string_count() as u8)
            .flat_map(move |string| (0..=frets).map(move |fret| FretPosition::new(string, fret)))
    }

    pub fn positions_of(&self, pitch: PitchClass) -> Vec<FretPosition> {
        self.positions()
            .filter(|position| self.pitch_at(*position) == pitch)
            .collect()
    }

    /// Like [`Fretboard::positions_of`] restricted to the given strings.
    pub fn positions_of_on(&self, pitch: PitchClass, strings: &[u8]) -> Vec<FretPosition> {
        self.positions()
            .filter(|position| strings.contains(&position.string))
            .filter(|position| self.pitch_at(*position) == pitch)
            .collect()
    }

    /// Pitch classes reachable on at least one of the given strings.
    pub fn pitches_on(&self, strings: &[u8]) -> Vec<PitchClass> {
        PitchClass::ALL
            .into_iter()
            .filter(|pitch| !self.positions_of_on(*pitch, strings).is_empty())
            .collect()
    }
}

impl Default for Fretboard {
    fn default() -> Self {
        Self::standard()
    }
}
