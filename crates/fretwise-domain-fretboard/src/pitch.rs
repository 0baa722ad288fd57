use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PITCH_CLASS_COUNT: u8 = 12;

/// Octave-independent note name in 12-tone equal temperament.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown pitch name: {0}")]
pub struct ParsePitchError(pub String);

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitone index, C = 0.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Wraps any semitone count into a pitch class.
    pub fn from_semitone(semitone: u32) -> Self {
        Self::ALL[(semitone % PITCH_CLASS_COUNT as u32) as usize]
    }

    pub fn from_midi(note: u8) -> Self {
        Self::from_semitone(note as u32)
    }

    pub fn transpose(self, semitones: u32) -> Self {
        Self::from_semitone(self.index() as u32 + semitones)
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = ParsePitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let pitch = match trimmed {
            "C" | "B#" => PitchClass::C,
            "C#" | "Db" => PitchClass::CSharp,
            "D" => PitchClass::D,
            "D#" | "Eb" => PitchClass::DSharp,
            "E" | "Fb" => PitchClass::E,
            "F" | "E#" => PitchClass::F,
            "F#" | "Gb" => PitchClass::FSharp,
            "G" => PitchClass::G,
            "G#" | "Ab" => PitchClass::GSharp,
            "A" => PitchClass::A,
            "A#" | "Bb" => PitchClass::ASharp,
            "B" | "Cb" => PitchClass::B,
            _ => return Err(ParsePitchError(trimmed.to_string())),
        };
        Ok(pitch)
    }
}
