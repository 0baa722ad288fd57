pub mod chord;
pub mod fretboard;
pub mod pitch;
pub mod tuning;

pub use chord::*;
pub use fretboard::*;
pub use pitch::*;
pub use tuning::*;
