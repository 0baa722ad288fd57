pub mod audio;
pub mod storage;
pub mod synth;
pub mod types;

pub use audio::*;
pub use storage::*;
pub use synth::*;
pub use types::*;
