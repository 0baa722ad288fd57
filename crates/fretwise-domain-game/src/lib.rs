pub mod config;
pub mod mode;
pub mod session;
pub mod stats;

pub use config::*;
pub use mode::*;
pub use session::*;
pub use stats::*;
