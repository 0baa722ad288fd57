pub mod app;
pub mod audio_graph;
pub mod audio_params;
pub mod ipc;
pub mod progress_store;
pub mod scheduler;

pub use app::*;
pub use audio_graph::*;
pub use audio_params::*;
pub use ipc::*;
pub use progress_store::*;
pub use scheduler::*;
