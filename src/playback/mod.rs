pub mod config;
pub mod controller;
pub mod state;

pub use config::PlaybackConfig;
pub use controller::{PlaybackController, PlaybackSnapshot};
pub use state::{DisplayLayout, PlaybackState, PlaybackStatus};
