pub mod app;
pub mod audio;
pub mod camera;
pub mod cli;
pub mod config;
pub mod ecs;
pub mod effects;
pub mod events;
pub mod fetch;
pub mod gesture;
pub mod input;
pub mod lifecycle;
pub mod placement;
pub mod record;
pub mod scheduler;
pub mod source;
pub mod time;

pub use app::{run, run_with_overrides, SessionSummary};
