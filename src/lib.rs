pub mod camera;
pub mod cli;
pub mod config;
pub mod controls;
pub mod frame;
pub mod helpers;
pub mod host;
pub mod input;
pub mod loaders;
pub mod math;
pub mod mesh;
pub mod model;
pub mod optimize;
pub mod render_loop;
pub mod renderer;
pub mod scene;

pub use config::SceneConfig;
pub use host::{LoadOutcome, RequestRejected, SceneHost};
pub use render_loop::{FrameScheduler, LoopHandle, RenderLoop, TickStatus};
