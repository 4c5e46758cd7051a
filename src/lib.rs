pub mod prelude;
pub mod error;
pub mod config;
pub mod math;
pub mod skinning;
pub mod scene;
pub mod renderer;
pub mod scene_context;
