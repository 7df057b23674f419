#[macro_use]
extern crate tracing;

pub mod camera;
pub mod config;
pub mod notify;
pub mod retention;
pub mod server;
pub mod snapshot;
pub mod task;
pub mod video;

pub use task::Task;
