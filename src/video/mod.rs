mod config;
mod daily;
mod encoder;
mod label;
mod library;
mod select;
mod task;
mod window;

pub use config::*;
pub use daily::*;
pub use encoder::*;
pub use label::*;
pub use library::*;
pub use select::*;
pub use task::*;
pub use window::*;
