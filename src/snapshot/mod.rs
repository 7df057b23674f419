mod store;
mod task;

pub use store::*;
pub use task::*;
