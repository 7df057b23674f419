pub mod args;
pub mod videos;
