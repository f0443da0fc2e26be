mod input;
mod loop_runner;
mod presenter;

pub use loop_runner::{run_app, AppError, LoopConfig};
