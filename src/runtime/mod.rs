// Runtime module - message application, lifecycle transitions, writer handoff

pub mod engine;
pub mod implicit;
pub mod listener;

pub use engine::{ReporterRuntime, RuntimeBuilder};
pub use implicit::SingleLaneReporter;
pub use listener::LifecycleListener;
