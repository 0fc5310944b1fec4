//! Builders that assemble runtime components from configuration.

pub mod pool_builder;

pub use pool_builder::{build_runtime, TaskRuntime};
