//! Async runtime adapters.

pub mod tokio_spawner;

pub use tokio_spawner::{BridgeError, TokioSpawner};
