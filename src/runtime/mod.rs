//! Runtime adapters for spawning gateway work.

use std::future::Future;

#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
