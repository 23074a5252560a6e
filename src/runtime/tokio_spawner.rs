//! Tokio runtime spawner implementation.

use std::future::Future;
use std::sync::Arc;

use crate::runtime::Spawn;

/// Tokio-based spawner that executes tasks on a tokio runtime.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
    /// Keeps a self-built runtime alive for the spawner's lifetime.
    _owned: Option<Arc<tokio::runtime::Runtime>>,
}

impl TokioSpawner {
    /// Create a new TokioSpawner from a tokio runtime handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            _owned: None,
        }
    }

    /// Create a TokioSpawner from the runtime the caller is currently on.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime context.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    /// Create a TokioSpawner backed by a new multi-threaded runtime with the
    /// specified worker threads. The runtime lives as long as the spawner.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _owned: Some(Arc::new(runtime)),
        })
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
