//! Spawner-backed gateway executing work on an async runtime.

use std::sync::Arc;

use crate::core::gateway::{Gateway, WorkHandler};
use crate::core::message::Message;
use crate::runtime::Spawn;

/// Gateway that runs each message through an async [`WorkHandler`] on a
/// spawner, then relays completion.
///
/// This is the production-shaped backend: completions arrive at the
/// scheduler later, on whatever threads the spawner's runtime uses, possibly
/// many in parallel.
pub struct SpawnerGateway<S, H> {
    spawner: S,
    handler: H,
}

impl<S, H> SpawnerGateway<S, H>
where
    S: Spawn + Send + Sync,
    H: WorkHandler,
{
    /// Create a gateway from a spawner and a work handler.
    pub fn new(spawner: S, handler: H) -> Self {
        Self { spawner, handler }
    }
}

impl<S, H> Gateway for SpawnerGateway<S, H>
where
    S: Spawn + Send + Sync,
    H: WorkHandler,
{
    fn submit(&self, msg: Arc<Message>) {
        let handler = self.handler.clone();
        self.spawner.spawn(async move {
            tracing::debug!(message = %msg.id(), "executing message");
            handler.handle(Arc::clone(&msg)).await;
            if let Err(e) = msg.completed() {
                tracing::error!(message = %msg.id(), error = %e, "completion relay failed");
            }
        });
    }
}
