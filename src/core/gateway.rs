//! Gateway boundary: the external executor of dispatched messages.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::message::Message;

/// External executor that performs the actual work of a dispatched message.
///
/// The engine hands a message over via `submit` and expects the gateway to
/// invoke `Message::completed` exactly once for it, at an arbitrary later
/// time and on any thread. How the gateway runs the work (thread pool, async
/// runtime, remote call) is its own business.
///
/// Implementations must not hold internal locks while relaying completion:
/// the relay re-enters the scheduler, and the scheduler may call `submit`
/// again from within the resulting dispatch pass.
pub trait Gateway: Send + Sync {
    /// Accept a message for asynchronous execution.
    fn submit(&self, msg: Arc<Message>);
}

/// Business logic run by the spawner-backed gateway for each message.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use group_dispatch::core::{Message, WorkHandler};
/// use std::sync::Arc;
///
/// #[derive(Clone)]
/// struct PricingHandler;
///
/// #[async_trait]
/// impl WorkHandler for PricingHandler {
///     async fn handle(&self, msg: Arc<Message>) {
///         // price the order, write the fill, etc.
///         let _ = msg.group();
///     }
/// }
/// ```
#[async_trait]
pub trait WorkHandler: Send + Sync + Clone + 'static {
    /// Execute the work for one message. Completion is relayed by the
    /// gateway after this returns.
    async fn handle(&self, msg: Arc<Message>);
}
