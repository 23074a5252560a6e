//! Error types for dispatch engine operations.

use thiserror::Error;

use crate::util::ids::{MessageId, ResourceId};

/// Errors produced by the dispatch engine and its collaborators.
///
/// Every variant here is a contract violation by a collaborator or an
/// internal inconsistency. Steady states such as an empty queue or a fully
/// busy roster are not errors; they simply end a dispatch pass.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A message was handed to a resource that is already carrying one.
    #[error("resource {0} is busy and cannot accept another message")]
    ResourceBusy(ResourceId),
    /// A completion was reported on a resource with no in-flight message.
    #[error("resource {0} reported completion while idle")]
    ResourceIdle(ResourceId),
    /// A completion named a message the resource is not currently carrying.
    #[error("message {0} is not in flight on resource {1}")]
    NotInFlight(MessageId, ResourceId),
    /// A completion was reported for a message that was never dispatched.
    #[error("message {0} was never dispatched")]
    NeverDispatched(MessageId),
    /// A completion relay fired on a message with no bound resource.
    #[error("message {0} has no bound resource")]
    Unbound(MessageId),
    /// A message was bound to a second resource.
    #[error("message {0} is already bound to a resource")]
    AlreadyBound(MessageId),
    /// A selected message vanished from the pending queue mid-pass.
    #[error("message {0} missing from pending queue; aborting dispatch pass")]
    QueueCorrupted(MessageId),
    /// Invalid engine configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// The scheduler was dropped while a completion callback was in flight.
    #[error("scheduler no longer alive")]
    EngineGone,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DispatchError::ResourceBusy(ResourceId(1)).to_string(),
            "resource res-1 is busy and cannot accept another message"
        );
        assert_eq!(
            DispatchError::NeverDispatched(MessageId(9)).to_string(),
            "message msg-9 was never dispatched"
        );
        assert_eq!(
            DispatchError::EngineGone.to_string(),
            "scheduler no longer alive"
        );
    }
}
