//! Message descriptor and completion relay.

use std::sync::{Arc, OnceLock, Weak};

use crate::core::error::DispatchError;
use crate::core::resource::Resource;
use crate::util::ids::{GroupId, MessageId, ResourceId};

/// Non-owning record of the resource a message was handed to.
///
/// Set exactly once at dispatch time. The weak edge only serves the
/// completion relay and post-hoc inspection; it never drives scheduling.
#[derive(Debug)]
struct Binding {
    resource_id: ResourceId,
    resource: Weak<Resource>,
}

/// A unit of work tagged with a group identifier.
///
/// The descriptor itself is immutable; the only mutable piece is the one-shot
/// binding slot filled when the scheduler pairs the message with a resource.
/// A message is submitted once, moves pending → dispatched → completed, and
/// never re-enters the queue.
#[derive(Debug)]
pub struct Message {
    id: MessageId,
    group: GroupId,
    terminal: bool,
    binding: OnceLock<Binding>,
}

impl Message {
    /// Create an ordinary message.
    pub fn new(id: MessageId, group: impl Into<GroupId>) -> Arc<Self> {
        Arc::new(Self {
            id,
            group: group.into(),
            terminal: false,
            binding: OnceLock::new(),
        })
    }

    /// Create a termination message. Dispatching it irrevocably closes its
    /// group: any later-queued message of the group is discarded.
    pub fn terminal(id: MessageId, group: impl Into<GroupId>) -> Arc<Self> {
        Arc::new(Self {
            id,
            group: group.into(),
            terminal: true,
            binding: OnceLock::new(),
        })
    }

    /// Message identifier.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Group this message belongs to.
    pub fn group(&self) -> &GroupId {
        &self.group
    }

    /// Whether this message closes its group once dispatched.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Identifier of the resource this message was dispatched to, if any.
    /// Inspection only.
    pub fn assigned_resource(&self) -> Option<ResourceId> {
        self.binding.get().map(|b| b.resource_id)
    }

    /// Record the dispatched-to resource. Called once by `Resource::send`
    /// while the scheduler lock is held.
    pub(crate) fn bind(&self, resource: &Arc<Resource>) -> Result<(), DispatchError> {
        let binding = Binding {
            resource_id: resource.id(),
            resource: Arc::downgrade(resource),
        };
        self.binding
            .set(binding)
            .map_err(|_| DispatchError::AlreadyBound(self.id))
    }

    /// Completion relay, invoked by the gateway when execution finishes.
    ///
    /// Forwards to the bound resource, which frees itself and notifies the
    /// scheduler. A message with no binding at completion time is a
    /// collaborator defect: messages reach the gateway only after binding.
    pub fn completed(self: &Arc<Self>) -> Result<(), DispatchError> {
        tracing::debug!(message = %self.id, group = %self.group, "message completed");
        let binding = self
            .binding
            .get()
            .ok_or(DispatchError::Unbound(self.id))?;
        let resource = binding
            .resource
            .upgrade()
            .ok_or(DispatchError::EngineGone)?;
        resource.completed(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_accessors() {
        let msg = Message::new(MessageId(1), "g1");
        assert_eq!(msg.id(), MessageId(1));
        assert_eq!(msg.group(), &GroupId::from("g1"));
        assert!(!msg.is_terminal());
        assert!(msg.assigned_resource().is_none());

        let term = Message::terminal(MessageId(2), "g1");
        assert!(term.is_terminal());
    }

    #[test]
    fn test_completion_without_binding_is_a_defect() {
        let msg = Message::new(MessageId(3), "g1");
        let err = msg.completed().unwrap_err();
        assert!(matches!(err, DispatchError::Unbound(MessageId(3))));
    }
}
