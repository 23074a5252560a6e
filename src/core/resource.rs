//! Resource handles and the binding contract.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::core::error::DispatchError;
use crate::core::message::Message;
use crate::core::scheduler::Scheduler;
use crate::util::ids::{MessageId, ResourceId};

/// A worker capable of executing one message at a time.
///
/// Availability is derived from the in-flight slot: empty means available.
/// The slot is mutated only here, never by the scheduler directly; the
/// scheduler reads it during roster scans while holding its state lock, and
/// both mutation sites run inside a dispatch pass or a completion callback,
/// so a scan always observes a settled value. Tracking the in-flight message
/// id (rather than a bare flag) lets a stale or duplicated completion be
/// rejected instead of silently freeing a resource that moved on.
pub struct Resource {
    id: ResourceId,
    in_flight: Mutex<Option<MessageId>>,
    scheduler: Weak<Scheduler>,
}

impl Resource {
    /// Create a resource attached to a scheduler. Registration into the
    /// roster is a separate step (`Scheduler::register_resource`).
    pub fn new(id: ResourceId, scheduler: &Arc<Scheduler>) -> Arc<Self> {
        Arc::new(Self {
            id,
            in_flight: Mutex::new(None),
            scheduler: Arc::downgrade(scheduler),
        })
    }

    /// Resource identifier.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Whether this resource can accept a message right now.
    pub fn is_available(&self) -> bool {
        self.in_flight.lock().is_none()
    }

    /// Accept a message: mark busy and record the binding on the message.
    ///
    /// Precondition: the resource is available. Called by the scheduler
    /// during a dispatch pass; the gateway handoff follows once the pass
    /// finishes.
    pub(crate) fn send(self: &Arc<Self>, msg: &Arc<Message>) -> Result<(), DispatchError> {
        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.is_some() {
                return Err(DispatchError::ResourceBusy(self.id));
            }
            *in_flight = Some(msg.id());
        }
        msg.bind(self)?;
        tracing::info!(message = %msg.id(), resource = %self.id, "message bound; resource busy");
        Ok(())
    }

    /// Completion signal for the in-flight message.
    ///
    /// Called exactly once per dispatched message by the gateway (via
    /// `Message::completed`). Frees the resource, then notifies the scheduler
    /// so the next dispatch pass can run. A completion for a message this
    /// resource is not currently carrying — idle resource, or a duplicate
    /// signal after the resource moved on — is a contract violation and
    /// leaves all state untouched.
    pub fn completed(&self, msg: Arc<Message>) -> Result<(), DispatchError> {
        {
            let mut in_flight = self.in_flight.lock();
            match *in_flight {
                Some(current) if current == msg.id() => *in_flight = None,
                Some(_) => return Err(DispatchError::NotInFlight(msg.id(), self.id)),
                None => return Err(DispatchError::ResourceIdle(self.id)),
            }
        }
        tracing::debug!(message = %msg.id(), resource = %self.id, "resource available again");
        let scheduler = self.scheduler.upgrade().ok_or(DispatchError::EngineGone)?;
        scheduler.completed(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gateway::Gateway;
    use crate::core::scheduler::Scheduler;
    use crate::infra::gateway::ManualGateway;
    use crate::util::ids::MessageId;

    fn scheduler() -> Arc<Scheduler> {
        let gateway = Arc::new(ManualGateway::new()) as Arc<dyn Gateway>;
        Arc::new(Scheduler::new(gateway))
    }

    #[test]
    fn test_send_flips_availability_and_binds() {
        let res = Resource::new(ResourceId(1), &scheduler());
        let msg = Message::new(MessageId(1), "g1");

        assert!(res.is_available());
        res.send(&msg).unwrap();
        assert!(!res.is_available());
        assert_eq!(msg.assigned_resource(), Some(ResourceId(1)));
    }

    #[test]
    fn test_send_while_busy_is_a_contract_violation() {
        let res = Resource::new(ResourceId(1), &scheduler());

        res.send(&Message::new(MessageId(1), "g1")).unwrap();
        let err = res.send(&Message::new(MessageId(2), "g1")).unwrap_err();
        assert!(matches!(err, DispatchError::ResourceBusy(ResourceId(1))));
    }

    #[test]
    fn test_completion_while_idle_is_a_contract_violation() {
        let res = Resource::new(ResourceId(1), &scheduler());
        let msg = Message::new(MessageId(1), "g1");

        let err = res.completed(msg).unwrap_err();
        assert!(matches!(err, DispatchError::ResourceIdle(ResourceId(1))));
    }

    #[test]
    fn test_completion_of_wrong_message_is_rejected() {
        let res = Resource::new(ResourceId(1), &scheduler());
        let carried = Message::new(MessageId(1), "g1");
        let stray = Message::new(MessageId(2), "g1");

        res.send(&carried).unwrap();
        let err = res.completed(stray).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::NotInFlight(MessageId(2), ResourceId(1))
        ));
        // The in-flight message is untouched.
        assert!(!res.is_available());
    }
}
