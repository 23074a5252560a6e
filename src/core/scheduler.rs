//! Group-affine scheduler: priority selection and the dispatch loop.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::audit::{build_event, AuditSink};
use crate::core::error::DispatchError;
use crate::core::gateway::Gateway;
use crate::core::message::Message;
use crate::core::resource::Resource;
use crate::util::ids::GroupId;

/// Everything the dispatch loop reads and writes, guarded by one mutex.
///
/// The three group sets only grow for the lifetime of the scheduler.
struct EngineState {
    /// Pending messages in arrival order.
    pending: VecDeque<Arc<Message>>,
    /// Historical dispatch-ordered log of sent messages.
    sent: Vec<Arc<Message>>,
    /// Resources in registration order.
    roster: Vec<Arc<Resource>>,
    /// Groups whose queued and future messages must be discarded.
    cancelled: HashSet<GroupId>,
    /// Groups closed by a dispatched termination message.
    terminated: HashSet<GroupId>,
    /// Groups with at least one completed message; the priority signal.
    in_progress: HashSet<GroupId>,
}

/// Group-affine message scheduler.
///
/// Two independent call paths converge here: submission (`receive`) and the
/// per-message completion callbacks fired by the gateway's own threads
/// (`completed`). A single `parking_lot::Mutex` around [`EngineState`]
/// serializes them, so one full drain pass — select, match, bind, repeat
/// until no pairing is possible — is atomic. Gateway handoffs are forwarded
/// after the pass's guard drops; the lock is never held across gateway code,
/// which keeps a gateway that completes synchronously on the caller's thread
/// from re-entering the lock.
pub struct Scheduler {
    gateway: Arc<dyn Gateway>,
    state: Mutex<EngineState>,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
}

impl Scheduler {
    /// Create a scheduler bound to a gateway.
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        tracing::debug!("scheduler created");
        Self {
            gateway,
            state: Mutex::new(EngineState {
                pending: VecDeque::new(),
                sent: Vec::new(),
                roster: Vec::new(),
                cancelled: HashSet::new(),
                terminated: HashSet::new(),
                in_progress: HashSet::new(),
            }),
            audit: None,
        }
    }

    /// Attach an audit sink.
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Mutex::new(audit));
        self
    }

    /// Register a resource into the roster.
    ///
    /// No dispatch pass is triggered; a newly added idle resource gets used
    /// on the next `receive`, `completed`, or explicit `dispatch` call.
    pub fn register_resource(&self, resource: Arc<Resource>) {
        tracing::debug!(resource = %resource.id(), "resource registered");
        self.state.lock().roster.push(resource);
    }

    /// Receive a batch of messages, preserving the given order, and run a
    /// dispatch pass.
    pub fn receive(
        &self,
        batch: impl IntoIterator<Item = Arc<Message>>,
    ) -> Result<(), DispatchError> {
        let (handoffs, outcome) = {
            let mut st = self.state.lock();
            for msg in batch {
                tracing::debug!(message = %msg.id(), group = %msg.group(), "message received");
                self.record(build_event(Some(msg.id()), msg.group().clone(), None, "receive"));
                st.pending.push_back(msg);
            }
            self.drain(&mut st)
        };
        self.forward(handoffs);
        outcome
    }

    /// Mark a group cancelled. Enforcement is lazy: queued messages of the
    /// group are discarded when they would otherwise be selected, and
    /// in-flight work is never recalled.
    pub fn cancel_group(&self, group: impl Into<GroupId>) {
        let group = group.into();
        tracing::info!(%group, "group cancelled");
        self.record(build_event(None, group.clone(), None, "cancel"));
        self.state.lock().cancelled.insert(group);
    }

    /// Completion notification for a dispatched message.
    ///
    /// This is the sole path by which a group becomes "in progress" and the
    /// sole re-entry from worker-side asynchronous completion. Reporting a
    /// message that was never dispatched is a collaborator defect.
    pub fn completed(&self, msg: Arc<Message>) -> Result<(), DispatchError> {
        let Some(resource_id) = msg.assigned_resource() else {
            return Err(DispatchError::NeverDispatched(msg.id()));
        };
        self.record(build_event(
            Some(msg.id()),
            msg.group().clone(),
            Some(resource_id),
            "complete",
        ));
        let (handoffs, outcome) = {
            let mut st = self.state.lock();
            if st.in_progress.insert(msg.group().clone()) {
                tracing::info!(group = %msg.group(), "group now in progress");
            }
            self.drain(&mut st)
        };
        self.forward(handoffs);
        outcome
    }

    /// Run one dispatch pass: pair eligible messages with free resources
    /// until no further pairing is possible, then hand the paired messages to
    /// the gateway.
    pub fn dispatch(&self) -> Result<(), DispatchError> {
        let (handoffs, outcome) = {
            let mut st = self.state.lock();
            self.drain(&mut st)
        };
        self.forward(handoffs);
        outcome
    }

    /// Snapshot of the historical dispatch-ordered list of sent messages.
    pub fn sent_messages(&self) -> Vec<Arc<Message>> {
        self.state.lock().sent.clone()
    }

    /// Number of messages still waiting in the queue.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Whether at least one message of the group has ever completed.
    pub fn is_group_in_progress(&self, group: &GroupId) -> bool {
        self.state.lock().in_progress.contains(group)
    }

    /// Index of the next message to dispatch: the first pending message whose
    /// group is in progress, else the queue head.
    fn select_next(st: &EngineState) -> Option<usize> {
        st.pending
            .iter()
            .position(|m| st.in_progress.contains(m.group()))
            .or(if st.pending.is_empty() { None } else { Some(0) })
    }

    /// Repeat selection until a dispatchable message is found, discarding
    /// cancelled and terminated-group messages along the way. Discards are an
    /// expected steady-state outcome, logged and audited but never errors.
    fn next_eligible(&self, st: &mut EngineState) -> Result<Option<usize>, DispatchError> {
        loop {
            let Some(idx) = Self::select_next(st) else {
                return Ok(None);
            };
            let msg = Arc::clone(&st.pending[idx]);
            if st.cancelled.contains(msg.group()) {
                st.pending
                    .remove(idx)
                    .ok_or(DispatchError::QueueCorrupted(msg.id()))?;
                tracing::debug!(message = %msg.id(), group = %msg.group(), "dropped: group cancelled");
                self.record(build_event(
                    Some(msg.id()),
                    msg.group().clone(),
                    None,
                    "drop_cancelled",
                ));
                continue;
            }
            if st.terminated.contains(msg.group()) {
                st.pending
                    .remove(idx)
                    .ok_or(DispatchError::QueueCorrupted(msg.id()))?;
                tracing::debug!(message = %msg.id(), group = %msg.group(), "dropped: group terminated");
                self.record(build_event(
                    Some(msg.id()),
                    msg.group().clone(),
                    None,
                    "drop_terminated",
                ));
                continue;
            }
            return Ok(Some(idx));
        }
    }

    /// The drain loop of a dispatch pass. Runs under the state lock and
    /// returns the messages bound during the pass, in dispatch order, for
    /// gateway handoff once the lock is released.
    ///
    /// The handoffs are returned even when the pass ends in an error:
    /// messages bound before the fault hold real resources and must still
    /// reach the gateway, or their resources would stay busy forever.
    fn drain(&self, st: &mut EngineState) -> (Vec<Arc<Message>>, Result<(), DispatchError>) {
        let mut handoffs = Vec::new();
        loop {
            let idx = match self.next_eligible(st) {
                Ok(Some(idx)) => idx,
                Ok(None) => {
                    tracing::debug!("no more messages in the queue");
                    break;
                }
                Err(e) => return (handoffs, Err(e)),
            };
            let Some(resource) = st.roster.iter().find(|r| r.is_available()).cloned() else {
                tracing::debug!("no resource available; waiting for a completion");
                break;
            };
            let selected_id = st.pending[idx].id();
            let Some(msg) = st.pending.remove(idx) else {
                return (handoffs, Err(DispatchError::QueueCorrupted(selected_id)));
            };
            if msg.is_terminal() {
                tracing::info!(group = %msg.group(), "termination message; closing group");
                st.terminated.insert(msg.group().clone());
            }
            if let Err(e) = resource.send(&msg) {
                return (handoffs, Err(e));
            }
            self.record(build_event(
                Some(msg.id()),
                msg.group().clone(),
                Some(resource.id()),
                "dispatch",
            ));
            st.sent.push(Arc::clone(&msg));
            handoffs.push(msg);
        }
        (handoffs, Ok(()))
    }

    /// Hand bound messages to the gateway, outside the critical section.
    fn forward(&self, handoffs: Vec<Arc<Message>>) {
        for msg in handoffs {
            self.gateway.submit(msg);
        }
    }

    /// Record an audit event if a sink is attached.
    fn record(&self, event: crate::core::audit::DispatchEvent) {
        if let Some(audit) = &self.audit {
            audit.lock().record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::gateway::ManualGateway;
    use crate::util::ids::{MessageId, ResourceId};

    fn engine(resources: u32) -> (Arc<Scheduler>, Arc<ManualGateway>) {
        let gateway = Arc::new(ManualGateway::new());
        let scheduler = Arc::new(Scheduler::new(gateway.clone() as Arc<dyn Gateway>));
        for i in 0..resources {
            let res = Resource::new(ResourceId(i), &scheduler);
            scheduler.register_resource(res);
        }
        (scheduler, gateway)
    }

    fn sent_ids(scheduler: &Scheduler) -> Vec<u64> {
        scheduler.sent_messages().iter().map(|m| m.id().0).collect()
    }

    #[test]
    fn test_fifo_when_no_group_has_history() {
        let (scheduler, _gateway) = engine(2);
        scheduler
            .receive(vec![
                Message::new(MessageId(1), "a"),
                Message::new(MessageId(2), "b"),
                Message::new(MessageId(3), "c"),
            ])
            .unwrap();
        // Two resources, so the first two go out in arrival order.
        assert_eq!(sent_ids(&scheduler), vec![1, 2]);
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn test_in_progress_group_jumps_the_queue() {
        let (scheduler, gateway) = engine(1);
        scheduler
            .receive(vec![Message::new(MessageId(1), "a")])
            .unwrap();
        gateway.finish_next().unwrap();
        assert!(scheduler.is_group_in_progress(&GroupId::from("a")));

        scheduler
            .receive(vec![
                Message::new(MessageId(2), "b"),
                Message::new(MessageId(3), "a"),
            ])
            .unwrap();
        // Group "a" has completion history, so msg 3 outranks msg 2.
        assert_eq!(sent_ids(&scheduler), vec![1, 3]);
        gateway.finish_all().unwrap();
        assert_eq!(sent_ids(&scheduler), vec![1, 3, 2]);
    }

    #[test]
    fn test_register_resource_does_not_dispatch() {
        let (scheduler, _gateway) = engine(0);
        scheduler
            .receive(vec![Message::new(MessageId(1), "a")])
            .unwrap();
        assert!(sent_ids(&scheduler).is_empty());

        let res = Resource::new(ResourceId(9), &scheduler);
        scheduler.register_resource(res);
        assert!(sent_ids(&scheduler).is_empty());

        // An explicit pass picks the new resource up.
        scheduler.dispatch().unwrap();
        assert_eq!(sent_ids(&scheduler), vec![1]);
    }

    #[test]
    fn test_partial_pass_still_forwards_bound_messages() {
        let (scheduler, gateway) = engine(0);
        let res = Resource::new(ResourceId(1), &scheduler);
        scheduler.register_resource(Arc::clone(&res));
        scheduler.register_resource(res);

        scheduler
            .receive(vec![
                Message::new(MessageId(1), "a"),
                Message::new(MessageId(2), "b"),
            ])
            .unwrap();

        // One physical resource behind two roster entries: the pass binds
        // message 1, cannot pair message 2, and the bound message still
        // reaches the gateway when the pass ends.
        assert_eq!(sent_ids(&scheduler), vec![1]);
        assert_eq!(scheduler.pending_len(), 1);
        assert_eq!(gateway.in_flight(), 1);
    }

    #[test]
    fn test_completed_for_undispatched_message_is_a_defect() {
        let (scheduler, _gateway) = engine(1);
        let stray = Message::new(MessageId(42), "a");
        let err = scheduler.completed(stray).unwrap_err();
        assert!(matches!(err, DispatchError::NeverDispatched(MessageId(42))));
    }
}
