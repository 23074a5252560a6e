//! In-memory gateway driven explicitly, for testing and dev.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::error::DispatchError;
use crate::core::gateway::Gateway;
use crate::core::message::Message;

/// Gateway that holds submitted messages until the caller finishes them.
///
/// Completions are relayed only from `finish_next`/`finish_all`, which makes
/// dispatch interleavings fully deterministic in tests. The internal lock is
/// released before any completion relay fires, since the relay re-enters the
/// scheduler and may submit again.
#[derive(Default)]
pub struct ManualGateway {
    in_flight: Mutex<VecDeque<Arc<Message>>>,
    submitted: Mutex<Vec<Arc<Message>>>,
}

impl ManualGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages ever submitted, in submission order.
    pub fn submitted(&self) -> Vec<Arc<Message>> {
        self.submitted.lock().clone()
    }

    /// Number of messages accepted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Finish the oldest in-flight message. Returns `false` if none was
    /// in flight.
    pub fn finish_next(&self) -> Result<bool, DispatchError> {
        let msg = self.in_flight.lock().pop_front();
        match msg {
            Some(msg) => {
                msg.completed()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Finish in-flight messages until none remain, including any submitted
    /// as a consequence of the completions. Returns the number finished.
    pub fn finish_all(&self) -> Result<usize, DispatchError> {
        let mut finished = 0;
        while self.finish_next()? {
            finished += 1;
        }
        Ok(finished)
    }
}

impl Gateway for ManualGateway {
    fn submit(&self, msg: Arc<Message>) {
        tracing::debug!(message = %msg.id(), "manual gateway accepted message");
        self.submitted.lock().push(Arc::clone(&msg));
        self.in_flight.lock().push_back(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ids::MessageId;

    #[test]
    fn test_finish_next_on_empty_gateway() {
        let gateway = ManualGateway::new();
        assert!(!gateway.finish_next().unwrap());
        assert_eq!(gateway.in_flight(), 0);
    }

    #[test]
    fn test_submission_order_is_preserved() {
        let gateway = ManualGateway::new();
        gateway.submit(Message::new(MessageId(1), "a"));
        gateway.submit(Message::new(MessageId(2), "b"));

        let ids: Vec<u64> = gateway.submitted().iter().map(|m| m.id().0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(gateway.in_flight(), 2);
    }
}
