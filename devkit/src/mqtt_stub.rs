/*!
Mock MQTT publisher for running the controller without a broker.

Records every accepted publish and can be told to reject publishes, either
all of them, the next N, or those aimed at one topic.
*/

use heater_kernel::bus::{BusError, Publisher};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Default)]
struct FailurePlan {
    all: bool,
    next: usize,
    topics: HashSet<String>,
}

impl FailurePlan {
    /// Consumes one queued failure if this publish should fail.
    fn should_fail(&mut self, topic: &str) -> bool {
        if self.all || self.topics.contains(topic) {
            return true;
        }
        if self.next > 0 {
            self.next -= 1;
            return true;
        }
        false
    }
}

/// Clones share the same log and failure plan.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    published: Arc<Mutex<Vec<MockMessage>>>,
    failures: Arc<Mutex<FailurePlan>>,
    rejected: Arc<Mutex<Vec<MockMessage>>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every publish until called again with `false`.
    pub fn fail_all(&self, failing: bool) {
        self.failures.lock().all = failing;
    }

    /// Reject the next `count` publishes, whatever their topic.
    pub fn fail_next(&self, count: usize) {
        self.failures.lock().next = count;
    }

    pub fn fail_topic(&self, topic: &str) {
        self.failures.lock().topics.insert(topic.to_string());
    }

    pub fn restore_topic(&self, topic: &str) {
        self.failures.lock().topics.remove(topic);
    }

    /// Every accepted publish, oldest first.
    pub fn published(&self) -> Vec<MockMessage> {
        self.published.lock().clone()
    }

    /// Publishes that were refused by the failure plan.
    pub fn rejected(&self) -> Vec<MockMessage> {
        self.rejected.lock().clone()
    }

    pub fn payloads_for(&self, topic: &str) -> Vec<String> {
        self.published
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .map(|m| m.payload.clone())
            .collect()
    }

    pub fn last_payload(&self, topic: &str) -> Option<String> {
        self.payloads_for(topic).pop()
    }

    pub fn clear(&self) {
        self.published.lock().clear();
        self.rejected.lock().clear();
    }
}

impl Publisher for MockBus {
    async fn publish(&self, address: &str, payload: &str) -> Result<(), BusError> {
        let message = MockMessage { topic: address.to_string(), payload: payload.to_string() };

        if self.failures.lock().should_fail(address) {
            tracing::debug!("[mock] rejected publish to {address}");
            self.rejected.lock().push(message);
            return Err(BusError::Rejected { address: address.to_string(), reason: "mock failure".into() });
        }

        tracing::debug!("[mock] published {payload:?} to {address}");
        self.published.lock().push(message);
        Ok(())
    }
}
