//! Non-blocking in-memory broker for driving handlers by hand.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use integrahub_core::{Delivery, MessageBroker};
use integrahub_domain::{HubError, Result};
use parking_lot::Mutex;

#[derive(Default)]
pub struct QueueBroker {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    next_tag: AtomicU64,
    fail_publish: AtomicBool,
}

impl QueueBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Remove and return every message currently on `queue`.
    pub fn drain(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues.lock().get_mut(queue).map(|q| q.drain(..).collect()).unwrap_or_default()
    }

    pub fn drain_json(&self, queue: &str) -> Vec<serde_json::Value> {
        self.drain(queue)
            .into_iter()
            .map(|body| serde_json::from_slice(&body).expect("queue holds JSON"))
            .collect()
    }

    pub fn depth(&self, queue: &str) -> usize {
        self.queues.lock().get(queue).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl MessageBroker for QueueBroker {
    async fn declare_queue(&self, queue: &str) -> Result<()> {
        self.queues.lock().entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(HubError::Broker("publish refused".into()));
        }
        self.queues.lock().entry(queue.to_string()).or_default().push_back(payload);
        Ok(())
    }

    async fn receive(&self, queue: &str) -> Result<Option<Delivery>> {
        let payload = self.queues.lock().get_mut(queue).and_then(VecDeque::pop_front);
        Ok(payload.map(|payload| Delivery {
            tag: self.next_tag.fetch_add(1, Ordering::SeqCst) + 1,
            payload,
            redelivered: false,
        }))
    }

    async fn ack(&self, _queue: &str, _tag: u64) -> Result<()> {
        Ok(())
    }

    async fn reject(&self, _queue: &str, _tag: u64, _requeue: bool) -> Result<()> {
        Ok(())
    }
}
