//! In-process durable message broker
//!
//! Named FIFO queues with explicit acknowledgement: a received message is
//! moved to the queue's unacked set and stays there until it is acked
//! (dropped), rejected with requeue (returned to the head of the queue and
//! flagged redelivered) or rejected without requeue (moved to the
//! dead-letter list). The dead-letter list is bounded: once it holds
//! `max_dead_letters` entries the oldest is dropped. Queues live as long as
//! the broker; a networked broker adapter implements the same
//! [`MessageBroker`] port.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use integrahub_core::{Delivery, MessageBroker};
use integrahub_domain::{HubError, Result, DEFAULT_MAX_DEAD_LETTERS};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct Message {
    payload: Vec<u8>,
    redelivered: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Message>,
    unacked: HashMap<u64, Message>,
    notify: Arc<Notify>,
}

/// A message rejected without requeue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub queue: String,
    pub payload: Vec<u8>,
    pub rejected_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct InMemoryBroker {
    queues: Mutex<HashMap<String, QueueState>>,
    dead_letters: Mutex<VecDeque<DeadLetter>>,
    max_dead_letters: usize,
    next_tag: AtomicU64,
    closed: CancellationToken,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::with_max_dead_letters(DEFAULT_MAX_DEAD_LETTERS)
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero limit keeps nothing; every dead letter is only logged.
    pub fn with_max_dead_letters(max_dead_letters: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            dead_letters: Mutex::new(VecDeque::new()),
            max_dead_letters,
            next_tag: AtomicU64::new(0),
            closed: CancellationToken::new(),
        }
    }

    /// Messages waiting for a consumer.
    pub fn depth(&self, queue: &str) -> usize {
        self.queues.lock().get(queue).map_or(0, |q| q.ready.len())
    }

    /// Messages delivered but not yet acked or rejected.
    pub fn unacked(&self, queue: &str) -> usize {
        self.queues.lock().get(queue).map_or(0, |q| q.unacked.len())
    }

    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.queues.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Oldest first.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().iter().cloned().collect()
    }

    /// Remove and return every retained dead letter, oldest first.
    pub fn drain_dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().drain(..).collect()
    }

    fn push_dead_letter(&self, letter: DeadLetter) {
        let mut dead_letters = self.dead_letters.lock();
        if self.max_dead_letters == 0 {
            warn!(queue = %letter.queue, "dead-letter retention disabled; message discarded");
            return;
        }
        while dead_letters.len() >= self.max_dead_letters {
            if let Some(dropped) = dead_letters.pop_front() {
                warn!(
                    queue = %dropped.queue,
                    rejected_at = %dropped.rejected_at,
                    limit = self.max_dead_letters,
                    "dead-letter list full; dropping oldest"
                );
            }
        }
        dead_letters.push_back(letter);
    }

    /// Wake every waiting consumer with `None` and refuse further receives.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn undeclared(queue: &str) -> HubError {
        HubError::Broker(format!("queue '{queue}' is not declared"))
    }

    /// Pop the next ready message or hand back the queue's notifier.
    fn try_take(&self, queue: &str) -> Result<std::result::Result<Delivery, Arc<Notify>>> {
        let mut queues = self.queues.lock();
        let state = queues.get_mut(queue).ok_or_else(|| Self::undeclared(queue))?;
        match state.ready.pop_front() {
            Some(message) => {
                let tag = self.next_tag.fetch_add(1, Ordering::SeqCst) + 1;
                let delivery = Delivery {
                    tag,
                    payload: message.payload.clone(),
                    redelivered: message.redelivered,
                };
                state.unacked.insert(tag, message);
                Ok(Ok(delivery))
            }
            None => Ok(Err(Arc::clone(&state.notify))),
        }
    }

    fn settle(&self, queue: &str, tag: u64) -> Result<(Message, Arc<Notify>)> {
        let mut queues = self.queues.lock();
        let state = queues.get_mut(queue).ok_or_else(|| Self::undeclared(queue))?;
        let message = state
            .unacked
            .remove(&tag)
            .ok_or_else(|| HubError::Broker(format!("unknown delivery tag {tag} on '{queue}'")))?;
        Ok((message, Arc::clone(&state.notify)))
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn declare_queue(&self, queue: &str) -> Result<()> {
        let mut queues = self.queues.lock();
        if !queues.contains_key(queue) {
            queues.insert(queue.to_string(), QueueState::default());
            debug!(queue, "queue declared");
        }
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        if self.is_closed() {
            return Err(HubError::Broker("broker is closed".into()));
        }
        let notify = {
            let mut queues = self.queues.lock();
            let state = queues.get_mut(queue).ok_or_else(|| Self::undeclared(queue))?;
            state.ready.push_back(Message { payload, redelivered: false });
            Arc::clone(&state.notify)
        };
        notify.notify_one();
        Ok(())
    }

    async fn receive(&self, queue: &str) -> Result<Option<Delivery>> {
        loop {
            if self.is_closed() {
                return Ok(None);
            }
            let notify = match self.try_take(queue)? {
                Ok(delivery) => return Ok(Some(delivery)),
                Err(notify) => notify,
            };
            tokio::select! {
                () = self.closed.cancelled() => return Ok(None),
                () = notify.notified() => {}
            }
        }
    }

    async fn ack(&self, queue: &str, tag: u64) -> Result<()> {
        self.settle(queue, tag).map(|_| ())
    }

    async fn reject(&self, queue: &str, tag: u64, requeue: bool) -> Result<()> {
        let (mut message, notify) = self.settle(queue, tag)?;
        if requeue {
            message.redelivered = true;
            if let Some(state) = self.queues.lock().get_mut(queue) {
                state.ready.push_front(message);
            }
            notify.notify_one();
        } else {
            warn!(queue, tag, "message dead-lettered");
            self.push_dead_letter(DeadLetter {
                queue: queue.to_string(),
                payload: message.payload,
                rejected_at: Utc::now(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn delivers_in_order_and_holds_until_ack() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q").await.unwrap();
        broker.publish("q", b"one".to_vec()).await.unwrap();
        broker.publish("q", b"two".to_vec()).await.unwrap();

        let first = broker.receive("q").await.unwrap().unwrap();
        assert_eq!(first.payload, b"one");
        assert!(!first.redelivered);
        assert_eq!(broker.depth("q"), 1);
        assert_eq!(broker.unacked("q"), 1);

        broker.ack("q", first.tag).await.unwrap();
        assert_eq!(broker.unacked("q"), 0);
        assert!(broker.ack("q", first.tag).await.is_err(), "double ack is refused");
    }

    #[tokio::test]
    async fn requeue_returns_message_to_head_flagged_redelivered() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q").await.unwrap();
        broker.publish("q", b"one".to_vec()).await.unwrap();
        broker.publish("q", b"two".to_vec()).await.unwrap();

        let first = broker.receive("q").await.unwrap().unwrap();
        broker.reject("q", first.tag, true).await.unwrap();

        let again = broker.receive("q").await.unwrap().unwrap();
        assert_eq!(again.payload, b"one");
        assert!(again.redelivered);
        assert_ne!(again.tag, first.tag);
    }

    #[tokio::test]
    async fn reject_without_requeue_dead_letters() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q").await.unwrap();
        broker.publish("q", b"poison".to_vec()).await.unwrap();

        let delivery = broker.receive("q").await.unwrap().unwrap();
        broker.reject("q", delivery.tag, false).await.unwrap();

        let dead = broker.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].queue, "q");
        assert_eq!(dead[0].payload, b"poison");
        assert_eq!(broker.depth("q"), 0);
    }

    async fn dead_letter(broker: &InMemoryBroker, queue: &str, payload: &[u8]) {
        broker.publish(queue, payload.to_vec()).await.unwrap();
        let delivery = broker.receive(queue).await.unwrap().unwrap();
        broker.reject(queue, delivery.tag, false).await.unwrap();
    }

    #[tokio::test]
    async fn dead_letters_are_capped_dropping_the_oldest() {
        let broker = InMemoryBroker::with_max_dead_letters(2);
        broker.declare_queue("q").await.unwrap();

        for payload in [b"one", b"two", b"six"] {
            dead_letter(&broker, "q", payload).await;
        }

        let kept: Vec<_> = broker.dead_letters().into_iter().map(|d| d.payload).collect();
        assert_eq!(kept, vec![b"two".to_vec(), b"six".to_vec()]);
        assert_eq!(broker.unacked("q"), 0);
    }

    #[tokio::test]
    async fn drain_empties_the_dead_letter_list() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q").await.unwrap();
        dead_letter(&broker, "q", b"poison").await;

        let drained = broker.drain_dead_letters();
        assert_eq!(drained.len(), 1);
        assert!(broker.dead_letters().is_empty());

        dead_letter(&broker, "q", b"again").await;
        assert_eq!(broker.dead_letters().len(), 1);
    }

    #[tokio::test]
    async fn zero_limit_retains_no_dead_letters() {
        let broker = InMemoryBroker::with_max_dead_letters(0);
        broker.declare_queue("q").await.unwrap();
        dead_letter(&broker, "q", b"poison").await;

        assert!(broker.dead_letters().is_empty());
        assert_eq!(broker.depth("q"), 0);
    }

    #[tokio::test]
    async fn receive_waits_for_publish() {
        let broker = Arc::new(InMemoryBroker::new());
        broker.declare_queue("q").await.unwrap();

        let consumer = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.receive("q").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.publish("q", b"late".to_vec()).await.unwrap();

        let delivery = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer woke up")
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(delivery.payload, b"late");
    }

    #[tokio::test]
    async fn close_wakes_waiting_consumers() {
        let broker = Arc::new(InMemoryBroker::new());
        broker.declare_queue("q").await.unwrap();

        let consumer = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.receive("q").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.close();

        let result = tokio::time::timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
        assert_eq!(result.unwrap(), None);
        assert!(broker.publish("q", Vec::new()).await.is_err());
    }

    #[tokio::test]
    async fn undeclared_queue_is_an_error() {
        let broker = InMemoryBroker::new();
        assert!(matches!(broker.publish("nope", Vec::new()).await, Err(HubError::Broker(_))));
        assert!(matches!(broker.receive("nope").await, Err(HubError::Broker(_))));

        broker.declare_queue("b").await.unwrap();
        broker.declare_queue("a").await.unwrap();
        broker.declare_queue("a").await.unwrap();
        assert_eq!(broker.queue_names(), vec!["a", "b"]);
    }
}
