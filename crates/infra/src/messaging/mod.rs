//! Broker adapter and queue consumers for the invoicing fabric

pub mod broker;
pub mod worker;

pub use broker::{DeadLetter, InMemoryBroker};
pub use worker::{QueueWorker, QueueWorkerConfig};
