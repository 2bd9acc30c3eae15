//! Asynchronous invoicing fabric
//!
//! ```text
//! business layer ──publish──▶ invoicing.requests
//!                                   │ router
//!                                   ▼
//!                     invoicing.<provider>.requests ──▶ provider processor
//!                                                              │
//! business layer ◀──consume── invoicing.responses ◀────────────┘
//! ```
//!
//! The correlation id is the only link between a request and its response.

pub mod ports;
pub mod processor;
pub mod publisher;
pub mod queues;
pub mod responses;
pub mod router;
