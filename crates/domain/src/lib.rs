//! # IntegraHub Domain
//!
//! Business domain types and models for the integration hub.
//!
//! This crate contains:
//! - Integration, integration type and category entities
//! - Invoice request/response wire messages
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants (type ids, queue names, cache TTLs)
//!
//! ## Architecture
//! - No dependencies on other IntegraHub crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
