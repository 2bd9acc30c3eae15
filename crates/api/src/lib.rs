//! # IntegraHub API
//!
//! HTTP application layer and process entry point.
//!
//! This crate contains:
//! - The axum router for integrations, types and categories
//! - Application context (dependency injection and startup sequence)
//! - Tracing setup and health reporting
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod context;
pub mod http;
pub mod utils;

pub use context::{AppContext, LoggingResponseHandler};
pub use http::router;
