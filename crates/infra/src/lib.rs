//! # IntegraHub Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite store (rusqlite + r2d2) with embedded migrations
//! - moka-backed integration cache
//! - In-process durable broker and queue workers
//! - HTTP client with exchange auditing
//! - Concrete providers (Factus, Shopify)
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `integrahub-core`
//! - Contains all "impure" code (I/O, network, clocks)

#[cfg(panic = "abort")]
compile_error!("observer and queue worker isolation rely on catch_unwind; build with panic = \"unwind\"");

pub mod cache;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod messaging;
pub mod providers;

// Re-export commonly used items
pub use cache::MokaIntegrationCache;
pub use database::{DbManager, SqliteCategoryRepository, SqliteIntegrationRepository, SqliteTypeRepository};
pub use errors::InfraError;
pub use http::{HttpClient, HttpExchange};
pub use messaging::{InMemoryBroker, QueueWorker, QueueWorkerConfig};
pub use providers::{FactusProvider, ShopifyProvider};
