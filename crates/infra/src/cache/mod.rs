//! Cache implementations

pub mod integration_cache;

pub use integration_cache::MokaIntegrationCache;
