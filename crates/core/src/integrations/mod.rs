//! Integration lifecycle: ports, registry, vault, observers and services.

pub mod cache_keys;
pub mod observers;
pub mod ports;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod type_service;
pub mod vault;
