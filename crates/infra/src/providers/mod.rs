//! Concrete provider implementations

pub mod factus;
pub mod shopify;

pub use factus::FactusProvider;
pub use shopify::ShopifyProvider;
