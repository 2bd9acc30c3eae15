//! SQLite store implementations

pub mod category_repository;
mod columns;
pub mod integration_repository;
pub mod manager;
pub mod type_repository;

pub use category_repository::SqliteCategoryRepository;
pub use integration_repository::SqliteIntegrationRepository;
pub use manager::{DbConnection, DbManager};
pub use type_repository::SqliteTypeRepository;
