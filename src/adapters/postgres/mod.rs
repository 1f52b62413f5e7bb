//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresOrderRepository` - Relational order store with soft delete

mod order_repository;

pub use order_repository::PostgresOrderRepository;
