//! Storage Adapters
//!
//! Implementations of the OrderRepository port that live outside a database.
//!
//! - **FileOrderStore** - JSON document on disk, Spanish status vocabulary
//! - **InMemoryOrderStore** - process memory (testing/development)

mod file_order_store;
mod in_memory_order_store;

pub use file_order_store::FileOrderStore;
pub use in_memory_order_store::InMemoryOrderStore;
