//! Order event publishers.
//!
//! - `LoggingEventPublisher` - Emits side effects as structured log records
//! - `InMemoryOrderEvents` - Captures events for assertions in tests

mod in_memory;
mod logging_publisher;

pub use in_memory::InMemoryOrderEvents;
pub use logging_publisher::LoggingEventPublisher;
