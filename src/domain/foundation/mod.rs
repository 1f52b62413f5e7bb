//! Foundation module - Shared domain primitives.
//!
//! Error types, timestamps and the state machine trait used by the order
//! and webhook domains.

mod errors;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
