//! Domain layer - Pure business logic with no infrastructure dependencies.

pub mod foundation;
pub mod order;
pub mod webhook;
