//! HTTP adapter for order endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{CreateOrderResponse, OrderStatusResponse, OrderView};
pub use routes::order_router;
