//! Order handlers.
//!
//! ## Commands
//! - Reconciling provider notifications (payment and merchant order topics)
//! - Checkout order creation
//! - Admin edits and soft delete
//! - Sweeping recent orders against the provider
//!
//! ## Queries
//! - Storefront status polling with on-demand reconciliation
//! - Admin listing
//! - Support diagnostics

mod create_order;
mod delete_order;
mod diagnose_order;
mod errors;
mod get_order_status;
mod list_orders;
mod reconcile_notification;
mod reconcile_recent;
mod update_order;

pub use errors::OrderCommandError;

// Commands
pub use create_order::{
    CheckoutItem, CheckoutSettings, CreateOrderCommand, CreateOrderHandler, CreateOrderResult,
};
pub use delete_order::{DeleteOrderCommand, DeleteOrderHandler, DeleteOrderResult};
pub use reconcile_notification::{
    ReconcileNotificationCommand, ReconcileNotificationHandler, ReconcileOutcome, ReconcileReport,
};
pub use reconcile_recent::{
    ReconcileRecentCommand, ReconcileRecentHandler, ReconcileRecentResult, DEFAULT_SWEEP_HOURS,
};
pub use update_order::{UpdateOrderCommand, UpdateOrderHandler, UpdateOrderResult};

// Queries
pub use diagnose_order::{DiagnoseOrderHandler, DiagnoseOrderQuery, OrderDiagnostics};
pub use get_order_status::{
    cache_control_for, GetOrderStatusHandler, GetOrderStatusQuery, GetOrderStatusResult,
};
pub use list_orders::{ListOrdersHandler, ListOrdersQuery};
