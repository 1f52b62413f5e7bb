//! Mercado Pago payment provider adapter.
//!
//! - `MercadoPagoClient` - REST client for payments, merchant orders and preferences
//! - `MockPaymentProvider` - Configurable in-process double for tests
//!
//! # Configuration
//!
//! - `MP_ACCESS_TOKEN`: API credential; when empty every lookup fails with
//!   `not_configured` and notifications become no-ops

mod api_types;
mod client;
mod mock_provider;

pub use client::{MercadoPagoClient, MercadoPagoSettings};
pub use mock_provider::{MethodCall, MockPaymentProvider};
