//! NERIN payments - Mercado Pago payment-status reconciliation
//!
//! This crate turns provider webhooks into idempotent, auditable updates of
//! storefront orders and answers status polls consistently, reconciling
//! on demand when a stored status lags behind the provider.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
