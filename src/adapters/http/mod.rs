//! HTTP adapters - axum routers exposing the application layer.

pub mod checkout;

pub use checkout::{checkout_router, CheckoutAppState};
