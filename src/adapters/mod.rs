//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe` - Payment provider (Stripe REST API) and a configurable mock
//! - `postgres` - sqlx repositories
//! - `email` - Resend notification sender
//! - `memory` - In-memory repositories and a recording sender for tests
//! - `http` - axum routes

pub mod email;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
