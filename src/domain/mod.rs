//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `checkout` - Order graph, subscription status and the compensating step runner
//! - `webhook` - Provider event envelope, signature verification, webhook errors

pub mod checkout;
pub mod foundation;
pub mod webhook;
