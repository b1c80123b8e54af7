//! Storefront - checkout completion backend
//!
//! Turns payment provider webhooks into orders. A completed checkout session
//! becomes an order graph (order, payment linkage, line items, subscription
//! and price linkages) created step by step with compensations, followed by
//! stock adjustment, address capture and customer notification. Subscription
//! status changes are logged and may trigger a payment request.
//!
//! Layout follows ports and adapters: `domain` holds pure types and rules,
//! `ports` the async traits for every collaborator, `application` the
//! handlers, and `adapters` the Stripe, Postgres, Resend, in-memory and HTTP
//! implementations.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
