//! HTTP handlers for the Peerlock API
//!
//! Handlers validate input shape, pull the authenticated identity from
//! request extensions, and delegate to services. Authorization beyond
//! the route-level gate lives in the services, next to the records it
//! judges.

pub mod admin;
pub mod auth;
pub mod disputes;
pub mod escrows;
pub mod health;
