//! Peerlock server library
//!
//! Off-chain coordination backend for custody-free peer-to-peer trades:
//! wallet challenge-response authentication, a role registry, and the
//! dispute side of the escrow lifecycle. Funds never touch this process;
//! it mirrors on-chain escrow state and coordinates the humans around it.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod schema;
pub mod services;
pub mod telemetry;
pub mod validation;
