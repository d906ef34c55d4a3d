//! Offline integration suite for the Peerlock coordination server
//!
//! Fully deterministic, zero external dependencies: no network, no
//! chain, no notification sink. Each test builds its services over a
//! single-connection in-memory sqlite database with migrations applied.
//!
//! Categories:
//! - **Auth flow**: challenge issuance, wallet signing, login, nonce
//!   single-use and expiry
//! - **Dispute flow**: open/claim/escalate/recommend/resolve against the
//!   escrow projection, including the concurrency races settled by
//!   conditional updates
//! - **Role freshness**: privileged checks read the registry, not the
//!   token
//!
//! ```bash
//! cargo test --package server --test offline_core
//! ```

pub mod support;

mod auth_flow_test;
mod dispute_flow_test;
mod role_freshness_test;
