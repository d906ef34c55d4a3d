//! Peerlock Shared Types
//!
//! This crate provides types shared between:
//! - Peerlock server (state machine, handlers)
//! - API clients and the on-chain indexer
//!
//! All enums serialize to the exact strings used on the wire and in the
//! database, so `as_str`/`from_str` are the single source of truth for
//! state-machine comparisons.

pub mod dispute;
pub mod escrow;
pub mod events;
pub mod roles;

pub use dispute::*;
pub use escrow::*;
pub use events::*;
pub use roles::*;
