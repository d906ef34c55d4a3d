//! Services for the Peerlock backend
//!
//! Constructed once in `main` with their dependencies passed explicitly,
//! then shared through `web::Data`.

pub mod audit;
pub mod challenge;
pub mod dispute;
pub mod notifier;
pub mod session;

pub use audit::AuditService;
pub use challenge::ChallengeService;
pub use dispute::DisputeService;
pub use notifier::NotificationDispatcher;
pub use session::SessionIssuer;
