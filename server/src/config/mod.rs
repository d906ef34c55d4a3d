//! Configuration for the Peerlock server

pub mod auth;
pub mod notifier;
pub mod server;

pub use auth::AuthConfig;
pub use notifier::NotifierConfig;
pub use server::ServerConfig;
